use crate::models::Theme;
use crate::storage::{Storage, StorageError, THEME_KEY};

/// Dark/light preference persisted under the `theme` key.
#[derive(Debug, Clone)]
pub struct ThemePreference {
    storage: Storage,
    current: Theme,
}

impl ThemePreference {
    /// Unknown or unreadable values fall back to `fallback`.
    pub fn load(storage: Storage, fallback: Theme) -> Self {
        let current = match storage.get(THEME_KEY) {
            Ok(Some(value)) => Theme::parse(&value).unwrap_or_else(|| {
                log::warn!("ignoring unknown theme value={value}");
                fallback
            }),
            Ok(None) => fallback,
            Err(err) => {
                log::warn!("failed to read theme preference: {err}");
                fallback
            }
        };
        Self { storage, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn is_dark(&self) -> bool {
        self.current == Theme::Dark
    }

    pub fn set(&mut self, theme: Theme) -> Result<Theme, StorageError> {
        self.storage.set(THEME_KEY, theme.as_str())?;
        self.current = theme;
        Ok(theme)
    }

    pub fn toggle(&mut self) -> Result<Theme, StorageError> {
        self.set(self.current.toggled())
    }
}
