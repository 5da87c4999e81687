use std::path::PathBuf;

use crate::models::Theme;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const API_URL_ENV: &str = "TODO_API_URL";
pub const DATA_DIR_ENV: &str = "TODO_DATA_DIR";
const APP_DIR_NAME: &str = "todo-client";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    /// Used when no theme has been saved yet.
    pub default_theme: Theme,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let api_base_url = non_empty(API_URL_ENV)
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let data_dir = non_empty(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        Self {
            api_base_url,
            data_dir,
            default_theme: Theme::default(),
        }
    }

    pub fn with_overrides(mut self, api_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = api_url.filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
