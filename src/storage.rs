use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::StoreFile;

const STORE_FILE: &str = "client.json";
const SCHEMA_VERSION: u32 = 1;

pub const TOKEN_KEY: &str = "jwt_token";
pub const THEME_KEY: &str = "theme";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// String key/value store persisted as a single JSON document.
///
/// Every write rewrites the whole file through a temp file + rename, so a crash
/// mid-write leaves the previous document in place.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.values.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.load()?.values;
        values.insert(key.to_string(), value.to_string());
        self.save(values)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.load()?.values;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(values)
    }

    fn load(&self) -> Result<StoreFile, StorageError> {
        match self.load_json(self.root.join(STORE_FILE)) {
            Ok(file) => Ok(file),
            Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(StoreFile {
                schema_version: SCHEMA_VERSION,
                updated_at: None,
                values: BTreeMap::new(),
            }),
            Err(err) => Err(err),
        }
    }

    fn save(&self, values: BTreeMap<String, String>) -> Result<(), StorageError> {
        self.ensure_dirs()?;
        let data = StoreFile {
            schema_version: SCHEMA_VERSION,
            updated_at: Some(Utc::now().timestamp()),
            values,
        };
        self.write_atomic(self.root.join(STORE_FILE), &data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}
