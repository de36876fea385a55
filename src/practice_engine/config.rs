//! Where the progress record lives on disk.

use std::env;
use std::path::PathBuf;

/// Storage key of the persisted record; the file backend appends `.json`.
pub const DEFAULT_STORAGE_KEY: &str = "mathAppProgress";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MATHMASTER_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with the default storage key.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Reads `MATHMASTER_DATA_DIR`; falls back to the current directory.
    pub fn from_env() -> Self {
        match env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    /// Full path of the record file.
    pub fn record_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.storage_key))
    }
}
