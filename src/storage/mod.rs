pub mod queries;
pub mod sqlite;

#[cfg(test)]
pub mod memory;

use anyhow::Result;

pub use sqlite::SqliteStore;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub steps: String,
    pub extras: String,
    pub last_activity: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            steps: format!("{prefix}-steps"),
            extras: format!("{prefix}-extras"),
            last_activity: format!("{prefix}-last-activity"),
        }
    }
}
