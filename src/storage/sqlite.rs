use super::{KeyValueStore, queries};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let store = Self { conn };
        store.init_schema()?;

        Ok(store)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(queries::SELECT_VALUE, params![key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read key: {key}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                queries::UPSERT_VALUE,
                params![key, value, Utc::now().timestamp()],
            )
            .with_context(|| format!("Failed to write key: {key}"))?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute(queries::DELETE_VALUE, params![key])
            .with_context(|| format!("Failed to remove key: {key}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::storage::KeyValueStore;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("progress.db");

        {
            let mut store = SqliteStore::open(&path).expect("open store");
            store.set("java-roadmap-steps", "[1,2]").expect("set");
            store.set("java-roadmap-steps", "[1,2,3]").expect("overwrite");
            store.set("java-roadmap-extras", "[\"solid\"]").expect("set");
        }

        let mut store = SqliteStore::open(&path).expect("reopen store");
        assert_eq!(
            store.get("java-roadmap-steps").expect("get").as_deref(),
            Some("[1,2,3]")
        );

        store.remove("java-roadmap-extras").expect("remove");
        assert_eq!(store.get("java-roadmap-extras").expect("get"), None);
        store.remove("never-written").expect("removing a missing key is fine");
    }
}
