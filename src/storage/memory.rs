use super::KeyValueStore;
use anyhow::{Result, bail};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub entries: HashMap<String, String>,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn with_entries<const N: usize>(entries: [(&str, &str); N]) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            fail_writes: false,
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            bail!("storage quota exceeded");
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.fail_writes {
            bail!("storage disabled");
        }
        self.entries.remove(key);
        Ok(())
    }
}
