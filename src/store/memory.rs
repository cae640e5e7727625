use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::Result;
use crate::store::{KvStore, WriteBatch};

/// Process-lifetime key-value store. Holds the delta baselines: it outlives
/// any single scheduler run but is gone after a full restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Copy of every entry, for assertions on exact store contents.
    #[cfg(test)]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>> {
        Ok(keys
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        // Writes land before removals so a migrated key never disappears
        // before its replacement exists.
        for (key, value) in batch.set {
            self.entries.insert(key, value);
        }
        for key in &batch.remove {
            self.entries.remove(key);
        }
        Ok(())
    }
}
