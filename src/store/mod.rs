pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{DeltaBaseline, MatchStatus, TrackedMap};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Durable store key holding the whole tracked-match map.
pub const TRACKED_MATCHES_KEY: &str = "tracked_matches";

// ---------------------------------------------------------------------------
// KvStore
// ---------------------------------------------------------------------------

/// A set of writes and removals committed together.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteBatch {
    pub set: HashMap<String, Value>,
    pub remove: Vec<String>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        let key = key.into();
        self.remove.retain(|k| k != &key);
        self.set.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.set.remove(&key);
        if !self.remove.contains(&key) {
            self.remove.push(key);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

/// Key-value persistence used for both the durable and the volatile store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Missing keys are absent from the returned map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>>;

    /// Commit every write and removal in `batch` as one unit.
    async fn apply(&self, batch: WriteBatch) -> Result<()>;

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        self.apply(WriteBatch { set: entries, remove: Vec::new() }).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        self.apply(WriteBatch { set: HashMap::new(), remove: keys.to_vec() }).await
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

pub fn prev_goals_key(fixture_id: &str) -> String {
    format!("prev_goals:{fixture_id}")
}

pub fn prev_status_key(fixture_id: &str) -> String {
    format!("prev_status:{fixture_id}")
}

pub async fn load_tracked(store: &dyn KvStore) -> Result<TrackedMap> {
    let key = TRACKED_MATCHES_KEY.to_string();
    let mut values = store.get(std::slice::from_ref(&key)).await?;
    match values.remove(&key) {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(TrackedMap::new()),
    }
}

/// Stage the whole tracked map; an empty map removes the key.
pub fn stage_tracked(batch: &mut WriteBatch, tracked: &TrackedMap) -> Result<()> {
    if tracked.is_empty() {
        batch.remove(TRACKED_MATCHES_KEY);
    } else {
        batch.set(TRACKED_MATCHES_KEY, serde_json::to_value(tracked)?);
    }
    Ok(())
}

pub async fn save_tracked(store: &dyn KvStore, tracked: &TrackedMap) -> Result<()> {
    let mut batch = WriteBatch::new();
    stage_tracked(&mut batch, tracked)?;
    store.apply(batch).await
}

/// Baselines for every id in `fixture_ids`. Ids with nothing stored get the
/// default (both fields undefined).
pub async fn load_baselines<'a>(
    store: &dyn KvStore,
    fixture_ids: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, DeltaBaseline>> {
    let ids: Vec<&str> = fixture_ids.into_iter().collect();
    let keys: Vec<String> = ids
        .iter()
        .flat_map(|id| [prev_goals_key(id), prev_status_key(id)])
        .collect();
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let values = store.get(&keys).await?;

    Ok(ids
        .into_iter()
        .map(|id| {
            let prev_total_goals = values
                .get(&prev_goals_key(id))
                .and_then(Value::as_u64)
                .and_then(|g| u32::try_from(g).ok());
            let prev_status = values
                .get(&prev_status_key(id))
                .and_then(Value::as_str)
                .map(MatchStatus::from_code);
            (id.to_string(), DeltaBaseline { prev_total_goals, prev_status })
        })
        .collect())
}

pub fn stage_baseline(batch: &mut WriteBatch, fixture_id: &str, baseline: &DeltaBaseline) {
    match baseline.prev_total_goals {
        Some(goals) => batch.set(prev_goals_key(fixture_id), Value::from(goals)),
        None => batch.remove(prev_goals_key(fixture_id)),
    };
    match &baseline.prev_status {
        Some(status) => batch.set(prev_status_key(fixture_id), Value::from(status.code())),
        None => batch.remove(prev_status_key(fixture_id)),
    };
}

pub fn stage_baseline_removal(batch: &mut WriteBatch, fixture_id: &str) {
    batch.remove(prev_goals_key(fixture_id));
    batch.remove(prev_status_key(fixture_id));
}
