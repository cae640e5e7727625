use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::config::BROADCAST_CAPACITY;
use crate::types::TrackedMap;

/// Pushes the full tracked-match map to every current observer.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Arc<TrackedMap>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Best-effort: having no observers is not an error.
    pub fn publish(&self, tracked: &TrackedMap) {
        match self.tx.send(Arc::new(tracked.clone())) {
            Ok(observers) => debug!(observers, tracked = tracked.len(), "Broadcast tracked map"),
            Err(_) => debug!("Broadcast skipped, no observers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TrackedMap>> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
