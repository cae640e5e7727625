//! Shared health state for the /health endpoint.
//! Updated by the tracker and the scheduler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared health metrics. Updated by the engine, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True while the scheduler is ticking.
    pub polling: AtomicBool,
    /// Idle to polling transitions.
    pub polling_starts: AtomicU64,
    /// Poll cycles that reached the live source.
    pub cycles_run: AtomicU64,
    /// Cycles skipped because the live source fetch failed.
    pub fetch_failures: AtomicU64,
    /// Unix milliseconds of the last completed cycle (0 = none).
    pub last_cycle_at_ms: AtomicU64,
    /// Tracked matches after the last cycle or user action.
    pub tracked_count: AtomicU64,
    /// Notifications produced since start.
    pub events_emitted: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_polling(&self, v: bool) {
        self.polling.store(v, Ordering::Relaxed);
    }

    pub fn inc_polling_starts(&self) {
        self.polling_starts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, at_ms: u64) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at_ms.store(at_ms, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_tracked_count(&self, n: usize) {
        self.tracked_count.store(n as u64, Ordering::Relaxed);
    }

    pub fn add_events(&self, n: usize) {
        self.events_emitted.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn polling(&self) -> bool {
        self.polling.load(Ordering::Relaxed)
    }

    pub fn polling_starts(&self) -> u64 {
        self.polling_starts.load(Ordering::Relaxed)
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at_ms(&self) -> u64 {
        self.last_cycle_at_ms.load(Ordering::Relaxed)
    }

    pub fn tracked_count(&self) -> u64 {
        self.tracked_count.load(Ordering::Relaxed)
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }
}
