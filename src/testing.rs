//! In-memory fakes for the backend traits, shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::live_source::LiveMatchSource;
use crate::notify::Presenter;
use crate::types::{LiveMatch, MatchStatus, NotificationEvent, NotificationKind, TeamRef};

pub fn notification(n: u32) -> NotificationEvent {
    NotificationEvent {
        fixture_id: n.to_string(),
        kind: NotificationKind::Celebration,
        headline: "GOAL!".to_string(),
        sub_message: "Scored".to_string(),
        score_summary: format!("Home {n} - 0 Away"),
        elapsed_or_status: "10'".to_string(),
    }
}

pub fn live_match(
    id: &str,
    home: (i64, &str),
    away: (i64, &str),
    goals: (u32, u32),
    status: MatchStatus,
) -> LiveMatch {
    LiveMatch {
        id: id.to_string(),
        home: TeamRef { id: home.0, name: home.1.to_string() },
        away: TeamRef { id: away.0, name: away.1.to_string() },
        home_goals: goals.0,
        away_goals: goals.1,
        status,
        elapsed: Some(50),
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Returns scripted snapshots in order; repeats the last one when exhausted.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Option<Vec<LiveMatch>>>>,
    last: Mutex<Option<Vec<LiveMatch>>>,
    calls: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, snapshot: Vec<LiveMatch>) {
        self.script.lock().unwrap().push_back(Some(snapshot));
    }

    /// Next fetch fails with a source error.
    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(None);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LiveMatchSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<LiveMatch>> {
        *self.calls.lock().unwrap() += 1;
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Some(snapshot)) => {
                *self.last.lock().unwrap() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(None) => Err(AppError::LiveSource("scripted failure".to_string())),
            None => Ok(self.last.lock().unwrap().clone().unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingPresenter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPresenter {
    fail_primary: bool,
    primary: Mutex<Vec<(NotificationEvent, Instant)>>,
    fallback: Mutex<Vec<NotificationEvent>>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Primary surface always fails, as with a blocked popup.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail_primary: true, ..Self::default() })
    }

    pub fn primary(&self) -> Vec<(NotificationEvent, Instant)> {
        self.primary.lock().unwrap().clone()
    }

    pub fn fallback(&self) -> Vec<NotificationEvent> {
        self.fallback.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn present(&self, event: &NotificationEvent) -> Result<()> {
        if self.fail_primary {
            return Err(AppError::Presentation("blocked".to_string()));
        }
        self.primary.lock().unwrap().push((event.clone(), Instant::now()));
        Ok(())
    }

    async fn present_fallback(&self, event: &NotificationEvent) {
        self.fallback.lock().unwrap().push(event.clone());
    }
}
