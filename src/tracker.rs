use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::broadcast::Broadcaster;
use crate::config::{FETCH_TIMEOUT_SECS, STORE_TIMEOUT};
use crate::detector::detect;
use crate::error::{AppError, Result};
use crate::live_source::LiveMatchSource;
use crate::notify::{MessageRotation, NotifierHandle};
use crate::resolver::{resolve, stage_baseline_migration, Resolution};
use crate::store::{
    load_baselines, load_tracked, save_tracked, stage_baseline, stage_baseline_removal, KvStore,
    WriteBatch,
};
use crate::types::{
    placeholder_id, DeltaBaseline, MatchStatus, NotificationKind, TrackedMap, TrackedMatch,
};

/// Everything the engine needs from its host.
pub struct Backends {
    pub durable: Arc<dyn KvStore>,
    pub volatile: Arc<dyn KvStore>,
    pub source: Arc<dyn LiveMatchSource>,
    pub notifier: NotifierHandle,
}

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub crest: Option<String>,
}

/// User action: start receiving notifications for one side of a match.
#[derive(Debug, Clone, Deserialize)]
pub struct StartTracking {
    /// Source fixture id when known. Without it a placeholder is assigned
    /// and resolved on a later poll.
    #[serde(default)]
    pub fixture_id: Option<String>,
    pub team_id: i64,
    pub home: TeamInfo,
    pub away: TeamInfo,
    /// Score and status as the client last saw them. When the score is
    /// missing the first poll only establishes the baseline.
    #[serde(default)]
    pub home_goals: Option<u32>,
    #[serde(default)]
    pub away_goals: Option<u32>,
    #[serde(default)]
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub elapsed: Option<u32>,
}

impl StartTracking {
    fn baseline(&self) -> DeltaBaseline {
        DeltaBaseline {
            prev_total_goals: match (self.home_goals, self.away_goals) {
                (Some(home), Some(away)) => Some(home + away),
                _ => None,
            },
            prev_status: self.status.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// The live source fetch failed; nothing was read or written.
    pub skipped: bool,
    pub fetched: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub events: usize,
    pub removed: usize,
    pub remaining: usize,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

struct EngineState {
    rotation: MessageRotation,
}

/// The live-match tracking engine: fixture resolution, delta detection and
/// hand-off to the notifier and broadcaster.
pub struct Tracker {
    durable: Arc<dyn KvStore>,
    volatile: Arc<dyn KvStore>,
    source: Arc<dyn LiveMatchSource>,
    notifier: NotifierHandle,
    broadcaster: Broadcaster,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    wake: Arc<Notify>,
    /// Held for a whole cycle or user action, so store read-modify-writes
    /// never interleave.
    engine: Mutex<EngineState>,
}

impl Tracker {
    pub fn new(
        backends: Backends,
        broadcaster: Broadcaster,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Arc<Self> {
        Arc::new(Self {
            durable: backends.durable,
            volatile: backends.volatile,
            source: backends.source,
            notifier: backends.notifier,
            broadcaster,
            health,
            latency,
            wake: Arc::new(Notify::new()),
            engine: Mutex::new(EngineState { rotation: MessageRotation::new() }),
        })
    }

    /// Signalled whenever a match starts being tracked.
    pub fn wake_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    pub fn latency(&self) -> Arc<LatencyStats> {
        Arc::clone(&self.latency)
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn queue_depth(&self) -> usize {
        self.notifier.depth()
    }

    pub async fn tracked(&self) -> Result<TrackedMap> {
        timed("load tracked", load_tracked(&*self.durable)).await
    }

    pub async fn dismiss(&self) {
        self.notifier.dismiss().await;
    }

    pub async fn start_tracking(&self, req: StartTracking) -> Result<TrackedMatch> {
        if req.home.name.trim().is_empty() || req.away.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("team names must not be empty".to_string()));
        }
        if req.home.id == req.away.id {
            return Err(AppError::InvalidRequest("home and away teams must differ".to_string()));
        }
        let is_home = if req.team_id == req.home.id {
            true
        } else if req.team_id == req.away.id {
            false
        } else {
            return Err(AppError::InvalidRequest(format!(
                "team {} does not play in this match",
                req.team_id
            )));
        };
        let team_name =
            if is_home { req.home.name.trim() } else { req.away.name.trim() }.to_string();
        let fixture_id = req
            .fixture_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_id(req.home.id, req.away.id));

        let mut engine = self.engine.lock().await;
        let mut tracked = timed("load tracked", load_tracked(&*self.durable)).await?;

        let m = match tracked.get_mut(&fixture_id) {
            Some(existing) => {
                // Switching sides keeps the baseline: history is per fixture.
                existing.team_id = req.team_id;
                existing.team_name = team_name;
                existing.is_home = is_home;
                existing.clone()
            }
            None => {
                let baseline = req.baseline();
                let m = TrackedMatch {
                    fixture_id: fixture_id.clone(),
                    team_id: req.team_id,
                    team_name,
                    is_home,
                    home_team_id: req.home.id,
                    away_team_id: req.away.id,
                    home_team_name: req.home.name.trim().to_string(),
                    away_team_name: req.away.name.trim().to_string(),
                    home_crest: req.home.crest,
                    away_crest: req.away.crest,
                    home_goals: req.home_goals.unwrap_or(0),
                    away_goals: req.away_goals.unwrap_or(0),
                    status: req.status.unwrap_or(MatchStatus::NotStarted),
                    elapsed: req.elapsed,
                    tracked_at: now_ms(),
                };

                // Seed before the first poll so goals already scored never
                // read as new.
                let mut batch = WriteBatch::new();
                stage_baseline(&mut batch, &fixture_id, &baseline);
                timed("seed baseline", self.volatile.apply(batch)).await?;
                tracked.insert(fixture_id.clone(), m.clone());
                m
            }
        };

        timed("save tracked", save_tracked(&*self.durable, &tracked)).await?;

        let event = engine.rotation.compose(NotificationKind::TrackingStarted, &m);
        self.notifier.enqueue(event).await;
        self.health.add_events(1);
        self.health.set_tracked_count(tracked.len());
        self.broadcaster.publish(&tracked);
        drop(engine);
        self.wake.notify_one();

        info!(
            fixture_id = %m.fixture_id,
            team = %m.team_name,
            placeholder = m.is_placeholder(),
            "Tracking started: {}",
            m.score_summary(),
        );
        Ok(m)
    }

    /// Stop tracking. Takes effect from the next cycle on.
    pub async fn stop_tracking(&self, fixture_id: &str) -> Result<()> {
        let _engine = self.engine.lock().await;
        let mut tracked = timed("load tracked", load_tracked(&*self.durable)).await?;
        if tracked.remove(fixture_id).is_none() {
            return Err(AppError::NotFound(fixture_id.to_string()));
        }

        let mut batch = WriteBatch::new();
        stage_baseline_removal(&mut batch, fixture_id);
        if let Err(e) = timed("clear baseline", self.volatile.apply(batch)).await {
            warn!(fixture_id = %fixture_id, "Baseline cleanup failed: {e}");
        }
        timed("save tracked", save_tracked(&*self.durable, &tracked)).await?;

        self.health.set_tracked_count(tracked.len());
        self.broadcaster.publish(&tracked);
        info!(fixture_id = %fixture_id, remaining = tracked.len(), "Tracking stopped");
        Ok(())
    }

    /// One poll cycle: fetch, resolve, detect, notify, broadcast, persist.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let mut engine = self.engine.lock().await;

        let tracked = timed("load tracked", load_tracked(&*self.durable)).await?;
        if tracked.is_empty() {
            self.health.set_tracked_count(0);
            return Ok(CycleReport::default());
        }

        let live = match tokio::time::timeout(
            Duration::from_secs(FETCH_TIMEOUT_SECS),
            self.source.fetch(),
        )
        .await
        {
            Ok(Ok(live)) => live,
            Ok(Err(e)) => return Ok(self.skip_cycle(&tracked, &e)),
            Err(_) => return Ok(self.skip_cycle(&tracked, &AppError::Timeout("live fetch"))),
        };

        let mut baselines = timed(
            "load baselines",
            load_baselines(&*self.volatile, tracked.keys().map(String::as_str)),
        )
        .await?;

        let originally_tracked: HashSet<String> = tracked.keys().cloned().collect();
        let mut report = CycleReport { fetched: live.len(), ..CycleReport::default() };
        let mut next = TrackedMap::new();
        let mut volatile_batch = WriteBatch::new();
        let mut events = Vec::new();

        for (id, mut m) in tracked {
            let baseline = baselines.remove(&id).unwrap_or_default();

            let entry = match resolve(&m, &live) {
                Resolution::Matched(entry) => entry,
                Resolution::Unresolved => {
                    report.unresolved += 1;
                    next.insert(id, m);
                    continue;
                }
                Resolution::Resolved(entry) => {
                    if originally_tracked.contains(&entry.id) || next.contains_key(&entry.id) {
                        info!(
                            fixture_id = %id,
                            resolved_id = %entry.id,
                            "Placeholder resolves to an already tracked fixture, dropping it"
                        );
                        stage_baseline_removal(&mut volatile_batch, &id);
                        continue;
                    }
                    info!(from = %id, to = %entry.id, "Fixture resolved");
                    stage_baseline_migration(&mut volatile_batch, &id, &entry.id, &baseline);
                    m.fixture_id = entry.id.clone();
                    report.resolved += 1;
                    entry
                }
            };

            let detection = detect(&mut m, &baseline, entry);
            stage_baseline(&mut volatile_batch, &m.fixture_id, &detection.baseline);

            if let Some(kind) = detection.kind {
                info!(
                    event = "MATCH_EVENT",
                    fixture_id = %m.fixture_id,
                    kind = %kind,
                    "{kind} | {} | {}",
                    m.score_summary(),
                    m.elapsed_or_status(),
                );
                events.push(engine.rotation.compose(kind, &m));
            }

            if detection.finished {
                info!(fixture_id = %m.fixture_id, status = %m.status, "Match finished, untracking");
                stage_baseline_removal(&mut volatile_batch, &m.fixture_id);
                report.removed += 1;
            } else {
                next.insert(m.fixture_id.clone(), m);
            }
        }

        report.events = events.len();
        report.remaining = next.len();

        for event in events {
            self.notifier.enqueue(event).await;
        }
        self.broadcaster.publish(&next);

        // Baselines before the tracked map: a half-applied cycle can then
        // only miss an event, never repeat one for a migrated fixture.
        if let Err(e) = timed("save baselines", self.volatile.apply(volatile_batch)).await {
            error!("Baseline write failed, a goal may be notified twice: {e}");
        }
        if let Err(e) = timed("save tracked", save_tracked(&*self.durable, &next)).await {
            error!("Tracked match write failed: {e}");
        }
        drop(engine);

        self.health.record_cycle(now_ms());
        self.health.set_tracked_count(report.remaining);
        self.health.add_events(report.events);
        self.latency.record(started.elapsed());

        if report.events > 0 || report.resolved > 0 || report.removed > 0 {
            info!(
                fetched = report.fetched,
                resolved = report.resolved,
                unresolved = report.unresolved,
                events = report.events,
                removed = report.removed,
                remaining = report.remaining,
                "Poll cycle complete",
            );
        } else {
            debug!(
                fetched = report.fetched,
                remaining = report.remaining,
                "Poll cycle complete, no changes"
            );
        }
        Ok(report)
    }

    fn skip_cycle(&self, tracked: &TrackedMap, e: &AppError) -> CycleReport {
        warn!("Live source fetch failed, skipping cycle: {e}");
        self.health.inc_fetch_failures();
        CycleReport { skipped: true, remaining: tracked.len(), ..CycleReport::default() }
    }
}

async fn timed<T>(op: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(res) => res,
        Err(_) => Err(AppError::Timeout(op)),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
