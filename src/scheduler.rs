use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::tracker::Tracker;

/// Drives [`Tracker::run_cycle`] on a fixed interval while anything is
/// tracked, and parks otherwise.
///
/// Cycles run inline in this loop, so two cycles never overlap: a slow cycle
/// only delays the next tick.
pub struct Scheduler {
    tracker: Arc<Tracker>,
    interval: Duration,
    wake: Arc<Notify>,
}

impl Scheduler {
    pub fn new(tracker: Arc<Tracker>, interval: Duration) -> Self {
        let wake = tracker.wake_signal();
        Self { tracker, interval, wake }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // Resume after a relaunch when matches were left tracked.
        let mut active = match self.tracker.tracked().await {
            Ok(tracked) => !tracked.is_empty(),
            Err(e) => {
                error!("Could not read tracked matches on start: {e}");
                false
            }
        };
        if active {
            info!("Tracked matches found on start, resuming polling");
        }

        loop {
            if !active {
                self.tracker.health().set_polling(false);
                if !self.park(&mut shutdown).await {
                    break;
                }
                info!(interval_secs = self.interval.as_secs(), "Polling started");
            }

            if !self.poll_until_idle(&mut shutdown).await {
                break;
            }
            active = false;
        }

        self.tracker.health().set_polling(false);
        info!("Scheduler stopped");
    }

    /// Wait until something is tracked. Returns false on shutdown.
    async fn park(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            tokio::select! {
                () = self.wake.notified() => {}
                _ = shutdown.changed() => return false,
            }

            // A wake raised while the last cycle ran leaves a stored permit,
            // and that match may already be gone.
            match self.tracker.tracked().await {
                Ok(tracked) if tracked.is_empty() => debug!("Woken with nothing tracked"),
                Ok(_) => return true,
                Err(e) => {
                    warn!("Could not read tracked matches after wake: {e}");
                    return true;
                }
            }
        }
    }

    /// Tick until nothing is tracked. Returns false on shutdown.
    async fn poll_until_idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.tracker.health().set_polling(true);
        self.tracker.health().inc_polling_starts();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return false,
            }

            match self.tracker.run_cycle().await {
                Ok(report) if !report.skipped && report.remaining == 0 => {
                    info!("Nothing left to track, polling stopped");
                    return true;
                }
                Ok(report) => debug!(remaining = report.remaining, "Cycle done"),
                Err(e) => error!("Poll cycle failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::health::HealthState;
    use crate::api::latency::LatencyStats;
    use crate::broadcast::Broadcaster;
    use crate::notify;
    use crate::store::{save_tracked, MemoryStore};
    use crate::testing::{live_match, ScriptedSource};
    use crate::tracker::{Backends, StartTracking, TeamInfo};
    use crate::types::{LiveMatch, MatchStatus, TrackedMap, TrackedMatch};

    const INTERVAL: Duration = Duration::from_secs(30);

    fn tracker(durable: Arc<MemoryStore>, source: Arc<ScriptedSource>) -> Arc<Tracker> {
        // Enqueued notifications are not under test here; a closed queue only logs.
        let (notifier, _) = notify::test_handle();
        Tracker::new(
            Backends { durable, volatile: MemoryStore::new(), source, notifier },
            Broadcaster::new(),
            Arc::new(HealthState::new()),
            Arc::new(LatencyStats::new()),
        )
    }

    fn city_arsenal(goals: (u32, u32), status: MatchStatus) -> LiveMatch {
        live_match("900", (50, "Manchester City"), (42, "Arsenal"), goals, status)
    }

    fn request() -> StartTracking {
        StartTracking {
            fixture_id: Some("900".to_string()),
            team_id: 50,
            home: TeamInfo { id: 50, name: "Manchester City".to_string(), crest: None },
            away: TeamInfo { id: 42, name: "Arsenal".to_string(), crest: None },
            home_goals: Some(0),
            away_goals: Some(0),
            status: Some(MatchStatus::SecondHalf),
            elapsed: Some(80),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_until_woken() {
        let source = ScriptedSource::new();
        let tracker = tracker(MemoryStore::new(), source.clone());
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Scheduler::new(Arc::clone(&tracker), INTERVAL).run(rx));

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.calls(), 0);
        assert!(!tracker.health().polling());

        source.push(vec![city_arsenal((0, 0), MatchStatus::SecondHalf)]);
        tracker.start_tracking(request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1, "first cycle runs right after tracking starts");
        assert!(tracker.health().polling());

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_last_match_finishes_and_restarts_on_wake() {
        let source = ScriptedSource::new();
        let tracker = tracker(MemoryStore::new(), source.clone());
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Scheduler::new(Arc::clone(&tracker), INTERVAL).run(rx));

        source.push(vec![city_arsenal((1, 0), MatchStatus::FullTime)]);
        tracker.start_tracking(request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(tracker.tracked().await.unwrap().is_empty());
        assert!(!tracker.health().polling());

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.calls(), 1, "no polling while nothing is tracked");

        source.push(vec![city_arsenal((0, 0), MatchStatus::SecondHalf)]);
        tracker.start_tracking(request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wake_during_polling_does_not_restart_after_idle() {
        let source = ScriptedSource::new();
        let tracker = tracker(MemoryStore::new(), source.clone());
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Scheduler::new(Arc::clone(&tracker), INTERVAL).run(rx));
        tokio::time::sleep(Duration::from_secs(1)).await;

        source.push(vec![city_arsenal((0, 0), MatchStatus::SecondHalf)]);
        tracker.start_tracking(request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(tracker.health().polling_starts(), 1);

        // Tracked while a poll loop is already running.
        let mut second = request();
        second.fixture_id = Some("901".to_string());
        second.team_id = 1;
        second.home = TeamInfo { id: 1, name: "Everton".to_string(), crest: None };
        second.away = TeamInfo { id: 2, name: "Fulham".to_string(), crest: None };
        tracker.start_tracking(second).await.unwrap();

        source.push(vec![
            city_arsenal((1, 0), MatchStatus::FullTime),
            live_match("901", (1, "Everton"), (2, "Fulham"), (0, 0), MatchStatus::FullTime),
        ]);
        tokio::time::sleep(INTERVAL).await;
        assert!(tracker.tracked().await.unwrap().is_empty());

        tokio::time::sleep(INTERVAL * 3).await;
        assert!(!tracker.health().polling());
        assert_eq!(tracker.health().polling_starts(), 1, "no restart from a stale wake");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_persisted_tracking_on_start() {
        let durable = MemoryStore::new();
        let mut tracked = TrackedMap::new();
        tracked.insert(
            "900".to_string(),
            TrackedMatch {
                fixture_id: "900".to_string(),
                team_id: 50,
                team_name: "Manchester City".to_string(),
                is_home: true,
                home_team_id: 50,
                away_team_id: 42,
                home_team_name: "Manchester City".to_string(),
                away_team_name: "Arsenal".to_string(),
                home_crest: None,
                away_crest: None,
                home_goals: 0,
                away_goals: 0,
                status: MatchStatus::FirstHalf,
                elapsed: Some(10),
                tracked_at: 0,
            },
        );
        save_tracked(durable.as_ref(), &tracked).await.unwrap();

        let source = ScriptedSource::new();
        source.push(vec![city_arsenal((0, 0), MatchStatus::FirstHalf)]);
        let tracker = tracker(durable, source.clone());
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Scheduler::new(Arc::clone(&tracker), INTERVAL).run(rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let source = ScriptedSource::new();
        let tracker = tracker(MemoryStore::new(), source);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Scheduler::new(tracker, INTERVAL).run(rx));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler exits on shutdown")
            .unwrap();
    }
}
