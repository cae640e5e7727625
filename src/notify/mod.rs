pub mod messages;
pub mod presenter;
pub mod queue;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::CHANNEL_CAPACITY;
use crate::types::NotificationEvent;

pub use messages::MessageRotation;
pub use presenter::{Presenter, WebhookPresenter};
pub use queue::{QueueState, Step};

#[derive(Debug)]
pub enum NotifierCmd {
    Enqueue(NotificationEvent),
    Dismiss,
}

/// Producer side of the notification queue. Cheap to clone.
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<NotifierCmd>,
    depth: Arc<AtomicUsize>,
}

impl NotifierHandle {
    pub async fn enqueue(&self, event: NotificationEvent) {
        if let Err(e) = self.tx.send(NotifierCmd::Enqueue(event)).await {
            warn!("Notifier stopped, dropping notification: {e}");
        }
    }

    pub async fn dismiss(&self) {
        if let Err(e) = self.tx.send(NotifierCmd::Dismiss).await {
            warn!("Notifier stopped, ignoring dismiss: {e}");
        }
    }

    /// Active plus waiting notifications, as of the last transition.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

/// Create a notifier and its handle. Spawn [`Notifier::run`] to start delivery.
pub fn channel(presenter: Arc<dyn Presenter>, dwell: Duration) -> (NotifierHandle, Notifier) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let depth = Arc::new(AtomicUsize::new(0));
    let handle = NotifierHandle { tx, depth: Arc::clone(&depth) };
    let notifier = Notifier { presenter, dwell, rx, depth };
    (handle, notifier)
}

/// Handle whose commands land in the returned receiver instead of a running
/// notifier, for asserting exactly what was enqueued.
#[cfg(test)]
pub(crate) fn test_handle() -> (NotifierHandle, mpsc::Receiver<NotifierCmd>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (NotifierHandle { tx, depth: Arc::new(AtomicUsize::new(0)) }, rx)
}

enum Input {
    Cmd(NotifierCmd),
    DwellElapsed,
    Closed,
}

/// Consumer side: owns the [`QueueState`] and the dwell timer.
pub struct Notifier {
    presenter: Arc<dyn Presenter>,
    dwell: Duration,
    rx: mpsc::Receiver<NotifierCmd>,
    depth: Arc<AtomicUsize>,
}

impl Notifier {
    /// Runs until every [`NotifierHandle`] is dropped.
    pub async fn run(mut self) {
        let mut state = QueueState::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let input = match deadline {
                Some(at) => tokio::select! {
                    cmd = self.rx.recv() => cmd.map_or(Input::Closed, Input::Cmd),
                    () = sleep_until(at) => Input::DwellElapsed,
                },
                None => self.rx.recv().await.map_or(Input::Closed, Input::Cmd),
            };

            let (next, step) = match input {
                Input::Cmd(NotifierCmd::Enqueue(event)) => state.enqueue(event),
                Input::Cmd(NotifierCmd::Dismiss) => {
                    debug!("Notification dismissed");
                    state.dismiss()
                }
                Input::DwellElapsed => state.dwell_elapsed(),
                Input::Closed => break,
            };

            (state, deadline) = self.deliver(next, step, deadline).await;
            self.depth.store(state.depth(), Ordering::Relaxed);
        }

        if state.depth() > 0 {
            info!(dropped = state.depth(), "Notifier shutting down with undelivered notifications");
        }
    }

    /// Carry out `step`, returning the resulting state and dwell deadline.
    /// A primary failure goes to the fallback surface and moves straight on:
    /// fallback presentations do not hold the dwell slot.
    async fn deliver(
        &self,
        mut state: QueueState,
        mut step: Step,
        deadline: Option<Instant>,
    ) -> (QueueState, Option<Instant>) {
        loop {
            match step {
                Step::Queued => return (state, deadline),
                Step::Idle => return (state, None),
                Step::Present(event) => match self.presenter.present(&event).await {
                    Ok(()) => {
                        info!(
                            fixture_id = %event.fixture_id,
                            kind = %event.kind,
                            "Presented: {} | {}",
                            event.headline, event.score_summary,
                        );
                        return (state, Some(Instant::now() + self.dwell));
                    }
                    Err(e) => {
                        warn!(
                            fixture_id = %event.fixture_id,
                            "Primary presentation failed, using fallback: {e}"
                        );
                        self.presenter.present_fallback(&event).await;
                        (state, step) = state.advance();
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{notification, RecordingPresenter};

    const DWELL: Duration = Duration::from_secs(8);

    #[tokio::test(start_paused = true)]
    async fn three_events_are_presented_one_dwell_apart() {
        let presenter = RecordingPresenter::new();
        let (handle, notifier) = channel(presenter.clone(), DWELL);
        tokio::spawn(notifier.run());

        let start = Instant::now();
        for n in 1..=3 {
            handle.enqueue(notification(n)).await;
        }
        tokio::time::sleep(DWELL * 3 + Duration::from_secs(1)).await;

        let shown = presenter.primary();
        assert_eq!(shown.len(), 3);
        let ids: Vec<_> = shown.iter().map(|(e, _)| e.fixture_id.clone()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        for pair in shown.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DWELL, "presentations overlapped");
        }
        assert!(shown[0].1 - start < Duration::from_millis(10));
        assert_eq!(handle.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_shows_next_before_dwell() {
        let presenter = RecordingPresenter::new();
        let (handle, notifier) = channel(presenter.clone(), DWELL);
        tokio::spawn(notifier.run());

        handle.enqueue(notification(1)).await;
        handle.enqueue(notification(2)).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(presenter.primary().len(), 1);
        assert_eq!(handle.depth(), 2);

        handle.dismiss().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let shown = presenter.primary();
        assert_eq!(shown.len(), 2);
        assert!(shown[1].1 - shown[0].1 < DWELL);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_primary_falls_back_without_dwell() {
        let presenter = RecordingPresenter::failing();
        let (handle, notifier) = channel(presenter.clone(), DWELL);
        tokio::spawn(notifier.run());

        handle.enqueue(notification(1)).await;
        handle.enqueue(notification(2)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(presenter.primary().is_empty());
        let fallback = presenter.fallback();
        assert_eq!(fallback.len(), 2, "no event may be dropped");
        assert_eq!(handle.depth(), 0);
    }
}
