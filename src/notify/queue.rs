use std::collections::VecDeque;

use crate::types::NotificationEvent;

/// What the notifier must do after a queue transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Present this event and start the dwell timer.
    Present(NotificationEvent),
    /// Something is already showing; the event waits its turn.
    Queued,
    /// Nothing left to show.
    Idle,
}

/// Single-consumer notification queue: `Idle -> Showing -> Idle`.
///
/// Transitions take the state by value and hand it back with the next
/// [`Step`], so the state machine is driven without any shared mutable
/// state and can be exercised without timers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueState {
    active: Option<NotificationEvent>,
    pending: VecDeque<NotificationEvent>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    #[cfg(test)]
    pub fn active(&self) -> Option<&NotificationEvent> {
        self.active.as_ref()
    }

    /// Events waiting behind the active one.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Active plus waiting.
    pub fn depth(&self) -> usize {
        self.pending.len() + usize::from(self.active.is_some())
    }

    pub fn enqueue(mut self, event: NotificationEvent) -> (Self, Step) {
        if self.active.is_none() {
            self.active = Some(event.clone());
            (self, Step::Present(event))
        } else {
            self.pending.push_back(event);
            (self, Step::Queued)
        }
    }

    /// Dwell timer for the active event ran out.
    pub fn dwell_elapsed(self) -> (Self, Step) {
        self.advance()
    }

    /// User closed the active event early. A no-op while idle.
    pub fn dismiss(self) -> (Self, Step) {
        if self.active.is_none() {
            return (self, Step::Idle);
        }
        self.advance()
    }

    /// Retire the active event and promote the next one, if any.
    pub fn advance(mut self) -> (Self, Step) {
        self.active = self.pending.pop_front();
        let step = match &self.active {
            Some(event) => Step::Present(event.clone()),
            None => Step::Idle,
        };
        (self, step)
    }
}
