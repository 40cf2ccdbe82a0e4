//! Deadline timers polled by the owner's event loop

use std::time::{Duration, Instant};

/// Fires once after a quiet period
///
/// Each [`schedule`](Self::schedule) pushes the deadline out to `now + delay`.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Idle timer with a quiet period of `delay`
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Quiet period
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the quiet period at `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Stop without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Scheduled and not yet fired
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the timer will fire
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` exactly once when `now` reaches the deadline
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

/// The soonest of a set of optional deadlines
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}
