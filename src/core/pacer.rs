//! Fixed-rate loop pacing.
//!
//! Deadlines advance by whole intervals. A loop that falls behind does not
//! burst to catch up; the schedule restarts from the late tick instead.

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps a loop to a fixed tick rate.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    next_deadline: Instant,
}

impl Pacer {
    /// First deadline is one interval after `start`.
    #[must_use]
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_deadline: start + interval,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// How long to sleep at `now` to hit the next deadline, advancing the schedule.
    pub fn delay_until_next(&mut self, now: Instant) -> Duration {
        let delay = self.next_deadline.saturating_duration_since(now);
        if delay.is_zero() {
            self.next_deadline = now + self.interval;
        } else {
            self.next_deadline += self.interval;
        }
        delay
    }

    /// Sleep until the next deadline.
    pub fn wait(&mut self) {
        let delay = self.delay_until_next(Instant::now());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
