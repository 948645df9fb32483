//! Time keeping for the polling loops.
//!
//! There is no wall clock in `no_std`, so the driver counts the time it spends in the delays it
//! issues itself. That count is what deadlines are compared against.

use core::time::Duration;

/// First sleep of the status polling loop.
pub(crate) const INITIAL_BACKOFF: Duration = Duration::from_millis(1);

/// Geometric backoff sequence: starts at `initial` and doubles on every step.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    /// Creates a sequence starting at `initial`.
    #[must_use]
    pub fn new(initial: Duration) -> Self {
        Self { next: initial }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF)
    }
}

impl Backoff {
    /// Returns the next delay and doubles the one after it.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current.saturating_mul(2);
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

/// Monotonic time accumulated from the delays the driver has issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Clock {
    elapsed: Duration,
}

impl Clock {
    pub(crate) fn now(self) -> Duration {
        self.elapsed
    }

    pub(crate) fn advance(&mut self, by: Duration) {
        self.elapsed = self.elapsed.saturating_add(by);
    }

    pub(crate) fn deadline(self, timeout: Duration) -> Deadline {
        Deadline {
            started_at: self.elapsed,
            timeout,
        }
    }
}

/// A timeout measured from the moment a loop started.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started_at: Duration,
    timeout: Duration,
}

impl Deadline {
    pub(crate) fn expired(&self, clock: Clock) -> bool {
        clock.now().saturating_sub(self.started_at) >= self.timeout
    }
}

/// Converts a delay into the microsecond argument of `DelayNs::delay_us`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn as_delay_us(duration: Duration) -> u32 {
    duration.as_micros().min(u128::from(u32::MAX)) as u32
}
