//! Time sources for `created`/`updated` stamps.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Wall-clock time at millisecond resolution.
///
/// Successive readings are strictly increasing: when the wall clock has not
/// advanced past the previous reading, the previous reading plus one
/// millisecond is returned instead.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_millis: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Acquire);
        loop {
            let next = wall.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return from_millis(next),
                Err(observed) => last = observed,
            }
        }
    }
}

/// A deterministic clock for tests.
///
/// Each reading returns the current instant and then advances it by `step`.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    step_millis: i64,
}

impl ManualClock {
    /// Start at `start`, advancing one second per reading.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
            step_millis: 1_000,
        }
    }

    /// Change how far each reading advances the clock.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step_millis = step.num_milliseconds();
        self
    }

    /// Move the clock forward without reading it.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::AcqRel);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::Release);
    }

    /// The instant the next reading will return.
    pub fn peek(&self) -> DateTime<Utc> {
        from_millis(self.millis.load(Ordering::Acquire))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.millis.fetch_add(self.step_millis, Ordering::AcqRel))
    }
}
