use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

/// Wall-clock abstraction used for event timestamps and request ids.
///
/// - now(): current UTC time
/// - unix_secs(): whole seconds since the Unix epoch
/// - unix_secs_f64(): fractional seconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn unix_secs(&self) -> i64 {
        self.now().timestamp()
    }

    /// Seconds since the epoch with millisecond resolution.
    fn unix_secs_f64(&self) -> f64 {
        self.now().timestamp_millis() as f64 / 1000.0
    }
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and hand the other to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at the given number of seconds since the epoch.
    pub fn at_unix(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, d: TimeDelta) {
        if let Ok(mut now) = self.now.lock() {
            *now += d;
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = t;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|g| *g).unwrap_or_default()
    }
}
