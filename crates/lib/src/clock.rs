//! Time provider abstraction
//!
//! Record timestamps (`created_at`, `updated_at`) and the timestamp component of
//! repair slugs all come from a [`Clock`], so tests can pin time down and force
//! several operations into the same millisecond.
//!
//! # Example
//!
//! ```
//! use marquee::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let millis = clock.now_millis();
//! let when = clock.now_datetime();
//! assert_eq!(when.timestamp_millis() / 1000, (millis / 1000) as i64);
//! ```

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Returns the current time as a UTC datetime.
    ///
    /// Derived from [`Clock::now_millis`] so both views advance together.
    fn now_datetime(&self) -> DateTime<Utc> {
        millis_to_datetime(self.now_millis())
    }

    /// Returns the current time as an RFC3339-formatted string.
    fn now_rfc3339(&self) -> String {
        self.now_datetime().to_rfc3339()
    }
}

fn millis_to_datetime(millis: u64) -> DateTime<Utc> {
    let secs = (millis / 1000) as i64;
    let nanos = ((millis % 1000) * 1_000_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_default()
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn now_datetime(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for tests and deterministic demos.
///
/// Unlike the system clock, a `FixedClock` only moves when told to: `now_millis()`
/// returns the same value until [`FixedClock::advance`] or [`FixedClock::set`] is
/// called, or the clock is switched to ticking mode with [`FixedClock::ticking`],
/// in which case each read returns the current value and then advances by one.
///
/// ```
/// use marquee::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// assert_eq!(clock.now_millis(), 1000);
/// assert_eq!(clock.now_millis(), 1000);
/// clock.advance(5);
/// assert_eq!(clock.now_millis(), 1005);
/// ```
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

struct FixedClockState {
    millis: u64,
    ticking: bool,
}

impl FixedClock {
    /// Create a frozen clock at the given time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            state: Mutex::new(FixedClockState {
                millis,
                ticking: false,
            }),
        }
    }

    /// Create a clock that advances by one millisecond on every read.
    pub fn ticking(millis: u64) -> Self {
        Self {
            state: Mutex::new(FixedClockState {
                millis,
                ticking: true,
            }),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.state.lock().unwrap().millis += ms;
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        self.state.lock().unwrap().millis = ms;
    }

    /// Get the current time without advancing.
    pub fn get(&self) -> u64 {
        self.state.lock().unwrap().millis
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        let t = state.millis;
        if state.ticking {
            state.millis += 1;
        }
        t
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("FixedClock")
            .field("millis", &state.millis)
            .field("ticking", &state.ticking)
            .finish()
    }
}
