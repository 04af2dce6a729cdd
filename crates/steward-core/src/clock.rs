//! Clock abstraction.
//!
//! Timestamps (resource creation, event records, backup identifiers) come
//! from an injected clock rather than ambient system time, so tests can pin
//! the clock and assert exact backup identifiers.

use chrono::{DateTime, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant. Intended for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pin the clock to the given UTC date and time.
    pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Self {
        let instant = Utc
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .unwrap_or_else(Utc::now);
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
