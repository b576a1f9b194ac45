//! The clock behind every ledger stamp.
//!
//! Trips, members, invites, expenses, payments, and sessions are all
//! stamped through a `TimeSource` handle instead of `Timestamp::now()`.
//! Under the `mock-time` feature the clock is frozen behind a shared
//! handle, which lets tests drive session expiry, payment timestamps, and
//! activity-feed ordering deterministically.

use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
#[cfg(feature = "mock-time")]
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct TimeSource {
    /// The frozen instant, shared by every clone of the handle.
    #[cfg(feature = "mock-time")]
    frozen: Arc<Mutex<Timestamp>>,
}

impl TimeSource {
    #[allow(clippy::new_without_default)]
    #[cfg(not(feature = "mock-time"))]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(feature = "mock-time")]
    pub fn new(initial_time: Timestamp) -> Self {
        Self {
            frozen: Arc::new(Mutex::new(initial_time)),
        }
    }

    #[cfg(not(feature = "mock-time"))]
    pub fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    #[cfg(feature = "mock-time")]
    pub fn now(&self) -> Timestamp {
        *self.frozen.lock().unwrap()
    }

    /// Today as a civil date in UTC; trip date ranges are dates, not
    /// instants, so seeding and defaults go through this.
    pub fn today(&self) -> Date {
        self.now().to_zoned(TimeZone::UTC).date()
    }

    /// Move the frozen clock forward, e.g. past a session's expiry.
    #[cfg(feature = "mock-time")]
    pub fn advance(&self, duration: jiff::Span) {
        let advanced = self.now() + duration;
        self.set(advanced);
    }

    #[cfg(feature = "mock-time")]
    pub fn set(&self, time: Timestamp) {
        *self.frozen.lock().unwrap() = time;
    }
}
