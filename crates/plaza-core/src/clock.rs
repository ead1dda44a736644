//! Injectable time source.
//!
//! Lifecycle decisions in Plaza (tombstone expiry, undo windows) compare
//! persisted timestamps against "now". Components take a [`Clock`] instead
//! of calling `Utc::now()` directly so those decisions are deterministic
//! under test; `plaza-test-utils` provides a manually-advanced clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock, backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A shared, dynamically-dispatched clock handle.
pub type SharedClock = Arc<dyn Clock>;
