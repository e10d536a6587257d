//! Flush policy: controls when a tier's contents get written out.
//!
//! Two triggers apply to every tier, and they are not mutually exclusive:
//!
//! - [`Full`](FlushTrigger::Full): checked straight after each append, in the appending thread.
//! - [`Periodic`](FlushTrigger::Periodic): fired by the timer once per interval, whether or not
//!   the tier is full.

use std::{
    fmt::{self, Display},
    time::Duration,
};

/// A policy controlling when tiers get flushed.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    interval: Duration,
}

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlushTrigger {
    /// The tier reached its capacity.
    Full,
    /// The flush interval elapsed.
    Periodic,
    /// The pool is shutting down and is writing out whatever is left.
    Shutdown,
    /// A big burst, which bypasses the tiers entirely.
    Burst,
}

/// Action to take after appending to a tier.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OnAppend {
    Hold,
    Flush,
}

impl FlushPolicy {
    /// Flush every tier once per `interval`, and any tier as soon as it fills up.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// How often the periodic flush fires.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Should be applied _after_ adding the new item to the tier, while still holding it.
    pub(crate) fn on_append(&self, len: usize, capacity: usize) -> OnAppend {
        if len >= capacity {
            OnAppend::Flush
        } else {
            OnAppend::Hold
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushTrigger::Full => "full",
            FlushTrigger::Periodic => "periodic",
            FlushTrigger::Shutdown => "shutdown",
            FlushTrigger::Burst => "burst",
        })
    }
}
