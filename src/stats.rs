//! Throughput statistics, reported once per flush interval.

use std::{
    fmt::{self, Display},
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sink::Sink,
    source::ID_LEN,
};

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Counts identifiers flushed across all tiers, and writes one line per tick.
#[derive(Debug, Default)]
pub struct StatsReporter {
    flushed_ids: AtomicU64,
}

/// Identifiers and bytes flushed during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTick {
    /// Identifiers flushed, summed over every tier.
    pub ids: u64,
    /// `ids` times the identifier length.
    pub bytes: u64,
}

impl StatsReporter {
    /// A reporter with nothing counted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a flushed batch of `ids` identifiers towards the current tick.
    pub fn record(&self, ids: usize) {
        self.flushed_ids.fetch_add(ids as u64, Ordering::Relaxed);
    }

    /// End the current tick, returning its totals and starting the next one from zero.
    pub fn take_tick(&self) -> StatsTick {
        StatsTick::from_ids(self.flushed_ids.swap(0, Ordering::Relaxed))
    }

    /// End the current tick and append its line to the log.
    pub fn report(&self, log: &dyn Sink) -> Result<StatsTick> {
        let tick = self.take_tick();

        log.write_all(format!("{tick}\n").as_bytes())
            .map_err(|source| Error::Write {
                sink: log.name().to_string(),
                source,
            })?;

        debug!(ids = tick.ids, bytes = tick.bytes, "Reported throughput");

        Ok(tick)
    }
}

impl StatsTick {
    /// Totals for `ids` identifiers.
    pub fn from_ids(ids: u64) -> Self {
        Self {
            ids,
            bytes: ids * ID_LEN as u64,
        }
    }
}

impl Display for StatsTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} UUIDs per second, {}/s",
            format_thousands(self.ids),
            format_bytes(self.bytes)
        )
    }
}

/// Format with a comma between each group of three digits, e.g. `1,234,567`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Format a byte count in the largest 1024-based unit that keeps the value under 1024, to two
/// decimal places, e.g. `1.50 KB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    // Compare the value as it will be printed, so e.g. 1023.999 KB becomes 1.00 MB.
    while round_to_cents(value) >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", BYTE_UNITS[unit])
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
