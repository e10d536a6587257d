//! Big bursts: one very large write every so often, bypassing the tiers.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use tracing::debug;

use crate::{
    error::Result,
    policy::FlushTrigger,
    sink::Sink,
    source::{IdSource, ID_LEN},
    tier::Batch,
    writer::BatchWriter,
};

/// How often to burst, and how big.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstConfig {
    /// Time between bursts.
    pub interval: Duration,
    /// Approximate payload size. Rounded down to a whole number of identifiers.
    pub target_bytes: u64,
}

/// Generates a burst payload and writes it in one go.
#[derive(Debug, Clone, Copy)]
pub struct BurstGenerator {
    config: BurstConfig,
}

/// Set by the burst ticker, consumed by the one worker allowed to burst.
#[derive(Debug, Default)]
pub struct BurstSchedule {
    due: AtomicBool,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            target_bytes: 100_000_000,
        }
    }
}

impl BurstConfig {
    /// Number of identifiers in each burst.
    pub fn ids_per_burst(&self) -> usize {
        (self.target_bytes / ID_LEN as u64) as usize
    }
}

impl BurstGenerator {
    /// A generator for bursts shaped by `config`.
    pub fn new(config: BurstConfig) -> Self {
        Self { config }
    }

    /// Size and frequency of the bursts.
    pub fn config(&self) -> &BurstConfig {
        &self.config
    }

    /// Generate a whole burst up front.
    pub fn generate(&self, source: &dyn IdSource) -> Batch {
        (0..self.config.ids_per_burst())
            .map(|_| source.next_id())
            .collect()
    }

    /// Generate a burst and write it as a single line. Returns the number of identifiers written.
    pub fn emit(
        &self,
        source: &dyn IdSource,
        writer: &BatchWriter,
        sink: &dyn Sink,
    ) -> Result<usize> {
        let batch = self.generate(source);
        writer.write(&batch, sink, "burst", FlushTrigger::Burst)?;

        debug!(ids = batch.len(), "Emitted big burst");

        Ok(batch.len())
    }
}

impl BurstSchedule {
    /// A schedule with no burst due.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a burst as due.
    pub fn arm(&self) {
        self.due.store(true, Ordering::Release);
    }

    /// Claim the pending burst, if any. Only one caller sees `true` per arming.
    pub fn take(&self) -> bool {
        self.due.swap(false, Ordering::AcqRel)
    }
}
