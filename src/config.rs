use std::{
    fmt::{self, Display},
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use bon::bon;

use crate::{
    burst::BurstConfig,
    error::{Error, Result},
    policy::FlushPolicy,
    tier::Tier,
    writer::BatchFormat,
};

/// Where throughput statistics go by default, relative to the working directory.
pub const DEFAULT_STATS_LOG: &str = "uuids_per_second.log";

/// Bytes of echoed lines each worker collects before writing them out.
pub const DEFAULT_ECHO_BUFFER: usize = 64 * 1024;

/// Everything needed to run a pool.
///
/// Built once at startup and never changed. Defaults to the six standard tiers, a one second
/// flush interval, a 100 MB burst every ten seconds and one worker per available CPU.
///
/// With no tiers at all, the echo is the only regular output: see [`Config::plain`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    pub(crate) tiers: Vec<Tier>,
    pub(crate) flush_policy: FlushPolicy,
    pub(crate) burst: Option<BurstConfig>,
    pub(crate) echo: bool,
    pub(crate) echo_buffer: usize,
    pub(crate) format: BatchFormat,
    pub(crate) workers: usize,
    pub(crate) stats_log: PathBuf,
}

#[bon]
impl Config {
    /// Describe a pool. Every parameter has a default.
    #[builder]
    pub fn new(
        /// Buffers to fill, in order.
        #[builder(default = Tier::defaults())]
        tiers: Vec<Tier>,
        /// When to flush the tiers.
        #[builder(default)]
        flush_policy: FlushPolicy,
        /// Whether the first worker produces big bursts.
        #[builder(default = true)]
        bursts: bool,
        /// Size and frequency of big bursts.
        #[builder(default)]
        burst: BurstConfig,
        /// Whether each identifier is also written, one per line, to the echo sink.
        #[builder(default = true)]
        echo: bool,
        /// Bytes of echoed lines each worker buffers before writing. Zero writes every line
        /// straight away.
        #[builder(default = DEFAULT_ECHO_BUFFER)]
        echo_buffer: usize,
        /// How flushed batches are laid out.
        #[builder(default)]
        format: BatchFormat,
        /// Number of generation loops. Defaults to the available parallelism.
        workers: Option<usize>,
        /// Append-only throughput log.
        #[builder(into, default = PathBuf::from(DEFAULT_STATS_LOG))]
        stats_log: PathBuf,
    ) -> Self {
        Self {
            tiers,
            flush_policy,
            burst: bursts.then_some(burst),
            echo,
            echo_buffer,
            format,
            workers: workers.unwrap_or_else(available_workers),
            stats_log,
        }
    }

    /// Every identifier written once, one per line, to the echo sink, and no tiers.
    ///
    /// Bursts stay enabled. Point the echo sink at stdout for the tool's classic output.
    pub fn plain() -> Self {
        Self::builder().tiers(vec![]).build()
    }

    /// Check the configuration can actually run.
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() && !self.echo {
            return Err(Error::InvalidConfig(
                "at least one tier is required when echo is disabled".into(),
            ));
        }
        if let Some(tier) = self.tiers.iter().find(|t| t.capacity() == 0) {
            return Err(Error::InvalidConfig(format!(
                "tier '{}' has zero capacity",
                tier.label()
            )));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("at least one worker is required".into()));
        }
        if self.flush_policy.interval().is_zero() {
            return Err(Error::InvalidConfig("flush interval must be non-zero".into()));
        }
        if self.burst.is_some_and(|b| b.interval.is_zero()) {
            return Err(Error::InvalidConfig("burst interval must be non-zero".into()));
        }
        Ok(())
    }

    /// Buffers to fill, in order.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// When tiers are flushed.
    pub fn flush_policy(&self) -> FlushPolicy {
        self.flush_policy
    }

    /// `None` when bursts are disabled.
    pub fn burst(&self) -> Option<BurstConfig> {
        self.burst
    }

    /// Whether each identifier is echoed, one per line.
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// How flushed batches are laid out.
    pub fn format(&self) -> BatchFormat {
        self.format
    }

    /// Bytes of echoed lines each worker buffers before writing.
    pub fn echo_buffer(&self) -> usize {
        self.echo_buffer
    }

    /// Number of generation loops.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Where the binary appends throughput statistics.
    pub fn stats_log(&self) -> &Path {
        &self.stats_log
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers: Vec<_> = self.tiers.iter().map(Tier::label).collect();
        write!(
            f,
            "tiers: [{}], flush_interval: {}ms, workers: {}, bursts: {}",
            tiers.join(", "),
            self.flush_policy.interval().as_millis(),
            self.workers,
            self.burst.is_some()
        )
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
