use std::{fmt::Debug, sync::Arc};

use bon::bon;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    burst::{BurstGenerator, BurstSchedule},
    config::Config,
    error::Result,
    policy::{FlushPolicy, FlushTrigger},
    sink::{LineBuffer, Sink},
    source::IdSource,
    stats::{StatsReporter, StatsTick},
    tier::{Batch, TierBuffer},
    writer::BatchWriter,
};

/// Generates identifiers into every tier and flushes them to the output sink.
///
/// Cheap to clone. Cloned instances share the same tiers, sinks and statistics, so any number of
/// workers can drive one `Shouter` concurrently. Each worker identifies itself by index: worker
/// `0` is the only one that bursts, and each index has its own echo buffer.
#[derive(Clone)]
pub struct Shouter {
    inner: Arc<Inner>,
}

struct Inner {
    tiers: Vec<TierBuffer>,
    flush_policy: FlushPolicy,
    source: Arc<dyn IdSource>,
    writer: BatchWriter,

    /// Receives flushed batches and bursts.
    out: Arc<dyn Sink>,
    /// Receives every identifier, one per line.
    echo: Option<Echo>,
    /// Receives one statistics line per tick.
    log: Option<Arc<dyn Sink>>,

    stats: StatsReporter,
    burst: Option<BurstGenerator>,
    burst_schedule: BurstSchedule,
}

struct Echo {
    sink: Arc<dyn Sink>,
    /// One per worker, so workers only contend with the flush timer.
    buffers: Vec<Mutex<LineBuffer>>,
}

/// What a single generation step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One identifier went into every tier. Counts how many tiers were full-flushed as a result.
    Generated {
        /// Tiers that hit capacity and were written out.
        flushed_tiers: usize,
    },
    /// A big burst was written instead.
    Burst {
        /// Identifiers in the burst.
        ids: usize,
    },
}

#[bon]
impl Shouter {
    /// Create a new shouter.
    ///
    /// The echo sink is only used if echoing is enabled in the config. Without a log sink,
    /// statistics are still counted but not written anywhere.
    #[builder]
    pub fn new(
        config: Config,
        source: Arc<dyn IdSource>,
        out: Arc<dyn Sink>,
        echo: Option<Arc<dyn Sink>>,
        log: Option<Arc<dyn Sink>>,
    ) -> Result<Self> {
        config.validate()?;

        let tiers = config.tiers().iter().cloned().map(TierBuffer::new).collect();
        let echo = echo.filter(|_| config.echo()).map(|sink| Echo {
            sink,
            buffers: (0..config.workers())
                .map(|_| Mutex::new(LineBuffer::new(config.echo_buffer())))
                .collect(),
        });

        Ok(Self {
            inner: Arc::new(Inner {
                tiers,
                flush_policy: config.flush_policy(),
                source,
                writer: BatchWriter::new(config.format()),
                out,
                echo,
                log,
                stats: StatsReporter::new(),
                burst: config.burst().map(BurstGenerator::new),
                burst_schedule: BurstSchedule::new(),
            }),
        })
    }

    /// Run one iteration of generation loop `worker`.
    ///
    /// For worker `0`, if a burst is due, writes the burst instead of generating a single
    /// identifier. Indices past the configured worker count share echo buffers.
    pub fn step(&self, worker: usize) -> Result<Step> {
        if worker == 0 {
            if let Some(burst) = &self.inner.burst {
                if self.inner.burst_schedule.take() {
                    let ids = burst.emit(
                        self.inner.source.as_ref(),
                        &self.inner.writer,
                        self.inner.out.as_ref(),
                    )?;
                    return Ok(Step::Burst { ids });
                }
            }
        }

        let id = self.inner.source.next_id();

        if let Some(echo) = &self.inner.echo {
            let mut lines = echo.buffers[worker % echo.buffers.len()].lock();
            lines.push_line(id.as_bytes(), echo.sink.as_ref())?;
        }

        let mut flushed_tiers = 0;
        for tier in &self.inner.tiers {
            if let Some(batch) = tier.append_and_take_if_full(id, &self.inner.flush_policy) {
                self.write_batch(&batch, tier, FlushTrigger::Full)?;
                flushed_tiers += 1;
            }
        }

        Ok(Step::Generated { flushed_tiers })
    }

    /// Periodic flush: write out the echo buffers and every tier, full or not, then report
    /// statistics for the tick.
    pub fn tick(&self) -> Result<StatsTick> {
        self.flush_and_report(FlushTrigger::Periodic)
    }

    /// Write out everything still buffered and report the final statistics.
    pub fn finish(&self) -> Result<StatsTick> {
        self.flush_and_report(FlushTrigger::Shutdown)
    }

    /// Drain and write every tier. Returns the number of identifiers written.
    pub fn flush_all(&self, trigger: FlushTrigger) -> Result<usize> {
        let mut flushed = 0;
        for tier in &self.inner.tiers {
            let batch = tier.drain();
            self.write_batch(&batch, tier, trigger)?;
            flushed += batch.len();
        }
        Ok(flushed)
    }

    /// Write out every worker's buffered echo lines. Returns the number of bytes written.
    pub fn flush_echo(&self) -> Result<usize> {
        let Some(echo) = &self.inner.echo else {
            return Ok(0);
        };

        let mut written = 0;
        for buffer in &echo.buffers {
            written += buffer.lock().flush(echo.sink.as_ref())?;
        }
        if written > 0 {
            debug!(bytes = written, "Flushed echo to {}", echo.sink.name());
        }
        Ok(written)
    }

    /// Mark a big burst as due. Worker `0` writes it on its next step.
    pub fn arm_burst(&self) {
        if self.inner.burst.is_some() {
            self.inner.burst_schedule.arm();
        } else {
            warn!("Burst armed but bursts are disabled");
        }
    }

    /// The tier buffers, in configured order.
    pub fn tiers(&self) -> &[TierBuffer] {
        &self.inner.tiers
    }

    /// When tiers are flushed.
    pub fn flush_policy(&self) -> FlushPolicy {
        self.inner.flush_policy
    }

    fn write_batch(&self, batch: &Batch, tier: &TierBuffer, trigger: FlushTrigger) -> Result<()> {
        self.inner
            .writer
            .write(batch, self.inner.out.as_ref(), tier.tier().label(), trigger)?;
        self.inner.stats.record(batch.len());
        Ok(())
    }

    fn flush_and_report(&self, trigger: FlushTrigger) -> Result<StatsTick> {
        self.flush_echo()?;
        self.flush_all(trigger)?;

        match &self.inner.log {
            Some(log) => self.inner.stats.report(log.as_ref()),
            None => Ok(self.inner.stats.take_tick()),
        }
    }
}

impl Debug for Shouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Inner {
            tiers,
            flush_policy,
            writer,
            out,
            echo,
            log,
            stats,
            burst,
            ..
        } = self.inner.as_ref();
        f.debug_struct("Shouter")
            .field("tiers", tiers)
            .field("flush_policy", flush_policy)
            .field("writer", writer)
            .field("out", &out.name())
            .field("echo", &echo.as_ref().map(|e| e.sink.name().to_string()))
            .field("log", &log.as_ref().map(|s| s.name().to_string()))
            .field("stats", stats)
            .field("burst", burst)
            .finish()
    }
}
