use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::future::join_all;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    config::Config,
    error::{Error, Result},
    shouter::Shouter,
};

/// Runs generation loops, the flush timer and the burst ticker.
#[derive(Debug)]
pub struct WorkerPool;

/// A handle to the running pool.
///
/// Used for shutting the pool down and waiting for it to finish. Dropping the handle signals the
/// pool to stop, but doesn't wait for the final flush.
#[derive(Debug)]
pub struct WorkerHandle {
    shouter: Shouter,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<Result<()>>>,
}

/// Broadcast to every task that the pool is stopping.
#[derive(Debug, Clone)]
struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    /// Polled by the generation loops on every iteration.
    triggered: AtomicBool,
    /// Awaited by the timer tasks.
    tx: watch::Sender<bool>,
}

impl WorkerPool {
    /// Start the pool. Must be called from within a Tokio runtime.
    ///
    /// Spawns `config.workers()` generation loops on the blocking pool, numbered from `0`. Only
    /// loop `0` produces big bursts.
    pub fn spawn(shouter: Shouter, config: &Config) -> WorkerHandle {
        let shutdown = Shutdown::new();
        let mut tasks = Vec::with_capacity(config.workers() + 2);

        for worker in 0..config.workers() {
            let shouter = shouter.clone();
            let shutdown = shutdown.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                generate(worker, shouter, shutdown)
            }));
        }

        tasks.push(tokio::spawn(flush_periodically(
            shouter.clone(),
            config.flush_policy().interval(),
            shutdown.clone(),
        )));

        if let Some(burst) = config.burst() {
            tasks.push(tokio::spawn(arm_bursts(
                shouter.clone(),
                burst.interval,
                shutdown.clone(),
            )));
        }

        info!("Started worker pool with {config}");

        WorkerHandle {
            shouter,
            shutdown,
            tasks,
        }
    }
}

impl WorkerHandle {
    /// Signal every task to stop. Buffered identifiers are written out by
    /// [`wait_for_shutdown()`](WorkerHandle::wait_for_shutdown).
    pub fn shut_down(&self) {
        self.shutdown.trigger();
    }

    /// Resolves once shutdown has been requested, either by [`shut_down()`](Self::shut_down) or
    /// because a task failed.
    pub async fn stopping(&self) {
        self.shutdown.wait().await;
    }

    /// Wait for every task to stop, then flush the echo buffers and all tiers, and report the
    /// last statistics.
    ///
    /// Returns the first failure if any task failed. Nothing more is written in that case.
    pub async fn wait_for_shutdown(mut self) -> Result<()> {
        let tasks = std::mem::take(&mut self.tasks);

        let mut failure = None;
        for result in join_all(tasks).await {
            let err = match result {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => Error::TaskFailed(join_err),
            };
            failure.get_or_insert(err);
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let shouter = self.shouter.clone();
        let tick = tokio::task::spawn_blocking(move || shouter.finish()).await??;

        info!(
            final_ids = tick.ids,
            final_bytes = tick.bytes,
            "Worker pool has shut down"
        );
        Ok(())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl Shutdown {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                tx,
            }),
        }
    }

    fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::AcqRel) {
            debug!("Shutdown triggered");
        }
        self.inner.tx.send_replace(true);
    }

    fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        let mut rx = self.inner.tx.subscribe();
        // The sender lives as long as `self`, so this can't fail.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// One generation loop. Runs until shutdown, or until a write fails.
fn generate(worker: usize, shouter: Shouter, shutdown: Shutdown) -> Result<()> {
    debug!(worker, "Generation loop started");

    while !shutdown.is_triggered() {
        if let Err(err) = shouter.step(worker) {
            debug!(worker, "Generation loop failed: {err}");
            shutdown.trigger();
            return Err(err);
        }
    }

    debug!(worker, "Generation loop stopped");
    Ok(())
}

/// Flush every tier once per `period`.
async fn flush_periodically(shouter: Shouter, period: Duration, shutdown: Shutdown) -> Result<()> {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.wait() => return Ok(()),

            _ = ticks.tick() => {
                let shouter = shouter.clone();
                match tokio::task::spawn_blocking(move || shouter.tick()).await? {
                    Ok(tick) => debug!(ids = tick.ids, bytes = tick.bytes, "Periodic flush"),
                    Err(err) => {
                        debug!("Periodic flush failed: {err}");
                        shutdown.trigger();
                        return Err(err);
                    }
                }
            }
        }
    }
}

/// Arm a big burst once per `period`, starting immediately.
async fn arm_bursts(shouter: Shouter, period: Duration, shutdown: Shutdown) -> Result<()> {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.wait() => return Ok(()),

            _ = ticks.tick() => shouter.arm_burst(),
        }
    }
}
