use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use rstest::rstest;
use uuid_shouter::{
    BurstConfig, Config, Error, FlushPolicy, Shouter, Tier, WorkerPool, ID_LEN,
};

use crate::types::{BrokenSink, CountingSink, LineCountingSink, MemorySink, SequentialSource};

/// Given a pool running flat out
/// When it is shut down
/// Then every identifier generated has been echoed once and written by every tier
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[rstest]
#[timeout(Duration::from_secs(10))]
async fn nothing_is_lost_on_shutdown() {
    let config = Config::builder()
        .tiers(vec![Tier::new(100, "hundred"), Tier::new(100_000, "hundred-k")])
        .flush_policy(FlushPolicy::new(Duration::from_millis(5)))
        .bursts(false)
        .echo_buffer(1000)
        .workers(3)
        .build();
    let source = Arc::new(SequentialSource::default());
    let out = Arc::new(CountingSink::default());
    let echo = Arc::new(LineCountingSink::default());
    let log = Arc::new(MemorySink::default());

    let shouter = Shouter::builder()
        .config(config.clone())
        .source(source.clone())
        .out(out.clone())
        .echo(echo.clone())
        .log(log.clone())
        .build()
        .unwrap();

    let handle = WorkerPool::spawn(shouter, &config);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shut_down();
    tokio_test::assert_ok!(handle.wait_for_shutdown().await);

    let generated = source.generated() as usize;
    assert!(generated > 0);
    assert_eq!(out.ids(), 2 * generated);
    assert_eq!(echo.lines(), generated);

    // Periodic ticks plus the final one on shutdown.
    let lines = log.lines();
    assert!(lines.len() >= 2, "expected several stats lines, got {lines:?}");
    assert!(lines.iter().all(|l| l.contains(" UUIDs per second, ")));
}

/// Given a pool of 4 workers and a burst armed at startup
/// When it runs until shut down
/// Then exactly one burst is written
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[rstest]
#[timeout(Duration::from_secs(10))]
async fn one_burst_per_arming() {
    let config = Config::builder()
        .tiers(vec![Tier::new(1_000_000, "million")])
        .flush_policy(FlushPolicy::new(Duration::from_secs(60)))
        .burst(BurstConfig {
            interval: Duration::from_secs(60),
            target_bytes: 1000 * ID_LEN as u64,
        })
        .echo(false)
        .workers(4)
        .build();
    let out = Arc::new(MemorySink::default());

    let shouter = Shouter::builder()
        .config(config.clone())
        .source(Arc::new(SequentialSource::default()))
        .out(out.clone())
        .build()
        .unwrap();

    let handle = WorkerPool::spawn(shouter, &config);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shut_down();
    handle.wait_for_shutdown().await.unwrap();

    // One burst armed at startup, then the shutdown flush of the tier.
    let writes = out.writes();
    let bursts = writes
        .iter()
        .filter(|w| w.len() == 1000 * ID_LEN + 1)
        .count();
    assert_eq!(bursts, 1);
}

/// Given an output sink that fails
/// When the pool runs
/// Then it stops by itself and reports the write failure
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[rstest]
#[timeout(Duration::from_secs(10))]
async fn write_failure_stops_the_pool() {
    let config = Config::builder()
        .tiers(vec![Tier::new(4, "four")])
        .bursts(false)
        .echo(false)
        .workers(2)
        .build();

    let shouter = Shouter::builder()
        .config(config.clone())
        .source(Arc::new(SequentialSource::default()))
        .out(Arc::new(BrokenSink))
        .build()
        .unwrap();

    let handle = WorkerPool::spawn(shouter, &config);
    handle.stopping().await;

    let result = handle.wait_for_shutdown().await;
    assert_matches!(result, Err(Error::Write { sink, .. }) if sink == "broken");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[rstest]
#[timeout(Duration::from_secs(10))]
async fn dropping_the_handle_stops_the_workers() {
    let config = Config::builder()
        .tiers(vec![Tier::new(10, "ten")])
        .bursts(false)
        .echo(false)
        .workers(2)
        .build();
    let source = Arc::new(SequentialSource::default());

    let shouter = Shouter::builder()
        .config(config.clone())
        .source(source.clone())
        .out(Arc::new(CountingSink::default()))
        .build()
        .unwrap();

    drop(WorkerPool::spawn(shouter, &config));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stopped_at = source.generated();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.generated(), stopped_at);
}
