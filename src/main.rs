use std::{process::ExitCode, sync::Arc};

use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use uuid_shouter::{
    sink::{FileSink, StderrSink, StdoutSink},
    Config, Result, Shouter, UuidV4Source, WorkerPool,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics share stderr with the echo stream, so only errors unless asked.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::ERROR.into())
                .from_env_lossy(),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::default();
    let log = FileSink::append(config.stats_log())?;

    let shouter = Shouter::builder()
        .config(config.clone())
        .source(Arc::new(UuidV4Source))
        .out(Arc::new(StdoutSink))
        .echo(Arc::new(StderrSink))
        .log(Arc::new(log))
        .build()?;

    let handle = WorkerPool::spawn(shouter, &config);

    tokio::select! {
        _ = terminated() => info!("Received termination signal"),
        _ = handle.stopping() => {}
    }

    handle.shut_down();
    handle.wait_for_shutdown().await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn terminated() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = term => {}
    }
}
