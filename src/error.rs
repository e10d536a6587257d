//! Errors.

use std::{io, path::PathBuf};

use thiserror::Error;
use tokio::task::JoinError;

/// Something went wrong while shouting.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The statistics log could not be opened at startup.
    ///
    /// Unrecoverable.
    #[error("Unable to open log {}", path.display())]
    OpenLog {
        /// The log path that was requested.
        path: PathBuf,
        /// Why it couldn't be opened.
        #[source]
        source: io::Error,
    },

    /// A write to a sink failed while running.
    ///
    /// Unrecoverable: the pool shuts down rather than silently dropping output.
    #[error("Unable to write to {sink}")]
    Write {
        /// The sink that failed.
        sink: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The configuration can't be run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker or timer task panicked or was cancelled.
    #[error("A worker task failed")]
    TaskFailed(#[from] JoinError),
}

/// Result type for shouting.
pub type Result<T> = std::result::Result<T, Error>;
