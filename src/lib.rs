//! Shout UUIDs at stdout until something breaks.
//!
//! A load generator for anything downstream of a process's output: terminals, pipes, log
//! shippers. Several generation loops run flat out, producing random UUIDs. Each one is echoed
//! to a side channel, and added to every tier: a set of buffers of very different sizes. A tier
//! is written out as one enormous line when it fills up, and every tier is written out once a
//! second regardless. Every so often one loop also writes a single 100 MB burst.
//!
//! The result is a mix of steady, bursty and occasionally gigantic writes. Throughput is logged
//! once per second.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod burst;
mod config;
pub mod error;
mod policy;
mod shouter;
pub mod sink;
mod source;
pub mod stats;
mod tier;
mod worker;
mod writer;

pub use burst::{BurstConfig, BurstGenerator, BurstSchedule};
pub use config::{Config, DEFAULT_ECHO_BUFFER, DEFAULT_STATS_LOG};
pub use error::{Error, Result};
pub use policy::{FlushPolicy, FlushTrigger};
pub use shouter::{Shouter, Step};
pub use sink::Sink;
pub use source::{IdSource, Identifier, UuidV4Source, ID_LEN};
pub use stats::{StatsReporter, StatsTick};
pub use tier::{Batch, Tier, TierBuffer};
pub use worker::{WorkerHandle, WorkerPool};
pub use writer::{BatchFormat, BatchWriter};
