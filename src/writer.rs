use tracing::debug;

use crate::{
    error::{Error, Result},
    policy::FlushTrigger,
    sink::Sink,
    tier::Batch,
};

/// How a batch is laid out when written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchFormat {
    /// Identifiers concatenated with no separator, then a line terminator. One run-on line per
    /// batch.
    #[default]
    RunOn,
    /// A line naming the tier, then the run-on line.
    Labelled,
}

/// Serialises batches and writes each one to a sink in a single call.
///
/// Empty batches are skipped: nothing is written for them, whatever triggered the flush.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchWriter {
    format: BatchFormat,
}

impl BatchWriter {
    /// A writer laying batches out as `format`.
    pub fn new(format: BatchFormat) -> Self {
        Self { format }
    }

    /// How batches are laid out.
    pub fn format(&self) -> BatchFormat {
        self.format
    }

    /// Write the batch as one line, in a single call to the sink. Returns the number of bytes
    /// written.
    pub fn write(
        &self,
        batch: &Batch,
        sink: &dyn Sink,
        label: &str,
        trigger: FlushTrigger,
    ) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let newline: &[u8] = b"\n";
        let run_on = [batch.as_bytes(), newline];
        let labelled = [label.as_bytes(), newline, batch.as_bytes(), newline];
        let parts: &[&[u8]] = match self.format {
            BatchFormat::RunOn => &run_on,
            BatchFormat::Labelled => &labelled,
        };
        sink.write_all_parts(parts).map_err(|source| Error::Write {
            sink: sink.name().to_string(),
            source,
        })?;

        let bytes: usize = parts.iter().map(|part| part.len()).sum();
        debug!(
            tier = label,
            %trigger,
            ids = batch.len(),
            bytes,
            "Flushed batch to {}",
            sink.name()
        );

        Ok(bytes)
    }
}
