//! Destinations for generated output.
//!
//! Every [`Sink::write_all`] call is written as one unit: concurrent writers to the same sink
//! never see their lines interleaved.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Somewhere to write bytes.
pub trait Sink: 'static + Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Write the whole buffer, holding the sink exclusively for the duration of the call.
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// Write several buffers back to back as one unit.
    ///
    /// The default joins them and makes one [`write_all`](Sink::write_all) call. Sinks that can
    /// hold their lock across several writes should override this to avoid the copy.
    fn write_all_parts(&self, parts: &[&[u8]]) -> io::Result<()> {
        self.write_all(&parts.concat())
    }
}

/// Collects whole lines and hands them to a sink in chunks.
///
/// Each chunk is one [`Sink::write_all`] call ending on a line boundary, so lines from different
/// buffers sharing a sink never interleave.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    limit: usize,
}

/// Process standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

/// Process standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

/// Any writer, guarded by a mutex.
#[derive(Debug)]
pub struct LockedSink<W> {
    name: String,
    writer: Mutex<W>,
}

/// An append-only file.
pub type FileSink = LockedSink<File>;

impl Sink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.write_all_parts(&[buf])
    }

    fn write_all_parts(&self, parts: &[&[u8]]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for part in parts {
            out.write_all(part)?;
        }
        out.flush()
    }
}

impl Sink for StderrSink {
    fn name(&self) -> &str {
        "stderr"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(buf)
    }

    fn write_all_parts(&self, parts: &[&[u8]]) -> io::Result<()> {
        let mut err = io::stderr().lock();
        parts.iter().try_for_each(|part| err.write_all(part))
    }
}

impl LineBuffer {
    /// Buffer up to `limit` bytes before writing. A limit of zero writes every line straight
    /// away.
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Add `line` and a terminator, writing the buffer out if it has reached the limit.
    pub fn push_line(&mut self, line: &[u8], sink: &dyn Sink) -> Result<()> {
        self.buf.extend_from_slice(line);
        self.buf.push(b'\n');

        if self.buf.len() >= self.limit {
            self.flush(sink)?;
        }
        Ok(())
    }

    /// Write out whatever is buffered. Returns the number of bytes written.
    pub fn flush(&mut self, sink: &dyn Sink) -> Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }

        sink.write_all(&self.buf).map_err(|source| Error::Write {
            sink: sink.name().to_string(),
            source,
        })?;

        let written = self.buf.len();
        self.buf.clear();
        Ok(written)
    }

    /// Bytes waiting to be written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is waiting to be written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl<W: Write> LockedSink<W> {
    /// Wrap `writer`, naming it `name` in logs and errors.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl LockedSink<File> {
    /// Open `path` for appending, creating it if it doesn't exist. Never truncates.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::OpenLog {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::new(path.display().to_string(), file))
    }
}

impl<W> Sink for LockedSink<W>
where
    W: 'static + Write + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.write_all_parts(&[buf])
    }

    fn write_all_parts(&self, parts: &[&[u8]]) -> io::Result<()> {
        let mut writer = self.writer.lock();
        for part in parts {
            writer.write_all(part)?;
        }
        writer.flush()
    }
}
