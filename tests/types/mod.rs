use std::{
    io,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
};

use uuid::Uuid;
use uuid_shouter::{IdSource, Identifier, Sink, ID_LEN};

/// Hands out `00000000-0000-0000-0000-000000000000`, `...0001` and so on.
#[derive(Debug, Default)]
pub struct SequentialSource {
    next: AtomicU64,
}

impl SequentialSource {
    /// How many identifiers have been handed out so far.
    pub fn generated(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl IdSource for SequentialSource {
    fn next_id(&self) -> Identifier {
        Identifier::from_uuid(Uuid::from_u128(self.next.fetch_add(1, Ordering::SeqCst) as u128))
    }
}

/// Keeps every write, separately.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.writes()
            .into_iter()
            .map(|w| String::from_utf8(w).unwrap())
            .collect()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.writes.lock().unwrap().push(buf.to_vec());
        Ok(())
    }
}

/// Counts identifiers written as run-on lines, without keeping them.
#[derive(Debug, Default)]
pub struct CountingSink {
    writes: AtomicUsize,
    ids: AtomicUsize,
}

impl CountingSink {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn ids(&self) -> usize {
        self.ids.load(Ordering::SeqCst)
    }
}

impl Sink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        assert_eq!(buf.last(), Some(&b'\n'), "every write is one whole line");
        assert_eq!((buf.len() - 1) % ID_LEN, 0, "run-on lines hold whole ids");

        self.writes.fetch_add(1, Ordering::SeqCst);
        self.ids.fetch_add((buf.len() - 1) / ID_LEN, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts lines of exactly one identifier each, written in whole-line chunks.
#[derive(Debug, Default)]
pub struct LineCountingSink {
    lines: AtomicUsize,
}

impl LineCountingSink {
    pub fn lines(&self) -> usize {
        self.lines.load(Ordering::SeqCst)
    }
}

impl Sink for LineCountingSink {
    fn name(&self) -> &str {
        "line-counting"
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        assert_eq!(buf.last(), Some(&b'\n'), "chunks end on a line boundary");

        let lines = buf.strip_suffix(b"\n").unwrap_or(buf).split(|b| *b == b'\n');
        let mut count = 0;
        for line in lines {
            assert_eq!(line.len(), ID_LEN, "one identifier per line");
            count += 1;
        }

        self.lines.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every write.
#[derive(Debug, Default)]
pub struct BrokenSink;

impl Sink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn write_all(&self, _buf: &[u8]) -> io::Result<()> {
        Err(io::ErrorKind::BrokenPipe.into())
    }
}

/// Split a run-on line back into identifiers.
pub fn ids_in(line: &[u8]) -> Vec<String> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.chunks(ID_LEN)
        .map(|id| String::from_utf8(id.to_vec()).unwrap())
        .collect()
}
