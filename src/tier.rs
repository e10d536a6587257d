use std::fmt::{self, Display};

use parking_lot::Mutex;

use crate::{
    policy::{FlushPolicy, OnAppend},
    source::{Identifier, ID_LEN},
};

/// Upper bound on how many identifiers' worth of memory a tier reserves up front.
///
/// Tiers larger than this grow on demand.
pub(crate) const MAX_RESERVED_IDS: usize = 1 << 20;

/// A capacity-bounded buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    capacity: usize,
    label: String,
}

/// Identifiers drained from a tier (or generated in a burst), ready to be written.
///
/// Held as one contiguous blob of concatenated identifiers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Batch {
    blob: Vec<u8>,
}

/// The buffer for a single tier.
///
/// All operations lock the tier, so an append, a fullness check and a drain from different
/// threads never interleave.
#[derive(Debug)]
pub struct TierBuffer {
    tier: Tier,
    reserve: usize,
    ids: Mutex<Batch>,
}

impl Tier {
    /// Create a tier. `capacity` is counted in identifiers.
    pub fn new(capacity: usize, label: impl Into<String>) -> Self {
        Self {
            capacity,
            label: label.into(),
        }
    }

    /// The six standard tiers, smallest first.
    pub fn defaults() -> Vec<Tier> {
        vec![
            Tier::new(512, "512"),
            Tier::new(4096, "4096"),
            Tier::new(65535, "65535"),
            Tier::new(1_000_000, "1M"),
            Tier::new(10_000_000, "10M"),
            Tier::new(100_000_000, "100M"),
        ]
    }

    /// Maximum number of identifiers held before a full-flush.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Human-readable name, used in logs and labelled output.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ids)", self.label, self.capacity)
    }
}

impl Batch {
    /// An empty batch with room for `ids` identifiers.
    pub fn with_capacity(ids: usize) -> Self {
        Self {
            blob: Vec::with_capacity(ids * ID_LEN),
        }
    }

    pub(crate) fn push(&mut self, id: &Identifier) {
        self.blob.extend_from_slice(id.as_bytes());
    }

    /// Number of identifiers in the batch.
    pub fn len(&self) -> usize {
        self.blob.len() / ID_LEN
    }

    /// Whether the batch holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    /// Total size of the identifiers, excluding any separators or line terminators.
    pub fn byte_len(&self) -> usize {
        self.len() * ID_LEN
    }

    /// The identifiers, in the order they were added.
    pub fn ids(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.blob.chunks_exact(ID_LEN).map(Identifier::from_chunk)
    }

    /// All identifiers concatenated, with no separator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }
}

impl FromIterator<Identifier> for Batch {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut batch = Batch::with_capacity(iter.size_hint().0);
        for id in iter {
            batch.push(&id);
        }
        batch
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch").field("len", &self.len()).finish()
    }
}

impl TierBuffer {
    /// Create an empty buffer, reserving space for the tier's capacity.
    pub fn new(tier: Tier) -> Self {
        let reserve = tier.capacity.min(MAX_RESERVED_IDS);
        Self {
            ids: Mutex::new(Batch::with_capacity(reserve)),
            reserve,
            tier,
        }
    }

    /// The tier this buffer fills.
    pub fn tier(&self) -> &Tier {
        &self.tier
    }

    /// Add an identifier.
    ///
    /// A full buffer must be drained first; appending to it hands the identifier back.
    pub fn append(&self, id: Identifier) -> Result<(), Identifier> {
        let mut ids = self.ids.lock();
        if ids.len() >= self.tier.capacity {
            return Err(id);
        }
        ids.push(&id);
        Ok(())
    }

    /// Add an identifier and, if that filled the tier, drain it in the same critical section.
    ///
    /// This is the capacity trigger: whichever thread fills the tier owns the returned batch.
    pub fn append_and_take_if_full(&self, id: Identifier, policy: &FlushPolicy) -> Option<Batch> {
        let mut ids = self.ids.lock();
        ids.push(&id);

        match policy.on_append(ids.len(), self.tier.capacity) {
            OnAppend::Flush => Some(std::mem::replace(
                &mut *ids,
                Batch::with_capacity(self.reserve),
            )),
            OnAppend::Hold => None,
        }
    }

    /// Whether the buffer holds its full capacity.
    pub fn is_full(&self) -> bool {
        self.ids.lock().len() >= self.tier.capacity
    }

    /// Number of identifiers currently held.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// Whether the buffer holds nothing.
    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    /// Take everything currently held, leaving the buffer empty with its reservation intact.
    pub fn drain(&self) -> Batch {
        let mut ids = self.ids.lock();
        std::mem::replace(&mut *ids, Batch::with_capacity(self.reserve))
    }
}
