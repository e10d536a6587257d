use std::fmt::{self, Debug, Display};

use uuid::Uuid;

/// Byte length of one identifier in its canonical textual form.
pub const ID_LEN: usize = uuid::fmt::Hyphenated::LENGTH;

/// A single generated identifier.
///
/// Stored inline as the lowercase hyphenated UUID text, so it can be copied into any number of
/// buffers without allocating.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(pub(crate) [u8; ID_LEN]);

/// Produces fresh identifiers on demand.
///
/// Implementations must be cheap to call from many threads at once.
pub trait IdSource: 'static + Send + Sync {
    /// Generate the next identifier.
    fn next_id(&self) -> Identifier;
}

/// Random (version 4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Source;

impl Identifier {
    /// Render a UUID into its canonical form.
    pub fn from_uuid(uuid: Uuid) -> Self {
        let mut buf = [0; ID_LEN];
        uuid.hyphenated().encode_lower(&mut buf);
        Self(buf)
    }

    /// The identifier text as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn from_chunk(chunk: &[u8]) -> Self {
        let mut buf = [0; ID_LEN];
        buf.copy_from_slice(chunk);
        Self(buf)
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only ever built from UUID text, so always ASCII.
        f.write_str(std::str::from_utf8(&self.0).map_err(|_| fmt::Error)?)
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}

impl IdSource for UuidV4Source {
    fn next_id(&self) -> Identifier {
        Identifier::from_uuid(Uuid::new_v4())
    }
}
