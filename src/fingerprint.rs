//! Content + mode digests used to decide whether a destination is current.
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::fs::PERMISSION_BITS;

/// SHA-256 over a file's permission bits followed by its full content.
///
/// Two fingerprints are equal exactly when both mode and content are
/// byte-identical. Ownership is not included. This detects drift, it does
/// not defend against tampering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint `mode` and everything readable from `reader`, then rewind
    /// `reader` to its start so the same handle can be copied from.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read or the reader cannot be
    /// repositioned.
    pub fn compute<R: Read + Seek + ?Sized>(mode: u32, reader: &mut R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update((mode & PERMISSION_BITS).to_le_bytes());
        io::copy(reader, &mut hasher)?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self(hasher.finalize().into()))
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
