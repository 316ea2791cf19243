//! Byte offsets into a mapping session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset into a mapped buffer, in bytes from the session base.
///
/// Offsets are the invariant-bearing quantity for region tracking: a region
/// is always described by `(offset, length)` relative to the current session,
/// never by an absolute address. Live addresses are derived lazily at access
/// time, so relocating a region is a pure metadata update plus a byte move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteOffset(u64);

impl ByteOffset {
    /// Offset zero, the session base.
    pub const ZERO: Self = Self(0);

    /// Create a new byte offset.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Get the raw offset value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Get the raw offset as a `usize` for slice indexing.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Add a byte count.
    #[must_use]
    pub const fn add(&self, bytes: u64) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u64> for ByteOffset {
    fn from(offset: u64) -> Self {
        Self(offset)
    }
}

impl From<usize> for ByteOffset {
    fn from(offset: usize) -> Self {
        Self(offset as u64)
    }
}
