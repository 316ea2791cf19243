//! Error types for managed-buffer.
//!
//! This module provides strongly-typed errors with actionable context.
//! Every error carries a stable code (e.g. `E104`) in its display string so
//! log lines can be grepped and asserted on without matching prose.

use crate::types::ByteOffset;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for managed-buffer operations.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Buffer Errors (E001-E099)
    // =========================================================================
    /// Failed to create or open the backing buffer.
    #[error("E001: Failed to create buffer at {path}: {cause}")]
    BufferCreate {
        /// The path where buffer creation failed.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to map the backing buffer into memory.
    #[error("E002: Failed to map buffer: {cause}")]
    BufferMap {
        /// Reason for the mapping failure.
        cause: String,
    },

    /// Failed to unmap the backing buffer.
    #[error("E003: Failed to unmap buffer: {cause}")]
    BufferUnmap {
        /// Reason for the unmap failure.
        cause: String,
    },

    /// Map requested while a mapping is already active.
    #[error("E004: Buffer is already mapped")]
    AlreadyMapped,

    /// Operation requires terminal (fixed, persistent) storage.
    #[error("E005: Buffer is not terminal: {cause}")]
    NotTerminal {
        /// Why terminal storage is required here.
        cause: String,
    },

    /// Region operation attempted without a valid mapping session.
    #[error("E006: No valid mapping session: {cause}")]
    NotMapped {
        /// Which part of the session guard failed.
        cause: String,
    },

    // =========================================================================
    // Region Errors (E101-E199)
    // =========================================================================
    /// Named region does not exist in the current session.
    #[error("E101: No region named '{name}' in the current session")]
    RegionNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// Region parameters are malformed (empty name, zero length).
    #[error("E102: Invalid region '{name}': {cause}")]
    InvalidRegion {
        /// The offending region name.
        name: String,
        /// What is wrong with the request.
        cause: String,
    },

    /// Requested byte range intersects an existing region.
    #[error(
        "E103: Region '{name}' at [{offset}, +{length}) overlaps existing region '{existing}'"
    )]
    RegionOverlap {
        /// The region being created.
        name: String,
        /// Requested start offset.
        offset: ByteOffset,
        /// Requested length in bytes.
        length: u64,
        /// The live region it collides with.
        existing: String,
    },

    /// Byte range exceeds the session length, or the compaction cursor
    /// overran the mapping (corrupted internal invariant).
    #[error("E104: Capacity exceeded: requested {requested} bytes, capacity {capacity}")]
    CapacityExceeded {
        /// End of the requested byte range.
        requested: u64,
        /// The capacity the request ran past.
        capacity: u64,
    },

    /// Handle from a previous mapping session.
    #[error("E105: Stale handle for region '{name}': session has been unmapped")]
    StaleHandle {
        /// The region the handle referred to.
        name: String,
    },
}

impl Error {
    /// Get the stable error code (e.g., "E104").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BufferCreate { .. } => "E001",
            Self::BufferMap { .. } => "E002",
            Self::BufferUnmap { .. } => "E003",
            Self::AlreadyMapped => "E004",
            Self::NotTerminal { .. } => "E005",
            Self::NotMapped { .. } => "E006",
            Self::RegionNotFound { .. } => "E101",
            Self::InvalidRegion { .. } => "E102",
            Self::RegionOverlap { .. } => "E103",
            Self::CapacityExceeded { .. } => "E104",
            Self::StaleHandle { .. } => "E105",
        }
    }

    /// Check if this error indicates a corrupted internal invariant.
    ///
    /// A `CapacityExceeded` raised from the compaction walk means the region
    /// table and the mapping disagree; the allocator state must be discarded.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    /// Check if this error is a session-guard failure (mapping precondition).
    #[must_use]
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            Self::NotMapped { .. } | Self::NotTerminal { .. } | Self::StaleHandle { .. }
        )
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = Error::RegionNotFound {
            name: "vertices".to_string(),
        };
        assert_eq!(err.code(), "E101");

        let err = Error::CapacityExceeded {
            requested: 2048,
            capacity: 1024,
        };
        assert_eq!(err.code(), "E104");
    }

    #[test]
    fn error_display_contains_code_and_context() {
        let err = Error::RegionOverlap {
            name: "b".to_string(),
            offset: ByteOffset::new(0x40),
            length: 32,
            existing: "a".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("E103"));
        assert!(msg.contains("'b'"));
        assert!(msg.contains("'a'"));
        assert!(msg.contains("0x00000040"));
    }

    #[test]
    fn fatal_classification() {
        assert!(
            Error::CapacityExceeded {
                requested: 10,
                capacity: 5
            }
            .is_fatal()
        );
        assert!(
            !Error::RegionNotFound {
                name: "x".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn guard_failure_classification() {
        assert!(
            Error::NotMapped {
                cause: "no session".to_string()
            }
            .is_guard_failure()
        );
        assert!(
            Error::StaleHandle {
                name: "a".to_string()
            }
            .is_guard_failure()
        );
        assert!(!Error::AlreadyMapped.is_guard_failure());
    }
}
