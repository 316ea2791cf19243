//! Backing buffers: the externally-owned memory a [`crate::ManagedBuffer`]
//! carves into regions.
//!
//! A backing buffer owns a fixed-length block of storage and controls its
//! mapping lifecycle. The region allocator only ever sees the mapped bytes as
//! a slice; it never holds a base pointer of its own, so an `unmap` cannot
//! leave dangling addresses behind.
//!
//! Two implementations ship with the crate:
//!
//! - [`FileBuffer`]: a fixed-size, exclusively-locked, memory-mapped file.
//!   Fixed-size locked storage is *terminal*: its length and backing pages
//!   cannot change for the lifetime of the buffer, which is the precondition
//!   for long-lived region tracking.
//! - [`HeapBuffer`]: a heap-backed block for tests and in-process embedding,
//!   optionally non-terminal to exercise guard paths.

mod file;
mod heap;

pub use file::{FileBuffer, FileBufferConfig, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use heap::HeapBuffer;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a mapping is being established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapPurpose {
    /// The caller will only read through the mapping.
    Read,
    /// The caller will only write through the mapping.
    Write,
    /// The caller will both read and write.
    ReadWrite,
}

impl fmt::Display for MapPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read-write",
        };
        f.write_str(s)
    }
}

/// Description of an active mapping, returned by [`BackingBuffer::map`].
///
/// The base address stays behind the buffer's slice accessors; only the
/// length and purpose are surfaced as values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedBlock {
    /// Total mapped length in bytes.
    pub length: u64,
    /// The purpose the mapping was established with.
    pub purpose: MapPurpose,
}

/// A fixed-length block of externally-owned storage that can be mapped into
/// process memory.
///
/// The trait is the collaborator boundary for the region allocator: the
/// allocator calls `map`/`unmap` to drive the session lifecycle and accesses
/// bytes exclusively through `mapped_bytes`/`mapped_bytes_mut` while a
/// mapping is active.
pub trait BackingBuffer {
    /// Total storage length in bytes (fixed for the buffer's lifetime).
    fn len(&self) -> u64;

    /// Whether the buffer holds no storage.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a mapping is currently active.
    fn is_mapped(&self) -> bool;

    /// Whether the buffer has terminal (fixed, persistent) storage.
    ///
    /// Region tracking over a non-terminal buffer is unsafe: its mapping may
    /// be invalidated by unrelated storage operations, so [`map`] must fail
    /// with `NotTerminal` for such buffers.
    ///
    /// [`map`]: BackingBuffer::map
    fn is_terminal(&self) -> bool;

    /// Establish a mapping.
    ///
    /// # Errors
    /// `NotTerminal` if the buffer lacks terminal storage, `AlreadyMapped` if
    /// a mapping is active, `BufferMap` on mapping failure.
    fn map(&mut self, purpose: MapPurpose) -> Result<MappedBlock>;

    /// Tear down the active mapping.
    ///
    /// # Errors
    /// `NotMapped` if no mapping is active, `BufferUnmap` on flush failure.
    fn unmap(&mut self) -> Result<()>;

    /// The mapped bytes, valid while the mapping is active.
    ///
    /// # Errors
    /// `NotMapped` if no mapping is active.
    fn mapped_bytes(&self) -> Result<&[u8]>;

    /// The mapped bytes, mutably.
    ///
    /// # Errors
    /// `NotMapped` if no mapping is active.
    fn mapped_bytes_mut(&mut self) -> Result<&mut [u8]>;
}
