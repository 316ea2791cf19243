//! Named-region allocator with on-demand compaction over persistently
//! mapped buffers.
//!
//! A [`ManagedBuffer`] carves one contiguous block of externally-owned,
//! mappable memory into named, variable-length regions. Regions are tracked
//! by byte offset relative to the mapping session, read and written through
//! the mapping, and compacted on demand: [`ManagedBuffer::defragment`]
//! slides them into a gap-free prefix without changing the committed
//! footprint.
//!
//! # Key components
//!
//! - **Buffer**: the [`buffer::BackingBuffer`] trait plus file-backed
//!   ([`FileBuffer`]) and heap-backed ([`buffer::HeapBuffer`])
//!   implementations. Only *terminal* (fixed, persistent) storage may be
//!   mapped for region tracking.
//! - **Regions**: name-keyed placement bookkeeping with overlap rejection
//!   and deterministic, offset-ordered compaction.
//! - **Handles**: [`RegionHandle`]s resolve by name on every access, so
//!   compaction never invalidates them; unmapping does, fail-fast.
//!
//! # Example
//!
//! ```
//! use managed_buffer::prelude::*;
//!
//! # fn main() -> managed_buffer::Result<()> {
//! let managed = ManagedBuffer::new(HeapBuffer::new(1024));
//! managed.map(MapPurpose::ReadWrite)?;
//!
//! let vertices = managed.region(0, 100, "vertices")?;
//! managed.region(300, 50, "indices")?;
//! managed.write(&vertices, &[7u8; 100])?;
//!
//! // Close the gap left between the two regions.
//! assert!(managed.defragment()?);
//! assert_eq!(managed.describe("indices")?.offset.as_u64(), 100);
//! assert_eq!(managed.read(&vertices)?, vec![7u8; 100]);
//!
//! managed.unmap()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod error;
pub mod prelude;
pub mod region;
pub mod types;

// Re-export key types at crate root for convenience
pub use buffer::{BackingBuffer, FileBuffer, FileBufferConfig, HeapBuffer, MapPurpose, MappedBlock};
pub use error::{Error, Result};
pub use region::{ManagedBuffer, Region};
pub use types::{BufferId, ByteOffset, RegionHandle, SessionToken};
