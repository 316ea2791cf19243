//! Named-region allocation over a mapped buffer.
//!
//! The region layer turns one mapping session of a [`crate::buffer`] into a
//! set of named, non-overlapping byte ranges:
//!
//! - The `table` module is the bookkeeping: `name -> (offset, length)`, with
//!   an offset-ordered index for deterministic iteration, overlap rejection,
//!   and owner-of-byte lookup.
//! - The `compact` module holds the relocation primitive and the
//!   left-packing walk behind [`ManagedBuffer::defragment`].
//! - [`ManagedBuffer`] is the public surface: session lifecycle, region
//!   create/erase/lookup, byte access through handles, and compaction.
//!
//! All of it is scoped to the current session; `unmap` throws the table away
//! and the backing storage alone carries state between sessions.
//!
//! [`ManagedBuffer::defragment`]: ManagedBuffer::defragment

mod compact;
mod manager;
mod table;

pub use manager::ManagedBuffer;
pub use table::Region;
