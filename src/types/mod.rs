//! Core types for managed-buffer.
//!
//! This module provides the fundamental types used throughout the crate:
//! - `ByteOffset`: byte offset relative to the start of a mapping session
//! - `BufferId`: unique identifier for a managed buffer instance
//! - `SessionToken`: identifies one mapping session of a buffer
//! - `RegionHandle`: a name-keyed, session-scoped reference to a region

mod handle;
mod offset;

pub use handle::{BufferId, RegionHandle, SessionToken};
pub use offset::ByteOffset;
