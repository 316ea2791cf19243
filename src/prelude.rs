//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```
//! use managed_buffer::prelude::*;
//! ```

// Core types
pub use crate::types::{BufferId, ByteOffset, RegionHandle, SessionToken};

// Error handling
pub use crate::error::{Error, Result};

// Buffers
pub use crate::buffer::{
    BackingBuffer, FileBuffer, FileBufferConfig, HeapBuffer, MapPurpose, MappedBlock,
};

// Regions
pub use crate::region::{ManagedBuffer, Region};
