//! Heap-backed buffer for tests and in-process embedding.

use super::{BackingBuffer, MapPurpose, MappedBlock};
use crate::error::{Error, Result};

/// A heap-backed block of storage.
///
/// Behaves like a file buffer without the file: the storage length is fixed
/// at construction and contents survive unmap/remap cycles. A buffer built
/// with [`HeapBuffer::volatile`] is non-terminal and refuses to map, which is
/// how callers exercise the allocator's session guard without a real
/// driver-managed buffer behind it.
pub struct HeapBuffer {
    storage: Vec<u8>,
    mapped: bool,
    terminal: bool,
}

impl HeapBuffer {
    /// Create a terminal heap buffer of the given length, zero-filled.
    #[must_use]
    pub fn new(len: u64) -> Self {
        Self {
            storage: vec![0u8; len as usize],
            mapped: false,
            terminal: true,
        }
    }

    /// Create a non-terminal heap buffer.
    ///
    /// Mapping it always fails with `NotTerminal`.
    #[must_use]
    pub fn volatile(len: u64) -> Self {
        Self {
            storage: vec![0u8; len as usize],
            mapped: false,
            terminal: false,
        }
    }
}

impl BackingBuffer for HeapBuffer {
    fn len(&self) -> u64 {
        self.storage.len() as u64
    }

    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn map(&mut self, purpose: MapPurpose) -> Result<MappedBlock> {
        if !self.terminal {
            return Err(Error::NotTerminal {
                cause: "volatile heap buffer cannot be mapped".to_string(),
            });
        }
        if self.mapped {
            return Err(Error::AlreadyMapped);
        }

        self.mapped = true;

        Ok(MappedBlock {
            length: self.len(),
            purpose,
        })
    }

    fn unmap(&mut self) -> Result<()> {
        if !self.mapped {
            return Err(Error::NotMapped {
                cause: "buffer has no active mapping".to_string(),
            });
        }
        self.mapped = false;
        Ok(())
    }

    fn mapped_bytes(&self) -> Result<&[u8]> {
        if !self.mapped {
            return Err(Error::NotMapped {
                cause: "buffer has no active mapping".to_string(),
            });
        }
        Ok(&self.storage)
    }

    fn mapped_bytes_mut(&mut self) -> Result<&mut [u8]> {
        if !self.mapped {
            return Err(Error::NotMapped {
                cause: "buffer has no active mapping".to_string(),
            });
        }
        Ok(&mut self.storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_unmap_cycle() {
        let mut buffer = HeapBuffer::new(1024);
        assert!(buffer.is_terminal());
        assert!(!buffer.is_mapped());

        let block = buffer.map(MapPurpose::ReadWrite).unwrap();
        assert_eq!(block.length, 1024);

        buffer.mapped_bytes_mut().unwrap()[0] = 0xAB;
        buffer.unmap().unwrap();

        // Contents survive the remap.
        buffer.map(MapPurpose::Read).unwrap();
        assert_eq!(buffer.mapped_bytes().unwrap()[0], 0xAB);
    }

    #[test]
    fn volatile_refuses_to_map() {
        let mut buffer = HeapBuffer::volatile(64);
        assert!(!buffer.is_terminal());
        let err = buffer.map(MapPurpose::ReadWrite).unwrap_err();
        assert_eq!(err.code(), "E005");
    }

    #[test]
    fn double_map_rejected() {
        let mut buffer = HeapBuffer::new(64);
        buffer.map(MapPurpose::Read).unwrap();
        assert_eq!(buffer.map(MapPurpose::Read).unwrap_err().code(), "E004");
    }
}
