//! File-backed terminal buffer using a memory-mapped, exclusively-locked file.

use super::{BackingBuffer, MapPurpose, MappedBlock};
use crate::error::{Error, Result};
use crate::types::BufferId;
use fs2::FileExt;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Default buffer size: 16 MB.
pub const DEFAULT_BUFFER_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum buffer size: 4 GB.
pub const MAX_BUFFER_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Configuration for file-backed buffer creation.
#[derive(Debug, Clone)]
pub struct FileBufferConfig {
    /// Storage capacity in bytes.
    pub capacity: u64,
    /// Directory for buffer files.
    pub directory: PathBuf,
    /// Whether to flush the mapping to disk on unmap.
    pub flush_on_unmap: bool,
}

impl Default for FileBufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_SIZE,
            directory: std::env::temp_dir().join("managed-buffer"),
            flush_on_unmap: true,
        }
    }
}

impl FileBufferConfig {
    /// Create a small scratch configuration for testing.
    ///
    /// Uses a temporary directory with a unique name per invocation.
    pub fn scratch() -> Self {
        Self {
            capacity: 4 * 1024 * 1024, // 4 MB for tests
            directory: std::env::temp_dir().join(format!("mbuf_{}", uuid::Uuid::new_v4())),
            flush_on_unmap: false,
        }
    }

    /// Set the storage capacity.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity.min(MAX_BUFFER_SIZE);
        self
    }

    /// Set the directory for buffer files.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Enable or disable flushing to disk on unmap.
    pub fn with_flush_on_unmap(mut self, flush: bool) -> Self {
        self.flush_on_unmap = flush;
        self
    }
}

/// A fixed-size, memory-mapped file buffer.
///
/// The file is created at its full capacity, exclusively locked, and never
/// resized, so the storage is terminal: region offsets taken against one
/// mapping stay meaningful for the next. The mapping itself still comes and
/// goes with [`map`]/[`unmap`].
///
/// [`map`]: BackingBuffer::map
/// [`unmap`]: BackingBuffer::unmap
#[derive(Debug)]
pub struct FileBuffer {
    file: File,
    path: PathBuf,
    capacity: u64,
    mmap: Option<MmapMut>,
    flush_on_unmap: bool,
    id: BufferId,
}

impl FileBuffer {
    /// Create a new buffer file at its full capacity.
    pub fn create(config: &FileBufferConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.directory).map_err(|e| Error::BufferCreate {
            path: config.directory.clone(),
            cause: e.to_string(),
        })?;

        let id = BufferId::new();
        let filename = format!("buffer_{}.bin", id.as_uuid());
        let path = config.directory.join(&filename);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::BufferCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        file.try_lock_exclusive().map_err(|e| Error::BufferCreate {
            path: path.clone(),
            cause: format!("Failed to lock file: {}", e),
        })?;

        file.set_len(config.capacity)
            .map_err(|e| Error::BufferCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        tracing::debug!(buffer = %id, path = %path.display(), capacity = config.capacity, "created file buffer");

        Ok(Self {
            file,
            path,
            capacity: config.capacity,
            mmap: None,
            flush_on_unmap: config.flush_on_unmap,
            id,
        })
    }

    /// Open an existing buffer file, taking its on-disk length as capacity.
    ///
    /// The length must be non-zero and at most [`MAX_BUFFER_SIZE`], the same
    /// bounds the creation path enforces.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::BufferCreate {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        file.try_lock_exclusive().map_err(|e| Error::BufferCreate {
            path: path.clone(),
            cause: format!("Failed to lock file: {}", e),
        })?;

        let metadata = file.metadata().map_err(|e| Error::BufferCreate {
            path: path.clone(),
            cause: e.to_string(),
        })?;

        let capacity = metadata.len();
        if capacity == 0 || capacity > MAX_BUFFER_SIZE {
            return Err(Error::BufferCreate {
                path,
                cause: format!(
                    "invalid buffer file length: {} (expected 1..={})",
                    capacity, MAX_BUFFER_SIZE
                ),
            });
        }

        Ok(Self {
            file,
            capacity,
            path,
            mmap: None,
            flush_on_unmap: true,
            id: BufferId::new(),
        })
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The identifier of this buffer.
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Delete the backing file from disk.
    ///
    /// The buffer becomes unusable after this call.
    pub fn delete(self) -> Result<()> {
        let path = self.path.clone();
        drop(self);
        std::fs::remove_file(&path).map_err(|e| Error::BufferCreate {
            path,
            cause: format!("Failed to delete buffer file: {}", e),
        })
    }
}

impl BackingBuffer for FileBuffer {
    fn len(&self) -> u64 {
        self.capacity
    }

    fn is_mapped(&self) -> bool {
        self.mmap.is_some()
    }

    fn is_terminal(&self) -> bool {
        // Fixed-size, exclusively-locked storage never moves under the
        // mapping, which is exactly what terminal means.
        true
    }

    fn map(&mut self, purpose: MapPurpose) -> Result<MappedBlock> {
        if self.mmap.is_some() {
            return Err(Error::AlreadyMapped);
        }

        let mmap = unsafe {
            MmapOptions::new()
                .len(self.capacity as usize)
                .map_mut(&self.file)
                .map_err(|e| Error::BufferMap {
                    cause: e.to_string(),
                })?
        };

        self.mmap = Some(mmap);

        tracing::debug!(buffer = %self.id, %purpose, length = self.capacity, "mapped file buffer");

        Ok(MappedBlock {
            length: self.capacity,
            purpose,
        })
    }

    fn unmap(&mut self) -> Result<()> {
        let mmap = self.mmap.take().ok_or_else(|| Error::NotMapped {
            cause: "buffer has no active mapping".to_string(),
        })?;

        if self.flush_on_unmap {
            mmap.flush().map_err(|e| Error::BufferUnmap {
                cause: e.to_string(),
            })?;
        }

        tracing::debug!(buffer = %self.id, "unmapped file buffer");
        Ok(())
    }

    fn mapped_bytes(&self) -> Result<&[u8]> {
        self.mmap
            .as_deref()
            .ok_or_else(|| Error::NotMapped {
                cause: "buffer has no active mapping".to_string(),
            })
    }

    fn mapped_bytes_mut(&mut self) -> Result<&mut [u8]> {
        self.mmap
            .as_deref_mut()
            .ok_or_else(|| Error::NotMapped {
                cause: "buffer has no active mapping".to_string(),
            })
    }
}

impl Drop for FileBuffer {
    fn drop(&mut self) {
        if let Some(mmap) = self.mmap.take() {
            if self.flush_on_unmap {
                let _ = mmap.flush();
            }
        }
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_and_map() {
        let dir = tempdir().unwrap();
        let config = FileBufferConfig::scratch()
            .with_capacity(4096)
            .with_directory(dir.path());

        let mut buffer = FileBuffer::create(&config).unwrap();
        assert!(buffer.path().exists());
        assert_eq!(buffer.len(), 4096);
        assert!(buffer.is_terminal());
        assert!(!buffer.is_mapped());

        let block = buffer.map(MapPurpose::ReadWrite).unwrap();
        assert_eq!(block.length, 4096);
        assert!(buffer.is_mapped());
    }

    #[test]
    fn double_map_rejected() {
        let dir = tempdir().unwrap();
        let config = FileBufferConfig::scratch()
            .with_capacity(1024)
            .with_directory(dir.path());

        let mut buffer = FileBuffer::create(&config).unwrap();
        buffer.map(MapPurpose::ReadWrite).unwrap();

        let err = buffer.map(MapPurpose::Read).unwrap_err();
        assert_eq!(err.code(), "E004");
    }

    #[test]
    fn bytes_require_mapping() {
        let dir = tempdir().unwrap();
        let config = FileBufferConfig::scratch()
            .with_capacity(1024)
            .with_directory(dir.path());

        let mut buffer = FileBuffer::create(&config).unwrap();
        assert_eq!(buffer.mapped_bytes().unwrap_err().code(), "E006");

        buffer.map(MapPurpose::ReadWrite).unwrap();
        assert_eq!(buffer.mapped_bytes().unwrap().len(), 1024);

        buffer.unmap().unwrap();
        assert_eq!(buffer.mapped_bytes().unwrap_err().code(), "E006");
        assert_eq!(buffer.unmap().unwrap_err().code(), "E006");
    }

    #[test]
    fn contents_survive_remap() {
        let dir = tempdir().unwrap();
        let config = FileBufferConfig::scratch()
            .with_capacity(256)
            .with_directory(dir.path());

        let mut buffer = FileBuffer::create(&config).unwrap();
        buffer.map(MapPurpose::ReadWrite).unwrap();
        buffer.mapped_bytes_mut().unwrap()[..4].copy_from_slice(b"tail");
        buffer.unmap().unwrap();

        buffer.map(MapPurpose::Read).unwrap();
        assert_eq!(&buffer.mapped_bytes().unwrap()[..4], b"tail");
    }

    #[test]
    fn open_existing() {
        let dir = tempdir().unwrap();
        let config = FileBufferConfig::scratch()
            .with_capacity(512)
            .with_directory(dir.path());

        let path = {
            let buffer = FileBuffer::create(&config).unwrap();
            buffer.path().to_path_buf()
        };

        let buffer = FileBuffer::open(&path).unwrap();
        assert_eq!(buffer.len(), 512);
    }

    #[test]
    fn open_rejects_zero_length_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::File::create(&path).unwrap();

        let err = FileBuffer::open(&path).unwrap_err();
        assert_eq!(err.code(), "E001");
    }
}
