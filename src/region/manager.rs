//! The managed buffer: named regions over one mapping session.

use super::compact;
use super::table::{Region, RegionTable};
use crate::buffer::{BackingBuffer, MapPurpose, MappedBlock};
use crate::error::{Error, Result};
use crate::types::{BufferId, ByteOffset, RegionHandle, SessionToken};
use parking_lot::RwLock;
use std::sync::Arc;

/// One active mapping of the backing buffer.
#[derive(Debug, Clone, Copy)]
struct Session {
    /// Total mapped length in bytes.
    length: u64,
    /// Token identifying this session; handles carry a copy.
    token: SessionToken,
}

struct Inner<B> {
    buffer: B,
    session: Option<Session>,
    table: RegionTable,
    next_token: SessionToken,
}

impl<B: BackingBuffer> Inner<B> {
    /// The guard every region operation runs first: the buffer must report
    /// itself mapped and terminal, and a session must be recorded.
    fn verify_mapped(&self) -> Result<Session> {
        if !self.buffer.is_terminal() {
            return Err(Error::NotTerminal {
                cause: "region tracking requires terminal storage".to_string(),
            });
        }
        if !self.buffer.is_mapped() {
            return Err(Error::NotMapped {
                cause: "buffer reports no active mapping".to_string(),
            });
        }
        self.session.ok_or_else(|| Error::NotMapped {
            cause: "no mapping session recorded".to_string(),
        })
    }

    /// Resolve a handle to the current placement of its region.
    fn resolve(&self, handle: &RegionHandle) -> Result<Region> {
        let session = self.verify_mapped()?;
        if handle.token() != session.token {
            return Err(Error::StaleHandle {
                name: handle.name().to_string(),
            });
        }
        self.table
            .get(handle.name())
            .ok_or_else(|| Error::RegionNotFound {
                name: handle.name().to_string(),
            })
    }
}

/// A named-region allocator over a persistently mappable buffer.
///
/// The managed buffer carves the mapped block into named, variable-length
/// regions, tracked by byte offset relative to the session base. Regions can
/// be created, erased, read, and written while the mapping is active, and
/// [`defragment`] slides them into a contiguous prefix when erasures have
/// left gaps behind.
///
/// All region state is scoped to one mapping session: [`unmap`] discards the
/// region table unconditionally, and handles minted before the unmap fail
/// fast afterwards. The buffer's *contents* persist across sessions (that is
/// what terminal storage guarantees); only the bookkeeping does not.
///
/// The expected driving pattern is a single owning thread running
/// map → allocate/erase/compact → unmap in sequence. The interior lock makes
/// the type `Clone + Send` for handing to that thread; it is not a
/// concurrency story for the region operations themselves, and the allocator
/// performs no fencing against external consumers of the memory.
///
/// [`defragment`]: ManagedBuffer::defragment
/// [`unmap`]: ManagedBuffer::unmap
pub struct ManagedBuffer<B: BackingBuffer> {
    inner: Arc<RwLock<Inner<B>>>,
    id: BufferId,
}

impl<B: BackingBuffer> Clone for ManagedBuffer<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            id: self.id,
        }
    }
}

impl<B: BackingBuffer> ManagedBuffer<B> {
    /// Wrap a backing buffer. The buffer should be unmapped; the first
    /// session starts with [`map`](ManagedBuffer::map).
    pub fn new(buffer: B) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                buffer,
                session: None,
                table: RegionTable::new(),
                next_token: SessionToken::new(1),
            })),
            id: BufferId::new(),
        }
    }

    /// The identifier of this managed buffer.
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Total storage length of the backing buffer in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.inner.read().buffer.len()
    }

    /// Whether a mapping session is active.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        let inner = self.inner.read();
        inner.session.is_some() && inner.buffer.is_mapped()
    }

    /// Number of live regions in the current session.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.inner.read().table.len()
    }

    /// Establish a mapping session.
    ///
    /// Delegates to the backing buffer's `map` (which requires terminal
    /// storage) and records the returned block as the new session. The
    /// region table is empty at session start; names used in a prior session
    /// are not restored.
    ///
    /// # Errors
    /// `NotTerminal`, `AlreadyMapped`, or `BufferMap` from the buffer.
    pub fn map(&self, purpose: MapPurpose) -> Result<MappedBlock> {
        let mut inner = self.inner.write();
        if inner.session.is_some() {
            return Err(Error::AlreadyMapped);
        }

        let block = inner.buffer.map(purpose)?;
        debug_assert!(inner.table.is_empty(), "region table leaked across sessions");

        let token = inner.next_token;
        inner.next_token = token.next();
        inner.session = Some(Session {
            length: block.length,
            token,
        });

        tracing::debug!(buffer = %self.id, %token, %purpose, length = block.length, "mapping session started");
        Ok(block)
    }

    /// Tear down the mapping session.
    ///
    /// Clears the region table unconditionally: the table is bookkeeping for
    /// the current mapping, not persistent allocation metadata.
    ///
    /// # Errors
    /// `NotMapped` if no session is active, `BufferUnmap` on flush failure.
    /// The table is cleared even on error.
    pub fn unmap(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let result = inner.buffer.unmap();
        inner.table.clear();
        inner.session = None;
        tracing::debug!(buffer = %self.id, "mapping session ended");
        result
    }

    /// Carve a named region at `[offset, offset + size)`.
    ///
    /// If `name` already exists the existing region is returned unchanged;
    /// creation is idempotent per name and never an overwrite. The requested
    /// range must lie within the session and must not intersect any live
    /// region.
    ///
    /// # Errors
    /// `NotMapped`/`NotTerminal` from the session guard, `InvalidRegion` for
    /// an empty name or zero size, `CapacityExceeded` when the range runs
    /// past the session, `RegionOverlap` on intersection.
    pub fn region(&self, offset: u64, size: u64, name: &str) -> Result<RegionHandle> {
        let mut inner = self.inner.write();
        let session = inner.verify_mapped()?;

        if name.is_empty() {
            return Err(Error::InvalidRegion {
                name: name.to_string(),
                cause: "region name must be non-empty".to_string(),
            });
        }
        if size == 0 {
            return Err(Error::InvalidRegion {
                name: name.to_string(),
                cause: "region size must be non-zero".to_string(),
            });
        }

        if inner.table.contains(name) {
            return Ok(RegionHandle::new(name, session.token));
        }

        let end = offset
            .checked_add(size)
            .ok_or(Error::CapacityExceeded {
                requested: u64::MAX,
                capacity: session.length,
            })?;
        if end > session.length {
            return Err(Error::CapacityExceeded {
                requested: end,
                capacity: session.length,
            });
        }

        inner
            .table
            .insert(name, Region::new(ByteOffset::new(offset), size))?;

        tracing::debug!(buffer = %self.id, region = name, offset, size, "region created");
        Ok(RegionHandle::new(name, session.token))
    }

    /// Remove the named region if present; absence is a no-op.
    ///
    /// # Errors
    /// `NotMapped`/`NotTerminal` from the session guard.
    pub fn erase(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        inner.verify_mapped()?;
        if inner.table.remove(name).is_some() {
            tracing::debug!(buffer = %self.id, region = name, "region erased");
        }
        Ok(())
    }

    /// Look up a live region by name.
    ///
    /// # Errors
    /// `RegionNotFound` when the name is absent, guard errors otherwise.
    pub fn lookup(&self, name: &str) -> Result<RegionHandle> {
        let inner = self.inner.read();
        let session = inner.verify_mapped()?;
        if !inner.table.contains(name) {
            return Err(Error::RegionNotFound {
                name: name.to_string(),
            });
        }
        Ok(RegionHandle::new(name, session.token))
    }

    /// The current placement of a named region.
    ///
    /// The snapshot goes stale on the next [`defragment`]; re-resolve rather
    /// than caching it across compaction.
    ///
    /// [`defragment`]: ManagedBuffer::defragment
    ///
    /// # Errors
    /// `RegionNotFound` when the name is absent, guard errors otherwise.
    pub fn describe(&self, name: &str) -> Result<Region> {
        let inner = self.inner.read();
        inner.verify_mapped()?;
        inner.table.get(name).ok_or_else(|| Error::RegionNotFound {
            name: name.to_string(),
        })
    }

    /// The region owning the given byte offset, if any.
    ///
    /// # Errors
    /// Guard errors only; a miss is `Ok(None)`.
    pub fn region_at(&self, offset: u64) -> Result<Option<RegionHandle>> {
        let inner = self.inner.read();
        let session = inner.verify_mapped()?;
        Ok(inner
            .table
            .locate(ByteOffset::new(offset))
            .map(|name| RegionHandle::new(name, session.token)))
    }

    /// Read a region's bytes.
    ///
    /// # Errors
    /// `StaleHandle` for a handle from a previous session, `RegionNotFound`
    /// if the region was erased, guard errors otherwise.
    pub fn read(&self, handle: &RegionHandle) -> Result<Vec<u8>> {
        let inner = self.inner.read();
        let region = inner.resolve(handle)?;
        let bytes = inner.buffer.mapped_bytes()?;
        let start = region.offset.as_usize();
        Ok(bytes[start..start + region.length as usize].to_vec())
    }

    /// Write `data` at the start of the region.
    ///
    /// # Errors
    /// `CapacityExceeded` when `data` is longer than the region, plus the
    /// same resolution errors as [`read`](ManagedBuffer::read).
    pub fn write(&self, handle: &RegionHandle, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.write();
        let region = inner.resolve(handle)?;

        if data.len() as u64 > region.length {
            return Err(Error::CapacityExceeded {
                requested: data.len() as u64,
                capacity: region.length,
            });
        }

        let bytes = inner.buffer.mapped_bytes_mut()?;
        let start = region.offset.as_usize();
        bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Sum of all live region lengths in bytes.
    ///
    /// # Errors
    /// Guard errors only.
    pub fn regions_usage(&self) -> Result<u64> {
        let inner = self.inner.read();
        inner.verify_mapped()?;
        Ok(inner.table.usage())
    }

    /// Whether region usage equals the session length.
    ///
    /// A capacity check, not a coverage check; it is meaningful because
    /// overlapping regions are rejected at creation.
    ///
    /// # Errors
    /// Guard errors only.
    pub fn regions_full(&self) -> Result<bool> {
        let inner = self.inner.read();
        let session = inner.verify_mapped()?;
        Ok(inner.table.usage() == session.length)
    }

    /// Eliminate gaps between regions by sliding them toward offset 0.
    ///
    /// Regions are processed in ascending current-offset order and packed
    /// into `[0, regions_usage())`, preserving relative order, lengths, and
    /// contents. Returns `true` iff at least one region moved; an immediate
    /// second call returns `false`. When usage already equals the session
    /// length there can be no gaps and the table is not inspected.
    ///
    /// Outstanding handles stay valid (they resolve by name), but any
    /// [`describe`] snapshot taken before the call is stale.
    ///
    /// [`describe`]: ManagedBuffer::describe
    ///
    /// # Errors
    /// Guard errors, or a fatal `CapacityExceeded` if the table and the
    /// mapping disagree about sizes.
    pub fn defragment(&self) -> Result<bool> {
        let mut inner = self.inner.write();
        let session = inner.verify_mapped()?;

        // Full usage means zero gaps; skip the walk entirely.
        if inner.table.usage() == session.length {
            return Ok(false);
        }

        let Inner { buffer, table, .. } = &mut *inner;
        let bytes = buffer.mapped_bytes_mut()?;
        let moved = compact::left_pack(table, bytes, session.length)?;

        tracing::debug!(buffer = %self.id, moved, usage = table.usage(), "defragment completed");
        Ok(moved)
    }
}
