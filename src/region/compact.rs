//! Region relocation and the left-packing compaction walk.
//!
//! Compaction slides every region toward offset 0 in ascending-offset order,
//! closing the gaps left behind by erased regions. Lengths, names, and
//! relative order are preserved; only offsets change. Named after disk
//! defragmentation.

use super::table::RegionTable;
use crate::error::{Error, Result};
use crate::types::ByteOffset;

/// Relocate the named region to `new_offset`, moving its bytes.
///
/// Returns `false` without touching memory when the region already sits at
/// `new_offset`. The copy uses `copy_within`, which handles overlapping
/// source and destination ranges; a region shifting left by less than its own
/// length is the common case during compaction.
///
/// No check is made that the destination range is free of other regions.
/// The compaction walk is the only caller and feeds offsets that cannot
/// collide with regions it has not yet processed.
pub(crate) fn relocate(
    table: &mut RegionTable,
    bytes: &mut [u8],
    name: &str,
    new_offset: ByteOffset,
) -> Result<bool> {
    let region = table.get(name).ok_or_else(|| Error::RegionNotFound {
        name: name.to_string(),
    })?;

    if region.offset == new_offset {
        return Ok(false);
    }

    let src = region.offset.as_usize();
    let dst = new_offset.as_usize();
    let len = region.length as usize;

    bytes.copy_within(src..src + len, dst);
    table.set_offset(name, new_offset)?;

    tracing::trace!(
        region = name,
        from = %region.offset,
        to = %new_offset,
        length = region.length,
        "relocated region"
    );
    Ok(true)
}

/// Slide all regions into a contiguous prefix of the mapping.
///
/// Walks the table in ascending current-offset order, relocating each region
/// to the running cursor. Returns `true` iff at least one region moved.
///
/// # Errors
/// `CapacityExceeded` if the cursor would overrun `capacity`, which can only
/// happen when the table's bookkeeping has been corrupted; the error is
/// fatal and the allocator state should be discarded.
pub(crate) fn left_pack(table: &mut RegionTable, bytes: &mut [u8], capacity: u64) -> Result<bool> {
    let mut moved = false;
    let mut next_free: u64 = 0;

    for name in table.names_by_offset() {
        // names_by_offset snapshots the order up front; moves are strictly
        // leftward, so the snapshot stays valid as offsets shrink.
        let length = table
            .get(&name)
            .ok_or_else(|| Error::RegionNotFound { name: name.clone() })?
            .length;

        if next_free + length > capacity {
            return Err(Error::CapacityExceeded {
                requested: next_free + length,
                capacity,
            });
        }

        moved |= relocate(table, bytes, &name, ByteOffset::new(next_free))?;
        next_free += length;
    }

    Ok(moved)
}
