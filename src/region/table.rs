//! Region bookkeeping: the name-keyed table and its offset-ordered index.

use crate::error::{Error, Result};
use crate::types::ByteOffset;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A named region's placement within the current session.
///
/// Regions are values: identity lives in the table key (the name), never in
/// an address. Relocation rewrites the offset and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Byte offset from the session base.
    pub offset: ByteOffset,
    /// Size in bytes, always > 0.
    pub length: u64,
}

impl Region {
    /// Create a region descriptor.
    #[must_use]
    pub const fn new(offset: ByteOffset, length: u64) -> Self {
        Self { offset, length }
    }

    /// One past the last byte of the region.
    #[must_use]
    pub const fn end(&self) -> ByteOffset {
        ByteOffset::new(self.offset.as_u64() + self.length)
    }

    /// Whether the given byte offset falls inside `[offset, end)`.
    #[must_use]
    pub const fn contains(&self, offset: ByteOffset) -> bool {
        offset.as_u64() >= self.offset.as_u64() && offset.as_u64() < self.end().as_u64()
    }
}

/// The source of truth for what is allocated where in one mapping session.
///
/// Keyed by name in a `HashMap`, with a `BTreeMap` offset index alongside.
/// The index gives three things the name map cannot: deterministic
/// ascending-offset iteration for compaction, interval intersection checks on
/// insert, and owner lookup for an arbitrary byte offset.
///
/// The two structures are kept in lockstep by the mutating methods; a running
/// usage total tracks the sum of live lengths. Crate-internal: relocation and
/// index maintenance are not safe to drive with arbitrary offsets, so the
/// public surface is [`crate::ManagedBuffer`].
#[derive(Debug, Default)]
pub(crate) struct RegionTable {
    by_name: HashMap<String, Region>,
    by_offset: BTreeMap<u64, String>,
    usage: u64,
}

impl RegionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the table holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Sum of all live region lengths in bytes.
    #[must_use]
    pub fn usage(&self) -> u64 {
        self.usage
    }

    /// Whether a region with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a region by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Region> {
        self.by_name.get(name).copied()
    }

    /// The name of the live region intersecting `[offset, offset + length)`,
    /// if any.
    #[must_use]
    pub fn overlapping(&self, offset: ByteOffset, length: u64) -> Option<&str> {
        let start = offset.as_u64();
        let end = start.saturating_add(length);

        // The only candidate starting at or before `start` is its closest
        // predecessor in the index; everything else below starts even earlier
        // and ends no later.
        if let Some((_, name)) = self.by_offset.range(..=start).next_back() {
            let region = self.by_name[name.as_str()];
            if region.end().as_u64() > start {
                return Some(name);
            }
        }

        // Any region starting inside the candidate range also intersects.
        if let Some((_, name)) = self.by_offset.range(start..end).next() {
            return Some(name);
        }

        None
    }

    /// Insert a new region under `name`.
    ///
    /// # Errors
    /// `InvalidRegion` if the name is already present or the byte range
    /// overflows the offset space, `RegionOverlap` if the range intersects a
    /// live region. A failed insert leaves the table untouched.
    pub fn insert(&mut self, name: &str, region: Region) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(Error::InvalidRegion {
                name: name.to_string(),
                cause: "region name already present".to_string(),
            });
        }
        if region.offset.as_u64().checked_add(region.length).is_none() {
            return Err(Error::InvalidRegion {
                name: name.to_string(),
                cause: "region end overflows the offset space".to_string(),
            });
        }

        if let Some(existing) = self.overlapping(region.offset, region.length) {
            return Err(Error::RegionOverlap {
                name: name.to_string(),
                offset: region.offset,
                length: region.length,
                existing: existing.to_string(),
            });
        }

        self.by_offset.insert(region.offset.as_u64(), name.to_string());
        self.by_name.insert(name.to_string(), region);
        self.usage += region.length;
        Ok(())
    }

    /// Remove a region by name. Absence is a no-op.
    ///
    /// Returns the removed descriptor if one existed.
    pub fn remove(&mut self, name: &str) -> Option<Region> {
        let region = self.by_name.remove(name)?;
        self.by_offset.remove(&region.offset.as_u64());
        self.usage -= region.length;
        Some(region)
    }

    /// Move a region's bookkeeping to a new offset.
    ///
    /// Metadata only; the byte move is the relocation primitive's job, and so
    /// is range-level validation. This guards the index itself: a destination
    /// slot held by another region would silently evict its entry.
    ///
    /// # Errors
    /// `RegionNotFound` if the name is absent, `RegionOverlap` if a different
    /// region's entry already sits at `new_offset`.
    pub fn set_offset(&mut self, name: &str, new_offset: ByteOffset) -> Result<()> {
        let region = self
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::RegionNotFound {
                name: name.to_string(),
            })?;

        if let Some(occupant) = self.by_offset.get(&new_offset.as_u64()) {
            if occupant != name {
                return Err(Error::RegionOverlap {
                    name: name.to_string(),
                    offset: new_offset,
                    length: region.length,
                    existing: occupant.clone(),
                });
            }
        }

        self.by_offset.remove(&region.offset.as_u64());
        self.by_offset.insert(new_offset.as_u64(), name.to_string());
        if let Some(entry) = self.by_name.get_mut(name) {
            entry.offset = new_offset;
        }
        Ok(())
    }

    /// The name of the region owning the given byte offset, if any.
    #[must_use]
    pub fn locate(&self, offset: ByteOffset) -> Option<&str> {
        let (_, name) = self.by_offset.range(..=offset.as_u64()).next_back()?;
        let region = self.by_name[name.as_str()];
        region.contains(offset).then_some(name.as_str())
    }

    /// Regions in ascending offset order, as `(name, region)` pairs.
    ///
    /// This is the deterministic iteration order compaction relies on.
    pub fn iter_by_offset(&self) -> impl Iterator<Item = (&str, Region)> + '_ {
        self.by_offset
            .values()
            .map(|name| (name.as_str(), self.by_name[name.as_str()]))
    }

    /// Names in ascending offset order, owned.
    ///
    /// Used by the compaction walk, which mutates the table as it goes.
    #[must_use]
    pub fn names_by_offset(&self) -> Vec<String> {
        self.iter_by_offset().map(|(name, _)| name.to_string()).collect()
    }

    /// Drop all regions unconditionally.
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_offset.clear();
        self.usage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: u64, length: u64) -> Region {
        Region::new(ByteOffset::new(offset), length)
    }

    #[test]
    fn insert_and_get() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 100)).unwrap();
        table.insert("b", region(300, 50)).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.usage(), 150);
        assert_eq!(table.get("a").unwrap().length, 100);
        assert_eq!(table.get("b").unwrap().offset.as_u64(), 300);
        assert!(table.get("c").is_none());
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 10)).unwrap();

        assert!(table.remove("missing").is_none());
        assert_eq!(table.remove("a").unwrap().length, 10);
        assert_eq!(table.usage(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn overlap_detected_against_predecessor() {
        let mut table = RegionTable::new();
        table.insert("a", region(100, 50)).unwrap();

        // Starts inside "a".
        let err = table.insert("b", region(120, 10)).unwrap_err();
        assert_eq!(err.code(), "E103");
    }

    #[test]
    fn overlap_detected_against_successor() {
        let mut table = RegionTable::new();
        table.insert("a", region(100, 50)).unwrap();

        // Starts before "a" but runs into it.
        let err = table.insert("b", region(80, 30)).unwrap_err();
        assert_eq!(err.code(), "E103");
        // Failed insert leaves no trace.
        assert_eq!(table.len(), 1);
        assert_eq!(table.usage(), 50);
    }

    #[test]
    fn insert_near_offset_limit_is_rejected() {
        let mut table = RegionTable::new();
        // End would wrap past u64::MAX; must error, not panic or wrap.
        let err = table.insert("a", region(u64::MAX - 1, 10)).unwrap_err();
        assert_eq!(err.code(), "E102");
        assert!(table.is_empty());
        assert_eq!(table.usage(), 0);
    }

    #[test]
    fn duplicate_name_insert_is_rejected() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 100)).unwrap();

        let err = table.insert("a", region(500, 10)).unwrap_err();
        assert_eq!(err.code(), "E102");
        // The original survives and usage is not double-counted.
        assert_eq!(table.len(), 1);
        assert_eq!(table.usage(), 100);
        assert_eq!(table.get("a").unwrap().offset.as_u64(), 0);
    }

    #[test]
    fn set_offset_onto_occupied_slot_is_rejected() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 10)).unwrap();
        table.insert("b", region(100, 10)).unwrap();

        let err = table.set_offset("b", ByteOffset::new(0)).unwrap_err();
        assert_eq!(err.code(), "E103");
        // Both index entries survive the rejected move.
        assert_eq!(table.len(), 2);
        assert_eq!(table.names_by_offset(), vec!["a", "b"]);
        assert_eq!(table.get("b").unwrap().offset.as_u64(), 100);
    }

    #[test]
    fn adjacent_regions_do_not_overlap() {
        let mut table = RegionTable::new();
        table.insert("a", region(100, 50)).unwrap();
        table.insert("b", region(150, 50)).unwrap();
        table.insert("c", region(50, 50)).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn iteration_is_offset_ordered() {
        let mut table = RegionTable::new();
        table.insert("c", region(600, 20)).unwrap();
        table.insert("a", region(0, 100)).unwrap();
        table.insert("b", region(300, 50)).unwrap();

        let names: Vec<_> = table.iter_by_offset().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn set_offset_updates_index() {
        let mut table = RegionTable::new();
        table.insert("a", region(300, 50)).unwrap();
        table.set_offset("a", ByteOffset::new(0)).unwrap();

        assert_eq!(table.get("a").unwrap().offset.as_u64(), 0);
        let names: Vec<_> = table.names_by_offset();
        assert_eq!(names, vec!["a"]);

        let err = table.set_offset("missing", ByteOffset::new(10)).unwrap_err();
        assert_eq!(err.code(), "E101");
    }

    #[test]
    fn locate_owner_of_byte() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 100)).unwrap();
        table.insert("b", region(300, 50)).unwrap();

        assert_eq!(table.locate(ByteOffset::new(0)), Some("a"));
        assert_eq!(table.locate(ByteOffset::new(99)), Some("a"));
        assert_eq!(table.locate(ByteOffset::new(100)), None);
        assert_eq!(table.locate(ByteOffset::new(320)), Some("b"));
        assert_eq!(table.locate(ByteOffset::new(350)), None);
    }

    #[test]
    fn clear_drops_everything() {
        let mut table = RegionTable::new();
        table.insert("a", region(0, 100)).unwrap();
        table.insert("b", region(300, 50)).unwrap();

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.usage(), 0);
        assert_eq!(table.locate(ByteOffset::new(10)), None);
    }
}
