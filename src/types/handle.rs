//! Identifiers for buffers, sessions, and regions.

use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a managed buffer instance.
///
/// Used in log correlation and in on-disk file names for file-backed buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    /// UUID bytes in big-endian format.
    bytes: [u8; 16],
}

impl BufferId {
    /// Create a new random buffer ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: *Uuid::new_v4().as_bytes(),
        }
    }

    /// Create a buffer ID from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            bytes: *uuid.as_bytes(),
        }
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.bytes)
    }
}

impl Default for BufferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer_{}", self.as_uuid())
    }
}

impl SerdeSerialize for BufferId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_uuid().serialize(serializer)
    }
}

impl<'de> SerdeDeserialize<'de> for BufferId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let uuid = Uuid::deserialize(deserializer)?;
        Ok(Self::from_uuid(uuid))
    }
}

/// Identifies one mapping session of a managed buffer.
///
/// The token is bumped on every successful `map`, so any handle minted in an
/// earlier session compares unequal and fails fast instead of resolving
/// against memory the mapping no longer covers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerdeSerialize, SerdeDeserialize,
)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Create a session token from a raw counter value.
    #[must_use]
    pub const fn new(token: u64) -> Self {
        Self(token)
    }

    /// Get the raw counter value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The token following this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// A session-scoped reference to a named region.
///
/// Handles carry the region name and the session token, never an offset or
/// address: every access re-resolves the current offset through the region
/// table. This makes handles stable across compaction (the bytes move, the
/// name does not) and invalid across `unmap` (the token no longer matches).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionHandle {
    name: Arc<str>,
    token: SessionToken,
}

impl RegionHandle {
    /// Create a handle for a named region in the given session.
    #[must_use]
    pub(crate) fn new(name: impl Into<Arc<str>>, token: SessionToken) -> Self {
        Self {
            name: name.into(),
            token,
        }
    }

    /// The region name this handle refers to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapping session this handle belongs to.
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }
}

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region '{}'@{}", self.name, self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_id_uniqueness() {
        assert_ne!(BufferId::new(), BufferId::new());
    }

    #[test]
    fn buffer_id_display() {
        let id = BufferId::new();
        assert!(format!("{}", id).starts_with("buffer_"));
    }

    #[test]
    fn buffer_id_roundtrip() {
        let id = BufferId::new();
        assert_eq!(BufferId::from_uuid(id.as_uuid()), id);
    }

    #[test]
    fn buffer_id_serde_roundtrip() {
        let id = BufferId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: BufferId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn session_token_next() {
        let token = SessionToken::new(3);
        assert_eq!(token.next().as_u64(), 4);
        assert!(token < token.next());
    }

    #[test]
    fn handle_identity() {
        let a = RegionHandle::new("vertices", SessionToken::new(1));
        let b = RegionHandle::new("vertices", SessionToken::new(1));
        let c = RegionHandle::new("vertices", SessionToken::new(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "vertices");
    }

    #[test]
    fn handle_display() {
        let handle = RegionHandle::new("indices", SessionToken::new(7));
        assert_eq!(format!("{}", handle), "region 'indices'@session_7");
    }
}
