//! Identifier newtypes for room entities.
//!
//! Clients submit their own identifiers (the replicated document is shared
//! with them), so every id is a string newtype rather than a dense integer.
//! The newtypes keep the id spaces from mixing: a `CardId` can never be
//! passed where a `ZoneId` is expected.
//!
//! ## Usage
//!
//! ```
//! use cardroom::core::{CardId, ZoneId};
//!
//! let card = CardId::new("c1");
//! let zone = ZoneId::new("z-battlefield-p1");
//!
//! assert_eq!(card.as_str(), "c1");
//! assert_ne!(zone.as_str(), card.as_str());
//! ```

use serde::{Deserialize, Serialize};

/// Identifier for a player in the room.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create a new player ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check for the empty id, which no valid player may carry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a card record (public or hidden).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    /// Create a new card ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    /// Create a new zone ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Create a new room ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one connected viewer (a socket, not a player).
///
/// Several connections may view the room as the same player, and spectator
/// connections have no player at all.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a new connection ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_str() {
        let p = PlayerId::new("p1");
        assert_eq!(p.as_str(), "p1");
        assert_eq!(format!("{}", p), "p1");
        assert!(!p.is_empty());
        assert!(PlayerId::new("").is_empty());
    }

    #[test]
    fn test_id_serde_transparent() {
        let c = CardId::new("c42");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"c42\"");

        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_ids_as_map_keys() {
        use rustc_hash::FxHashMap;

        let mut map: FxHashMap<ZoneId, u32> = FxHashMap::default();
        map.insert(ZoneId::new("library-p1"), 60);
        assert_eq!(map.get(&ZoneId::new("library-p1")), Some(&60));
    }
}
