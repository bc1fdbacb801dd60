//! Player records.
//!
//! The per-zone counts on a player are caches derived from the hidden
//! order lists; `hidden::HiddenState::update_player_counts` is the only
//! legitimate writer. Clients read the counts to render opponents' hand
//! and library sizes without ever seeing the contents.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ids::PlayerId;

/// Library top-card reveal mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LibraryTopReveal {
    /// Top card identity replicated to everyone.
    #[serde(rename = "all")]
    All,
    /// Top card visible to the owner only.
    #[serde(rename = "self")]
    OwnerOnly,
}

/// A player record in the replicated document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    pub name: String,

    pub life: i32,

    /// Named counters (poison, energy, experience).
    #[serde(default)]
    pub counters: FxHashMap<String, i32>,

    /// Commander damage received, keyed by the commander's owner.
    #[serde(default)]
    pub commander_damage: FxHashMap<PlayerId, i32>,

    #[serde(default)]
    pub commander_tax: u32,

    /// Cached hidden-zone sizes. Derived from hidden order lists.
    #[serde(default)]
    pub hand_count: u32,

    #[serde(default)]
    pub library_count: u32,

    #[serde(default)]
    pub sideboard_count: u32,

    #[serde(default)]
    pub library_top_reveal: Option<LibraryTopReveal>,
}

impl Player {
    /// Create a player with the standard starting life total.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            life: 40,
            counters: FxHashMap::default(),
            commander_damage: FxHashMap::default(),
            commander_tax: 0,
            hand_count: 0,
            library_count: 0,
            sideboard_count: 0,
            library_top_reveal: None,
        }
    }

    /// Adjust a named counter by delta, removing it at zero or below.
    pub fn adjust_counter(&mut self, name: &str, delta: i32) {
        let value = self.counters.get(name).copied().unwrap_or(0) + delta;
        if value <= 0 {
            self.counters.remove(name);
        } else {
            self.counters.insert(name.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player() {
        let p = Player::new(PlayerId::new("p1"), "Alice");
        assert_eq!(p.life, 40);
        assert_eq!(p.hand_count, 0);
        assert!(p.library_top_reveal.is_none());
    }

    #[test]
    fn test_adjust_counter() {
        let mut p = Player::new(PlayerId::new("p1"), "Alice");

        p.adjust_counter("poison", 2);
        assert_eq!(p.counters.get("poison"), Some(&2));

        p.adjust_counter("poison", -1);
        assert_eq!(p.counters.get("poison"), Some(&1));

        p.adjust_counter("poison", -5);
        assert!(p.counters.get("poison").is_none());
    }

    #[test]
    fn test_top_reveal_serde_names() {
        assert_eq!(
            serde_json::to_string(&LibraryTopReveal::All).unwrap(),
            "\"all\""
        );
        assert_eq!(
            serde_json::to_string(&LibraryTopReveal::OwnerOnly).unwrap(),
            "\"self\""
        );
    }
}
