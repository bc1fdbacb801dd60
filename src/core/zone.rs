//! Zone records and zone-kind classification.
//!
//! A zone belongs to exactly one player and holds an ordered list of card
//! ids. Public zones (battlefield, graveyard, exile, commander) replicate
//! their order through the shared document. Hidden zones (library, hand,
//! sideboard) replicate only an empty placeholder: the true order and count
//! live in the server-only hidden-state partition and must never appear
//! here.

use serde::{Deserialize, Serialize};

use super::ids::{CardId, PlayerId, ZoneId};

/// The kind of a zone, fixing its visibility and ordering rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Library,
    Hand,
    Battlefield,
    Graveyard,
    Exile,
    /// Commander zone. Older documents wrote this as `"command"`.
    #[serde(alias = "command")]
    Commander,
    Sideboard,
}

impl ZoneKind {
    /// Whether cards in this zone are absent from the public document.
    #[must_use]
    pub fn is_hidden(self) -> bool {
        matches!(self, ZoneKind::Library | ZoneKind::Hand | ZoneKind::Sideboard)
    }

    /// Whether this zone uses free-form battlefield placement.
    #[must_use]
    pub fn is_battlefield(self) -> bool {
        matches!(self, ZoneKind::Battlefield)
    }

    /// All zone kinds a joining player receives.
    pub fn all() -> impl Iterator<Item = ZoneKind> {
        [
            ZoneKind::Library,
            ZoneKind::Hand,
            ZoneKind::Battlefield,
            ZoneKind::Graveyard,
            ZoneKind::Exile,
            ZoneKind::Commander,
            ZoneKind::Sideboard,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ZoneKind::Library => "library",
            ZoneKind::Hand => "hand",
            ZoneKind::Battlefield => "battlefield",
            ZoneKind::Graveyard => "graveyard",
            ZoneKind::Exile => "exile",
            ZoneKind::Commander => "commander",
            ZoneKind::Sideboard => "sideboard",
        };
        write!(f, "{}", name)
    }
}

/// A zone record in the replicated document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Unique identifier for this zone.
    pub id: ZoneId,

    /// Kind, fixing visibility and placement semantics.
    #[serde(rename = "type")]
    pub kind: ZoneKind,

    /// Owning player. Every zone has exactly one owner.
    pub owner_id: PlayerId,

    /// Ordered card ids. Empty placeholder for hidden zones.
    #[serde(default)]
    pub card_ids: Vec<CardId>,
}

impl Zone {
    /// Create an empty zone.
    #[must_use]
    pub fn new(id: ZoneId, kind: ZoneKind, owner_id: PlayerId) -> Self {
        Self {
            id,
            kind,
            owner_id,
            card_ids: Vec::new(),
        }
    }

    /// Whether this zone's contents are hidden from the public document.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.kind.is_hidden()
    }

    /// Number of cards replicated publicly (always 0 for hidden zones).
    #[must_use]
    pub fn public_len(&self) -> usize {
        self.card_ids.len()
    }

    /// Whether the public list contains a card.
    #[must_use]
    pub fn contains(&self, card: &CardId) -> bool {
        self.card_ids.iter().any(|c| c == card)
    }
}
