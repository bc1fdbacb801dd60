//! Card records: faces, visibility flags, battlefield state.
//!
//! A card record lives in exactly one of two partitions at any moment:
//! the public document's card map, or the hidden-state card map. Zone
//! membership decides which. The record itself is identical in both
//! partitions so the movement machine can hand it across without loss.
//!
//! ## Visibility flags
//!
//! - `known_to_all`: identity became public through normal play (entering
//!   a face-up public zone) and stays public until the card hides again.
//! - `revealed_to_all` / `revealed_to`: explicit reveal grants. These are
//!   bookkeeping inputs for the overlay builder, not direct client data.
//!
//! ## CardLite
//!
//! [`CardLite`] is the redacted projection that crosses the trust boundary
//! inside overlays and the public reveal mirrors. It carries identity
//! (faces, stats, counters) and placement, and omits the server-side
//! visibility bookkeeping.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::ids::{CardId, PlayerId, ZoneId};

/// Maximum number of named players a single reveal may target.
pub const MAX_REVEAL_TARGETS: usize = 8;

/// Normalized battlefield position, both axes in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Create a position, clamping both axes into the unit square.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

/// Why a battlefield card is face down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaceDownMode {
    /// Turned face down by hand.
    Manual,
    /// Cast as a morph.
    Morph,
    /// Cast as a megamorph.
    MegaMorph,
}

/// One printed face of a card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFace {
    pub name: String,

    #[serde(default)]
    pub type_line: String,

    #[serde(default)]
    pub text: String,

    /// Printed power, kept as text ("*", "1+*").
    #[serde(default)]
    pub power: Option<String>,

    #[serde(default)]
    pub toughness: Option<String>,
}

impl CardFace {
    /// Create a face with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A card record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,

    /// Who the card belongs to. Never changes after creation.
    pub owner_id: PlayerId,

    /// Who currently controls it. Changes through battlefield handoff.
    pub controller_id: PlayerId,

    pub zone_id: ZoneId,

    #[serde(default)]
    pub tapped: bool,

    #[serde(default)]
    pub face_down: bool,

    #[serde(default)]
    pub face_down_mode: Option<FaceDownMode>,

    /// Identity became public through normal play.
    #[serde(default)]
    pub known_to_all: bool,

    /// Explicit reveal to everyone.
    #[serde(default)]
    pub revealed_to_all: bool,

    /// Explicit reveal to named players (at most [`MAX_REVEAL_TARGETS`]).
    #[serde(default)]
    pub revealed_to: SmallVec<[PlayerId; MAX_REVEAL_TARGETS]>,

    /// Index into `faces` of the face currently showing.
    #[serde(default)]
    pub face_index: usize,

    pub faces: Vec<CardFace>,

    /// Current power override; `None` falls back to the printed face.
    #[serde(default)]
    pub power: Option<String>,

    #[serde(default)]
    pub toughness: Option<String>,

    #[serde(default)]
    pub counters: FxHashMap<String, i32>,

    /// Normalized battlefield position. Meaningless off the battlefield.
    #[serde(default)]
    pub position: Option<Position>,

    /// Rotation in degrees (battlefield display only).
    #[serde(default)]
    pub rotation: i32,

    #[serde(default)]
    pub is_token: bool,

    #[serde(default)]
    pub is_commander: bool,

    #[serde(default)]
    pub commander_tax: u32,
}

impl Card {
    /// Create a face-up card owned and controlled by `owner`.
    #[must_use]
    pub fn new(id: CardId, owner: PlayerId, zone: ZoneId, faces: Vec<CardFace>) -> Self {
        Self {
            id,
            controller_id: owner.clone(),
            owner_id: owner,
            zone_id: zone,
            tapped: false,
            face_down: false,
            face_down_mode: None,
            known_to_all: false,
            revealed_to_all: false,
            revealed_to: SmallVec::new(),
            face_index: 0,
            faces,
            power: None,
            toughness: None,
            counters: FxHashMap::default(),
            position: None,
            rotation: 0,
            is_token: false,
            is_commander: false,
            commander_tax: 0,
        }
    }

    /// The face currently showing.
    #[must_use]
    pub fn current_face(&self) -> Option<&CardFace> {
        self.faces.get(self.face_index)
    }

    /// Display name of the current face, or empty when identity is stripped.
    #[must_use]
    pub fn name(&self) -> &str {
        self.current_face().map_or("", |f| f.name.as_str())
    }

    /// Whether an explicit or structural reveal exposes this card to `viewer`.
    #[must_use]
    pub fn is_revealed_to(&self, viewer: &PlayerId) -> bool {
        self.revealed_to_all || self.revealed_to.iter().any(|p| p == viewer)
    }

    /// Drop every public-knowledge and reveal flag.
    pub fn clear_reveals(&mut self) {
        self.known_to_all = false;
        self.revealed_to_all = false;
        self.revealed_to.clear();
    }

    /// Project into the redacted client shape.
    #[must_use]
    pub fn lite(&self) -> CardLite {
        CardLite {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            controller_id: self.controller_id.clone(),
            zone_id: self.zone_id.clone(),
            face_index: self.face_index,
            faces: self.faces.clone(),
            power: self.power.clone(),
            toughness: self.toughness.clone(),
            counters: self.counters.clone(),
            is_token: self.is_token,
            is_commander: self.is_commander,
        }
    }
}

/// Redacted card projection sent to clients.
///
/// Also used as the identity snapshot for face-down battlefield cards and
/// the public reveal mirrors, since both are exactly "identity without
/// server bookkeeping".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLite {
    pub id: CardId,
    pub owner_id: PlayerId,
    pub controller_id: PlayerId,
    pub zone_id: ZoneId,
    pub face_index: usize,
    pub faces: Vec<CardFace>,

    #[serde(default)]
    pub power: Option<String>,

    #[serde(default)]
    pub toughness: Option<String>,

    #[serde(default)]
    pub counters: FxHashMap<String, i32>,

    #[serde(default)]
    pub is_token: bool,

    #[serde(default)]
    pub is_commander: bool,
}

impl CardLite {
    /// Display name of the current face.
    #[must_use]
    pub fn name(&self) -> &str {
        self.faces.get(self.face_index).map_or("", |f| f.name.as_str())
    }
}
