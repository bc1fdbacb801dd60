//! Typed access to the replicated public document.
//!
//! The document is the shared, replicated half of room state: players,
//! zones, public card records, and room metadata. The replication substrate
//! is out of scope here; this module treats the document as an ordered
//! key/value store with transaction semantics, exclusively owned by one
//! room task.
//!
//! ## Transactions
//!
//! Every intent mutates the document through [`GameDoc::transact`]: the
//! closure either commits in full, or the document rolls back to the
//! snapshot taken at entry. Snapshots are O(1) because all collections are
//! `im` persistent structures.
//!
//! ## Ordering
//!
//! Zone card lists and hidden order lists share one convention: index 0 is
//! the top. `Placement::Top` inserts at the front, `Placement::Bottom`
//! appends.

use im::{HashMap as ImHashMap, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{Card, CardId, CardLite, Player, PlayerId, RoomId, Zone, ZoneId, ZoneKind};

/// Where to insert a card into an ordered zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Insert at the top (index 0).
    #[default]
    Top,
    /// Append at the bottom.
    Bottom,
    /// Insert at a specific index, clamped to the list length.
    Index(usize),
}

/// Replicated room metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMeta {
    pub room_id: RoomId,

    /// No further joins while locked.
    #[serde(default)]
    pub locked: bool,

    /// Current host. Reassigned when the host leaves.
    #[serde(default)]
    pub host_id: Option<PlayerId>,

    pub max_players: usize,

    /// Battlefield zoom shared by all viewers.
    #[serde(default = "default_scale")]
    pub battlefield_scale: f32,

    /// Room-wide named counters (storm count, day/night).
    #[serde(default)]
    pub global_counters: ImHashMap<String, i64>,

    /// Identity mirror for hand cards revealed to everyone.
    #[serde(default)]
    pub hand_reveals_to_all: ImHashMap<CardId, CardLite>,

    /// Identity mirror for library cards revealed to everyone.
    #[serde(default)]
    pub library_reveals_to_all: ImHashMap<CardId, CardLite>,

    /// Identity mirror for face-down battlefield cards revealed to everyone.
    #[serde(default)]
    pub face_down_reveals_to_all: ImHashMap<CardId, CardLite>,
}

fn default_scale() -> f32 {
    1.0
}

/// The replicated public document for one room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDoc {
    pub meta: RoomMeta,

    players: ImHashMap<PlayerId, Player>,

    /// Join order, drives host succession.
    player_order: Vector<PlayerId>,

    zones: ImHashMap<ZoneId, Zone>,

    /// Public card records only. Hidden-zone cards live in `HiddenState`.
    cards: ImHashMap<CardId, Card>,
}

impl GameDoc {
    /// Create an empty document for a room.
    #[must_use]
    pub fn new(room_id: RoomId, max_players: usize) -> Self {
        Self {
            meta: RoomMeta {
                room_id,
                locked: false,
                host_id: None,
                max_players,
                battlefield_scale: 1.0,
                global_counters: ImHashMap::new(),
                hand_reveals_to_all: ImHashMap::new(),
                library_reveals_to_all: ImHashMap::new(),
                face_down_reveals_to_all: ImHashMap::new(),
            },
            players: ImHashMap::new(),
            player_order: Vector::new(),
            zones: ImHashMap::new(),
            cards: ImHashMap::new(),
        }
    }

    /// Run a mutation atomically: on `Err` the document is restored to the
    /// state it had on entry.
    pub fn transact<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let checkpoint = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = checkpoint;
                Err(err)
            }
        }
    }

    // === Players ===

    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players in join order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.player_order.iter().filter_map(|id| self.players.get(id))
    }

    /// Add a player at the end of the join order.
    pub fn add_player(&mut self, player: Player) {
        self.player_order.push_back(player.id.clone());
        self.players.insert(player.id.clone(), player);
    }

    /// Remove a player record. Zones and cards are the caller's problem.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.player_order.retain(|p| p != id);
        let removed = self.players.remove(id);
        if self.meta.host_id.as_ref() == Some(id) {
            self.meta.host_id = None;
        }
        removed
    }

    /// Whether the recorded host still names an existing player.
    #[must_use]
    pub fn has_valid_host(&self) -> bool {
        self.meta
            .host_id
            .as_ref()
            .is_some_and(|id| self.players.contains_key(id))
    }

    /// First player in join order, used for host succession.
    #[must_use]
    pub fn first_player(&self) -> Option<&PlayerId> {
        self.player_order.front()
    }

    // === Zones ===

    #[must_use]
    pub fn zone(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn zone_mut(&mut self, id: &ZoneId) -> Option<&mut Zone> {
        self.zones.get_mut(id)
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id.clone(), zone);
    }

    pub fn remove_zone(&mut self, id: &ZoneId) -> Option<Zone> {
        self.zones.remove(id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// All zones owned by a player.
    pub fn zones_owned_by<'a>(
        &'a self,
        owner: &'a PlayerId,
    ) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.values().filter(move |z| &z.owner_id == owner)
    }

    /// A player's zone of the given kind, if present.
    #[must_use]
    pub fn find_zone(&self, owner: &PlayerId, kind: ZoneKind) -> Option<&Zone> {
        self.zones
            .values()
            .find(|z| z.kind == kind && &z.owner_id == owner)
    }

    // === Cards ===

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.get_mut(id)
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Insert a public card record and list it in its zone.
    ///
    /// The card's `zone_id` must name an existing public zone.
    pub fn insert_card(&mut self, card: Card, placement: Placement) {
        let zone_id = card.zone_id.clone();
        let card_id = card.id.clone();
        self.cards.insert(card_id.clone(), card);
        if let Some(zone) = self.zones.get_mut(&zone_id) {
            insert_at(&mut zone.card_ids, card_id, placement);
        }
    }

    /// Remove a public card record, delisting it from its zone.
    pub fn take_card(&mut self, id: &CardId) -> Option<Card> {
        let card = self.cards.remove(id)?;
        if let Some(zone) = self.zones.get_mut(&card.zone_id) {
            zone.card_ids.retain(|c| c != id);
        }
        Some(card)
    }

    /// Move a card between two public zone lists and update its record.
    pub fn relist_card(&mut self, id: &CardId, to_zone: &ZoneId, placement: Placement) {
        let Some(card) = self.cards.get(id) else {
            return;
        };
        let from_zone = card.zone_id.clone();
        if let Some(zone) = self.zones.get_mut(&from_zone) {
            zone.card_ids.retain(|c| c != id);
        }
        if let Some(zone) = self.zones.get_mut(to_zone) {
            insert_at(&mut zone.card_ids, id.clone(), placement);
        }
        if let Some(card) = self.cards.get_mut(id) {
            card.zone_id = to_zone.clone();
        }
    }

    /// Occupied positions on a battlefield, excluding one card.
    #[must_use]
    pub fn occupied_positions(
        &self,
        zone: &ZoneId,
        exclude: Option<&CardId>,
    ) -> Vec<crate::core::Position> {
        let Some(zone) = self.zones.get(zone) else {
            return Vec::new();
        };
        zone.card_ids
            .iter()
            .filter(|id| exclude != Some(*id))
            .filter_map(|id| self.cards.get(id))
            .filter_map(|c| c.position)
            .collect()
    }
}

fn insert_at(list: &mut Vec<CardId>, card: CardId, placement: Placement) {
    match placement {
        Placement::Top => list.insert(0, card),
        Placement::Bottom => list.push(card),
        Placement::Index(i) => {
            let idx = i.min(list.len());
            list.insert(idx, card);
        }
    }
}
