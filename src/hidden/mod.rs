//! Server-only hidden state: the private half of the room.
//!
//! Holds every card currently in a hidden zone, the authoritative order
//! of each hidden zone, identity snapshots for face-down battlefield
//! cards, and all reveal bookkeeping. Nothing in this module is ever sent
//! to a client directly; the overlay builder projects entitled slices out
//! of it.
//!
//! ## Order authority
//!
//! The order lists here are the only source of truth for hidden-zone
//! contents. The public document carries derived hand/library/sideboard
//! counts on each player record, recomputed by [`HiddenState::update_player_counts`]
//! after every mutation. Public zone placeholders stay empty.
//!
//! ## Reveal mirrors
//!
//! Cards revealed to *everyone* are additionally mirrored into the public
//! document (`RoomMeta`), so late joiners and reconnecting clients see
//! them without a private overlay round trip. The mirror maps are written
//! only from this module.

pub mod chunk;

pub use chunk::{chunk_hidden_cards, MAX_CHUNK_BYTES};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{Card, CardId, CardLite, LibraryTopReveal, PlayerId, ZoneKind, MAX_REVEAL_TARGETS};
use crate::document::{GameDoc, Placement};

/// An explicit reveal of one hidden card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealGrant {
    /// Revealed to every viewer, including spectators.
    #[serde(default)]
    pub to_all: bool,

    /// Revealed to these named players (at most [`MAX_REVEAL_TARGETS`]).
    #[serde(default)]
    pub to_players: SmallVec<[PlayerId; MAX_REVEAL_TARGETS]>,
}

impl RevealGrant {
    /// Normalize a raw reveal request into a canonical grant.
    ///
    /// Deduplicates targets, drops the owner (who always sees their own
    /// cards), and caps the list at [`MAX_REVEAL_TARGETS`].
    #[must_use]
    pub fn build(owner: &PlayerId, to_all: bool, to: &[PlayerId]) -> Self {
        let mut to_players: SmallVec<[PlayerId; MAX_REVEAL_TARGETS]> = SmallVec::new();
        if !to_all {
            for target in to {
                if target == owner || to_players.iter().any(|p| p == target) {
                    continue;
                }
                if to_players.len() == MAX_REVEAL_TARGETS {
                    break;
                }
                to_players.push(target.clone());
            }
        }
        Self { to_all, to_players }
    }

    /// Whether this grant exposes the card to `viewer`.
    #[must_use]
    pub fn applies_to(&self, viewer: &PlayerId) -> bool {
        self.to_all || self.to_players.iter().any(|p| p == viewer)
    }
}

/// The server-only hidden partition of room state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenState {
    /// Card records currently in hidden zones.
    pub cards: FxHashMap<CardId, Card>,

    /// Authoritative hand order per player, top first.
    pub hand_order: FxHashMap<PlayerId, Vec<CardId>>,

    /// Authoritative library order per player, top first.
    pub library_order: FxHashMap<PlayerId, Vec<CardId>>,

    /// Authoritative sideboard order per player.
    pub sideboard_order: FxHashMap<PlayerId, Vec<CardId>>,

    /// Identity snapshots for face-down battlefield cards.
    pub face_down_battlefield: FxHashMap<CardId, CardLite>,

    pub hand_reveals: FxHashMap<CardId, RevealGrant>,

    pub library_reveals: FxHashMap<CardId, RevealGrant>,

    pub face_down_reveals: FxHashMap<CardId, RevealGrant>,

    /// Active top-N library view requests, per owner.
    #[serde(default)]
    pub library_views: FxHashMap<PlayerId, usize>,
}

impl HiddenState {
    /// Create an empty hidden state for a new room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One-time migration from a legacy document that replicated hidden
    /// zones publicly: pulls every hidden-zone card out of the document,
    /// adopting the public zone order as the authoritative one.
    #[must_use]
    pub fn migrate_from_public(doc: &mut GameDoc) -> Self {
        let mut hidden = Self::new();

        let hidden_zones: Vec<(ZoneKind, PlayerId, Vec<CardId>)> = doc
            .zones()
            .filter(|z| z.is_hidden())
            .map(|z| (z.kind, z.owner_id.clone(), z.card_ids.clone()))
            .collect();

        for (kind, owner, card_ids) in hidden_zones {
            for card_id in card_ids {
                if let Some(card) = doc.take_card(&card_id) {
                    hidden.insert_card(card, kind, &owner, Placement::Bottom);
                }
            }
            hidden.update_player_counts(doc, &owner);
        }

        hidden
    }

    /// Whether the hidden partition holds this card.
    #[must_use]
    pub fn contains(&self, id: &CardId) -> bool {
        self.cards.contains_key(id)
    }

    // === Order lists ===

    /// The authoritative order of a hidden zone, top first.
    ///
    /// Empty for public kinds and for players with no cards there.
    #[must_use]
    pub fn order(&self, kind: ZoneKind, owner: &PlayerId) -> &[CardId] {
        self.order_map(kind)
            .and_then(|m| m.get(owner))
            .map_or(&[], Vec::as_slice)
    }

    /// Mutable order list; `None` for non-hidden kinds.
    pub fn order_mut(&mut self, kind: ZoneKind, owner: &PlayerId) -> Option<&mut Vec<CardId>> {
        let map = match kind {
            ZoneKind::Hand => &mut self.hand_order,
            ZoneKind::Library => &mut self.library_order,
            ZoneKind::Sideboard => &mut self.sideboard_order,
            _ => return None,
        };
        Some(map.entry(owner.clone()).or_default())
    }

    fn order_map(&self, kind: ZoneKind) -> Option<&FxHashMap<PlayerId, Vec<CardId>>> {
        match kind {
            ZoneKind::Hand => Some(&self.hand_order),
            ZoneKind::Library => Some(&self.library_order),
            ZoneKind::Sideboard => Some(&self.sideboard_order),
            _ => None,
        }
    }

    /// Park a card in the hidden partition and list it in the zone order.
    ///
    /// Returns `false` (and drops nothing) if `kind` is not hidden.
    pub fn insert_card(
        &mut self,
        card: Card,
        kind: ZoneKind,
        zone_owner: &PlayerId,
        placement: Placement,
    ) -> bool {
        let id = card.id.clone();
        let Some(order) = self.order_mut(kind, zone_owner) else {
            return false;
        };
        match placement {
            Placement::Top => order.insert(0, id.clone()),
            Placement::Bottom => order.push(id.clone()),
            Placement::Index(i) => {
                let idx = i.min(order.len());
                order.insert(idx, id.clone());
            }
        }
        self.cards.insert(id, card);
        true
    }

    /// Remove a card from the hidden partition, scrubbing every order list.
    pub fn take_card(&mut self, id: &CardId) -> Option<Card> {
        let card = self.cards.remove(id)?;
        for map in [
            &mut self.hand_order,
            &mut self.library_order,
            &mut self.sideboard_order,
        ] {
            for order in map.values_mut() {
                order.retain(|c| c != id);
            }
        }
        Some(card)
    }

    // === Derived counts ===

    /// Recompute a player's cached hidden-zone counts from the order
    /// lists. The sole legitimate writer of those counts.
    pub fn update_player_counts(&self, doc: &mut GameDoc, player: &PlayerId) {
        let hand = self.order(ZoneKind::Hand, player).len() as u32;
        let library = self.order(ZoneKind::Library, player).len() as u32;
        let sideboard = self.order(ZoneKind::Sideboard, player).len() as u32;
        if let Some(p) = doc.player_mut(player) {
            p.hand_count = hand;
            p.library_count = library;
            p.sideboard_count = sideboard;
        }
    }

    // === Reveals ===

    /// Set or clear a hand reveal, keeping the public mirror in sync.
    pub fn set_hand_reveal(&mut self, doc: &mut GameDoc, card_id: &CardId, grant: RevealGrant) {
        if grant.to_all {
            if let Some(card) = self.cards.get(card_id) {
                doc.meta
                    .hand_reveals_to_all
                    .insert(card_id.clone(), card.lite());
            }
        } else {
            doc.meta.hand_reveals_to_all.remove(card_id);
        }
        if grant.to_all || !grant.to_players.is_empty() {
            self.hand_reveals.insert(card_id.clone(), grant);
        } else {
            self.hand_reveals.remove(card_id);
        }
    }

    /// Set or clear a library reveal, then resync the owner's mirror.
    pub fn set_library_reveal(
        &mut self,
        doc: &mut GameDoc,
        owner: &PlayerId,
        card_id: &CardId,
        grant: RevealGrant,
    ) {
        if grant.to_all || !grant.to_players.is_empty() {
            self.library_reveals.insert(card_id.clone(), grant);
        } else {
            self.library_reveals.remove(card_id);
        }
        self.sync_library_reveals_to_all(doc, owner);
    }

    /// Set or clear a face-down battlefield reveal, mirroring `to_all`
    /// grants with the parked identity snapshot.
    pub fn set_face_down_reveal(
        &mut self,
        doc: &mut GameDoc,
        card_id: &CardId,
        grant: RevealGrant,
    ) {
        if grant.to_all {
            if let Some(identity) = self.face_down_battlefield.get(card_id) {
                doc.meta
                    .face_down_reveals_to_all
                    .insert(card_id.clone(), identity.clone());
            }
        } else {
            doc.meta.face_down_reveals_to_all.remove(card_id);
        }
        if grant.to_all || !grant.to_players.is_empty() {
            self.face_down_reveals.insert(card_id.clone(), grant);
        } else {
            self.face_down_reveals.remove(card_id);
        }
    }

    /// Drop every reveal grant and mirror entry for a card.
    pub fn clear_card_reveals(&mut self, doc: &mut GameDoc, card_id: &CardId) {
        self.hand_reveals.remove(card_id);
        self.library_reveals.remove(card_id);
        self.face_down_reveals.remove(card_id);
        doc.meta.hand_reveals_to_all.remove(card_id);
        doc.meta.library_reveals_to_all.remove(card_id);
        doc.meta.face_down_reveals_to_all.remove(card_id);
    }

    /// Recompute the public library-reveal mirror for one player.
    ///
    /// A library card is mirrored when it carries an explicit `to_all`
    /// grant, or when it is the top card and the owner's top-reveal mode
    /// is `all`. Stale entries for this player are removed.
    pub fn sync_library_reveals_to_all(&mut self, doc: &mut GameDoc, owner: &PlayerId) {
        let order = self.order(ZoneKind::Library, owner);

        let mut qualifying: Vec<CardId> = order
            .iter()
            .filter(|id| self.library_reveals.get(id).is_some_and(|g| g.to_all))
            .cloned()
            .collect();

        let top_reveal_all = doc
            .player(owner)
            .and_then(|p| p.library_top_reveal)
            .map_or(false, |mode| mode == LibraryTopReveal::All);
        if top_reveal_all {
            if let Some(top) = order.first() {
                if !qualifying.contains(top) {
                    qualifying.push(top.clone());
                }
            }
        }

        // Remove stale entries for cards this player owns.
        let stale: Vec<CardId> = doc
            .meta
            .library_reveals_to_all
            .iter()
            .filter(|(id, lite)| &lite.owner_id == owner && !qualifying.contains(id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            doc.meta.library_reveals_to_all.remove(&id);
        }

        for id in qualifying {
            if let Some(card) = self.cards.get(&id) {
                doc.meta.library_reveals_to_all.insert(id, card.lite());
            }
        }
    }

    /// Drop every record associated with a leaving player.
    pub fn remove_player(&mut self, doc: &mut GameDoc, player: &PlayerId) {
        let mut owned: Vec<CardId> = Vec::new();
        for map in [&self.hand_order, &self.library_order, &self.sideboard_order] {
            if let Some(order) = map.get(player) {
                owned.extend(order.iter().cloned());
            }
        }
        for id in owned {
            self.cards.remove(&id);
            self.clear_card_reveals(doc, &id);
        }
        self.hand_order.remove(player);
        self.library_order.remove(player);
        self.sideboard_order.remove(player);
        self.library_views.remove(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardFace, Player, RoomId, Zone, ZoneId};

    fn doc_with_player(id: &str) -> GameDoc {
        let mut doc = GameDoc::new(RoomId::new("r1"), 4);
        doc.add_player(Player::new(PlayerId::new(id), id.to_uppercase()));
        doc.add_zone(Zone::new(
            ZoneId::new(format!("library-{id}")),
            ZoneKind::Library,
            PlayerId::new(id),
        ));
        doc
    }

    fn hidden_card(id: &str, owner: &str, zone: &str) -> Card {
        Card::new(
            CardId::new(id),
            PlayerId::new(owner),
            ZoneId::new(zone),
            vec![CardFace::named(format!("Name of {id}"))],
        )
    }

    #[test]
    fn test_insert_and_order() {
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");

        hidden.insert_card(
            hidden_card("c1", "p1", "library-p1"),
            ZoneKind::Library,
            &p1,
            Placement::Top,
        );
        hidden.insert_card(
            hidden_card("c2", "p1", "library-p1"),
            ZoneKind::Library,
            &p1,
            Placement::Top,
        );
        hidden.insert_card(
            hidden_card("c3", "p1", "library-p1"),
            ZoneKind::Library,
            &p1,
            Placement::Bottom,
        );

        assert_eq!(
            hidden.order(ZoneKind::Library, &p1),
            &[CardId::new("c2"), CardId::new("c1"), CardId::new("c3")]
        );
    }

    #[test]
    fn test_insert_rejects_public_kind() {
        let mut hidden = HiddenState::new();
        let ok = hidden.insert_card(
            hidden_card("c1", "p1", "bf-p1"),
            ZoneKind::Battlefield,
            &PlayerId::new("p1"),
            Placement::Top,
        );
        assert!(!ok);
        assert!(!hidden.contains(&CardId::new("c1")));
    }

    #[test]
    fn test_take_card_scrubs_orders() {
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");
        hidden.insert_card(
            hidden_card("c1", "p1", "hand-p1"),
            ZoneKind::Hand,
            &p1,
            Placement::Top,
        );

        let taken = hidden.take_card(&CardId::new("c1"));
        assert!(taken.is_some());
        assert!(hidden.order(ZoneKind::Hand, &p1).is_empty());
        assert!(hidden.take_card(&CardId::new("c1")).is_none());
    }

    #[test]
    fn test_update_player_counts() {
        let mut doc = doc_with_player("p1");
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");

        for i in 0..3 {
            hidden.insert_card(
                hidden_card(&format!("c{i}"), "p1", "library-p1"),
                ZoneKind::Library,
                &p1,
                Placement::Top,
            );
        }
        hidden.insert_card(
            hidden_card("h1", "p1", "hand-p1"),
            ZoneKind::Hand,
            &p1,
            Placement::Top,
        );

        hidden.update_player_counts(&mut doc, &p1);

        let player = doc.player(&p1).unwrap();
        assert_eq!(player.library_count, 3);
        assert_eq!(player.hand_count, 1);
        assert_eq!(player.sideboard_count, 0);
    }

    #[test]
    fn test_build_grant_caps_and_excludes_owner() {
        let owner = PlayerId::new("p1");
        let targets: Vec<PlayerId> = (0..12).map(|i| PlayerId::new(format!("t{i}"))).collect();
        let mut with_owner = targets.clone();
        with_owner.insert(0, owner.clone());
        with_owner.insert(3, PlayerId::new("t0")); // duplicate

        let grant = RevealGrant::build(&owner, false, &with_owner);

        assert_eq!(grant.to_players.len(), MAX_REVEAL_TARGETS);
        assert!(!grant.to_players.iter().any(|p| p == &owner));
        assert!(grant.applies_to(&PlayerId::new("t0")));
        assert!(!grant.applies_to(&PlayerId::new("t11")));
    }

    #[test]
    fn test_hand_reveal_mirror() {
        let mut doc = doc_with_player("p1");
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");
        let c1 = CardId::new("c1");

        hidden.insert_card(
            hidden_card("c1", "p1", "hand-p1"),
            ZoneKind::Hand,
            &p1,
            Placement::Top,
        );

        hidden.set_hand_reveal(&mut doc, &c1, RevealGrant::build(&p1, true, &[]));
        assert!(doc.meta.hand_reveals_to_all.contains_key(&c1));

        hidden.set_hand_reveal(&mut doc, &c1, RevealGrant::build(&p1, false, &[]));
        assert!(!doc.meta.hand_reveals_to_all.contains_key(&c1));
        assert!(!hidden.hand_reveals.contains_key(&c1));
    }

    #[test]
    fn test_library_top_reveal_sync() {
        let mut doc = doc_with_player("p1");
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");

        for i in 0..3 {
            hidden.insert_card(
                hidden_card(&format!("c{i}"), "p1", "library-p1"),
                ZoneKind::Library,
                &p1,
                Placement::Bottom,
            );
        }

        doc.player_mut(&p1).unwrap().library_top_reveal = Some(LibraryTopReveal::All);
        hidden.sync_library_reveals_to_all(&mut doc, &p1);

        // Only the top card is mirrored.
        assert!(doc.meta.library_reveals_to_all.contains_key(&CardId::new("c0")));
        assert_eq!(doc.meta.library_reveals_to_all.len(), 1);

        // Top card changes: stale entry replaced.
        hidden
            .order_mut(ZoneKind::Library, &p1)
            .unwrap()
            .rotate_left(1);
        hidden.sync_library_reveals_to_all(&mut doc, &p1);
        assert!(!doc.meta.library_reveals_to_all.contains_key(&CardId::new("c0")));
        assert!(doc.meta.library_reveals_to_all.contains_key(&CardId::new("c1")));

        // Mode unset: mirror emptied.
        doc.player_mut(&p1).unwrap().library_top_reveal = None;
        hidden.sync_library_reveals_to_all(&mut doc, &p1);
        assert!(doc.meta.library_reveals_to_all.is_empty());
    }

    #[test]
    fn test_migrate_from_public() {
        let mut doc = doc_with_player("p1");
        let p1 = PlayerId::new("p1");

        // Legacy layout: library cards replicated publicly.
        for i in 0..3 {
            doc.insert_card(
                hidden_card(&format!("c{i}"), "p1", "library-p1"),
                crate::document::Placement::Bottom,
            );
        }
        assert_eq!(doc.card_count(), 3);

        let hidden = HiddenState::migrate_from_public(&mut doc);

        assert_eq!(doc.card_count(), 0);
        assert_eq!(hidden.order(ZoneKind::Library, &p1).len(), 3);
        assert_eq!(doc.player(&p1).unwrap().library_count, 3);
        assert!(doc
            .zone(&ZoneId::new("library-p1"))
            .unwrap()
            .card_ids
            .is_empty());
    }

    #[test]
    fn test_remove_player_clears_everything() {
        let mut doc = doc_with_player("p1");
        let mut hidden = HiddenState::new();
        let p1 = PlayerId::new("p1");
        let c1 = CardId::new("c1");

        hidden.insert_card(
            hidden_card("c1", "p1", "hand-p1"),
            ZoneKind::Hand,
            &p1,
            Placement::Top,
        );
        hidden.set_hand_reveal(&mut doc, &c1, RevealGrant::build(&p1, true, &[]));
        hidden.library_views.insert(p1.clone(), 3);

        hidden.remove_player(&mut doc, &p1);

        assert!(!hidden.contains(&c1));
        assert!(hidden.hand_order.get(&p1).is_none());
        assert!(hidden.library_views.get(&p1).is_none());
        assert!(doc.meta.hand_reveals_to_all.is_empty());
    }
}
