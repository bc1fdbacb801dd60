//! Per-viewer overlay reconstruction.
//!
//! The overlay is the only channel through which hidden information
//! crosses the trust boundary, so everything here is written in terms of
//! entitlement: a card appears in a viewer's overlay only when a rule
//! below grants it.
//!
//! - Hand cards: the owner, spectators, and matching reveal targets.
//! - Sideboard cards: the owner and spectators.
//! - Library cards: explicit reveal targets; the owner's active top-N
//!   view (never spectators); the top card under a top-reveal mode.
//! - Face-down battlefield identities: the controller, spectators, and
//!   matching reveal targets.

use serde::{Deserialize, Serialize};

use crate::core::{CardId, CardLite, LibraryTopReveal, PlayerId, ZoneId, ZoneKind};
use crate::document::GameDoc;
use crate::hidden::HiddenState;

/// How a connection views the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    Player,
    Spectator,
}

/// One viewer's identity for overlay purposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewer {
    pub id: Option<PlayerId>,
    pub role: ViewerRole,
}

impl Viewer {
    /// A seated player viewing as themselves.
    #[must_use]
    pub fn player(id: PlayerId) -> Self {
        Self {
            id: Some(id),
            role: ViewerRole::Player,
        }
    }

    /// A spectator with no player identity.
    #[must_use]
    pub fn spectator() -> Self {
        Self {
            id: None,
            role: ViewerRole::Spectator,
        }
    }

    #[must_use]
    fn is_spectator(&self) -> bool {
        self.role == ViewerRole::Spectator
    }

    #[must_use]
    fn is_player(&self, player: &PlayerId) -> bool {
        self.id.as_ref() == Some(player)
    }
}

/// The entitled slice of hidden state for one viewer, before diffing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayView {
    /// Entitled cards, deduplicated, sorted by id.
    pub cards: Vec<CardLite>,

    /// Zone order hints the viewer is entitled to, sorted by zone id.
    pub zone_orders: Vec<(ZoneId, Vec<CardId>)>,
}

/// Build the overlay view for one viewer.
#[must_use]
pub fn build_overlay(doc: &GameDoc, hidden: &HiddenState, viewer: &Viewer) -> OverlayView {
    let mut cards: Vec<CardLite> = Vec::new();
    let mut seen: Vec<CardId> = Vec::new();
    let mut zone_orders: Vec<(ZoneId, Vec<CardId>)> = Vec::new();

    let mut push = |cards: &mut Vec<CardLite>, seen: &mut Vec<CardId>, lite: CardLite| {
        if !seen.contains(&lite.id) {
            seen.push(lite.id.clone());
            cards.push(lite);
        }
    };

    for player in doc.players() {
        let owner = &player.id;

        // === Hand ===
        let hand_entitled = viewer.is_spectator() || viewer.is_player(owner);
        for card_id in hidden.order(ZoneKind::Hand, owner) {
            let granted = hidden
                .hand_reveals
                .get(card_id)
                .map(|g| {
                    g.to_all
                        || viewer
                            .id
                            .as_ref()
                            .is_some_and(|v| g.applies_to(v))
                })
                .unwrap_or(false);
            if hand_entitled || granted {
                if let Some(card) = hidden.cards.get(card_id) {
                    push(&mut cards, &mut seen, card.lite());
                }
            }
        }
        if hand_entitled {
            if let Some(zone) = doc.find_zone(owner, ZoneKind::Hand) {
                zone_orders.push((
                    zone.id.clone(),
                    hidden.order(ZoneKind::Hand, owner).to_vec(),
                ));
            }
        }

        // === Sideboard ===
        if viewer.is_spectator() || viewer.is_player(owner) {
            for card_id in hidden.order(ZoneKind::Sideboard, owner) {
                if let Some(card) = hidden.cards.get(card_id) {
                    push(&mut cards, &mut seen, card.lite());
                }
            }
            if let Some(zone) = doc.find_zone(owner, ZoneKind::Sideboard) {
                let order = hidden.order(ZoneKind::Sideboard, owner);
                if !order.is_empty() {
                    zone_orders.push((zone.id.clone(), order.to_vec()));
                }
            }
        }

        // === Library ===
        let order = hidden.order(ZoneKind::Library, owner);

        // Top-card reveal mode.
        if let Some(top) = order.first() {
            let top_entitled = match player.library_top_reveal {
                Some(LibraryTopReveal::All) => true,
                Some(LibraryTopReveal::OwnerOnly) => viewer.is_player(owner),
                None => false,
            };
            if top_entitled {
                if let Some(card) = hidden.cards.get(top) {
                    push(&mut cards, &mut seen, card.lite());
                }
            }
        }

        // The owner's explicit top-N view. Players only, never spectators.
        if viewer.is_player(owner) {
            if let Some(&n) = hidden.library_views.get(owner) {
                let slice = &order[..n.min(order.len())];
                for card_id in slice {
                    if let Some(card) = hidden.cards.get(card_id) {
                        push(&mut cards, &mut seen, card.lite());
                    }
                }
                if let Some(zone) = doc.find_zone(owner, ZoneKind::Library) {
                    zone_orders.push((zone.id.clone(), slice.to_vec()));
                }
            }
        }

        // Explicit per-card library reveals.
        for card_id in order {
            let granted = hidden
                .library_reveals
                .get(card_id)
                .map(|g| {
                    g.to_all
                        || viewer
                            .id
                            .as_ref()
                            .is_some_and(|v| g.applies_to(v))
                })
                .unwrap_or(false);
            if granted {
                if let Some(card) = hidden.cards.get(card_id) {
                    push(&mut cards, &mut seen, card.lite());
                }
            }
        }
    }

    // === Face-down battlefield identities ===
    for (card_id, identity) in &hidden.face_down_battlefield {
        let controller = doc.card(card_id).map(|c| c.controller_id.clone());
        let entitled = viewer.is_spectator()
            || controller
                .as_ref()
                .is_some_and(|c| viewer.is_player(c))
            || hidden
                .face_down_reveals
                .get(card_id)
                .map(|g| {
                    g.to_all
                        || viewer
                            .id
                            .as_ref()
                            .is_some_and(|v| g.applies_to(v))
                })
                .unwrap_or(false);
        if entitled {
            push(&mut cards, &mut seen, identity.clone());
        }
    }

    cards.sort_by(|a, b| a.id.cmp(&b.id));
    zone_orders.sort_by(|a, b| a.0.cmp(&b.0));
    zone_orders.dedup_by(|a, b| a.0 == b.0);

    OverlayView { cards, zone_orders }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardFace, Player, RoomId, Zone};
    use crate::document::Placement;
    use crate::hidden::RevealGrant;

    fn setup() -> (GameDoc, HiddenState) {
        let mut doc = GameDoc::new(RoomId::new("r1"), 4);
        for pid in ["p1", "p2"] {
            doc.add_player(Player::new(PlayerId::new(pid), pid.to_uppercase()));
            for kind in ZoneKind::all() {
                doc.add_zone(Zone::new(
                    ZoneId::new(format!("{kind}-{pid}")),
                    kind,
                    PlayerId::new(pid),
                ));
            }
        }
        (doc, HiddenState::new())
    }

    fn stash(hidden: &mut HiddenState, id: &str, owner: &str, kind: ZoneKind) {
        let card = Card::new(
            CardId::new(id),
            PlayerId::new(owner),
            ZoneId::new(format!("{kind}-{owner}")),
            vec![CardFace::named(format!("Name {id}"))],
        );
        hidden.insert_card(card, kind, &PlayerId::new(owner), Placement::Bottom);
    }

    fn card_ids(view: &OverlayView) -> Vec<&str> {
        view.cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_owner_sees_own_hand_and_order() {
        let (doc, mut hidden) = setup();
        stash(&mut hidden, "h1", "p1", ZoneKind::Hand);
        stash(&mut hidden, "h2", "p1", ZoneKind::Hand);

        let view = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p1")));
        assert_eq!(card_ids(&view), vec!["h1", "h2"]);
        assert_eq!(
            view.zone_orders,
            vec![(
                ZoneId::new("hand-p1"),
                vec![CardId::new("h1"), CardId::new("h2")]
            )]
        );
    }

    #[test]
    fn test_non_owner_sees_nothing_without_reveal() {
        let (doc, mut hidden) = setup();
        stash(&mut hidden, "h1", "p1", ZoneKind::Hand);
        stash(&mut hidden, "l1", "p1", ZoneKind::Library);

        let view = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert!(view.cards.is_empty());
        assert!(view.zone_orders.iter().all(|(z, _)| z != &ZoneId::new("hand-p1")));
    }

    #[test]
    fn test_spectator_sees_hands_but_not_library() {
        let (doc, mut hidden) = setup();
        stash(&mut hidden, "h1", "p1", ZoneKind::Hand);
        stash(&mut hidden, "h2", "p2", ZoneKind::Hand);
        stash(&mut hidden, "l1", "p1", ZoneKind::Library);

        let view = build_overlay(&doc, &hidden, &Viewer::spectator());
        assert_eq!(card_ids(&view), vec!["h1", "h2"]);
    }

    #[test]
    fn test_hand_reveal_targets() {
        let (mut doc, mut hidden) = setup();
        stash(&mut hidden, "h1", "p1", ZoneKind::Hand);
        let grant = RevealGrant::build(&PlayerId::new("p1"), false, &[PlayerId::new("p2")]);
        hidden.set_hand_reveal(&mut doc, &CardId::new("h1"), grant);

        let p2 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert_eq!(card_ids(&p2), vec!["h1"]);

        // An unnamed player still sees nothing.
        doc.add_player(Player::new(PlayerId::new("p3"), "P3"));
        let p3 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p3")));
        assert!(p3.cards.is_empty());
    }

    #[test]
    fn test_library_view_owner_only() {
        let (doc, mut hidden) = setup();
        for i in 0..5 {
            stash(&mut hidden, &format!("l{i}"), "p1", ZoneKind::Library);
        }
        hidden.library_views.insert(PlayerId::new("p1"), 3);

        let owner = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p1")));
        assert_eq!(card_ids(&owner), vec!["l0", "l1", "l2"]);
        assert!(owner
            .zone_orders
            .iter()
            .any(|(z, order)| z == &ZoneId::new("library-p1") && order.len() == 3));

        // Spectators never get library views.
        let spectator = build_overlay(&doc, &hidden, &Viewer::spectator());
        assert!(spectator.cards.is_empty());
    }

    #[test]
    fn test_library_top_reveal_modes() {
        let (mut doc, mut hidden) = setup();
        stash(&mut hidden, "l0", "p1", ZoneKind::Library);
        stash(&mut hidden, "l1", "p1", ZoneKind::Library);

        doc.player_mut(&PlayerId::new("p1")).unwrap().library_top_reveal =
            Some(LibraryTopReveal::All);
        let p2 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert_eq!(card_ids(&p2), vec!["l0"]);

        doc.player_mut(&PlayerId::new("p1")).unwrap().library_top_reveal =
            Some(LibraryTopReveal::OwnerOnly);
        let p2 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert!(p2.cards.is_empty());
        let p1 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p1")));
        assert_eq!(card_ids(&p1), vec!["l0"]);
    }

    #[test]
    fn test_face_down_identity_controller_and_reveal() {
        let (mut doc, mut hidden) = setup();
        let mut card = Card::new(
            CardId::new("fd1"),
            PlayerId::new("p1"),
            ZoneId::new("battlefield-p1"),
            vec![CardFace::named("Secret Creature")],
        );
        card.face_down = true;
        let identity = crate::transforms::strip_identity(&mut card);
        hidden
            .face_down_battlefield
            .insert(CardId::new("fd1"), identity);
        doc.insert_card(card, Placement::Top);

        let p1 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p1")));
        assert_eq!(card_ids(&p1), vec!["fd1"]);
        assert_eq!(p1.cards[0].name(), "Secret Creature");

        let p2 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert!(p2.cards.is_empty());

        let spectator = build_overlay(&doc, &hidden, &Viewer::spectator());
        assert_eq!(card_ids(&spectator), vec!["fd1"]);

        hidden.set_face_down_reveal(
            &mut doc,
            &CardId::new("fd1"),
            RevealGrant::build(&PlayerId::new("p1"), false, &[PlayerId::new("p2")]),
        );
        let p2 = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p2")));
        assert_eq!(card_ids(&p2), vec!["fd1"]);
    }

    #[test]
    fn test_dedup_when_multiple_rules_match() {
        let (mut doc, mut hidden) = setup();
        stash(&mut hidden, "h1", "p1", ZoneKind::Hand);
        hidden.set_hand_reveal(
            &mut doc,
            &CardId::new("h1"),
            RevealGrant::build(&PlayerId::new("p1"), true, &[]),
        );

        // Owner is entitled both directly and through the reveal.
        let view = build_overlay(&doc, &hidden, &Viewer::player(PlayerId::new("p1")));
        assert_eq!(view.cards.len(), 1);
    }
}
