//! The card-movement state machine.
//!
//! Resolves one card's transition between any two zones, mutating both
//! the public document and the hidden partition and returning the derived
//! log events. Permission is the caller's responsibility; failures here
//! are structural only (missing zone, missing card, partition mismatch).
//!
//! Every transition is one of four category pairs (hidden→hidden,
//! hidden→public, public→hidden, public→public) sharing three
//! precomputed sub-decisions:
//!
//! 1. **Controller** — entering a battlefield hands control to that
//!    battlefield's owner (unchanged between battlefields with the same
//!    owner); leaving a battlefield for anywhere else resets control to
//!    the card's owner.
//! 2. **Face-down** — an explicit request wins; otherwise face-down
//!    persists only battlefield→battlefield and clears on every other
//!    transition.
//! 3. **Reveal patch** — entering a library or entering a battlefield
//!    face down clears public-knowledge flags; entering any other public
//!    zone sets `known_to_all`; entering a hidden zone clears flags and
//!    leaves the card to explicit re-reveal.
//!
//! Tokens never leave a battlefield alive: any transition to a
//! non-battlefield zone deletes them instead of moving them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    Card, CardId, FaceDownMode, LogEvent, PlayerId, Position, ZoneId, ZoneKind, REDACTED_CARD_NAME,
};
use crate::document::{GameDoc, Placement};
use crate::hidden::HiddenState;
use crate::{position, transforms};

/// Structural failure while resolving a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("zone not found")]
    ZoneNotFound,

    #[error("card not found")]
    CardNotFound,

    #[error("invalid move")]
    InvalidMove,
}

/// Marks a move as a semantic draw or discard.
///
/// The batch draw/discard handlers invoke the machine once per card with
/// this set; the generic `card.move` log line is suppressed in favor of
/// the derived event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSemantic {
    Draw,
    Discard,
}

/// One requested card move.
#[derive(Clone, Debug)]
pub struct MoveRequest {
    pub actor: PlayerId,
    pub card_id: CardId,
    pub to_zone: ZoneId,
    pub position: Option<Position>,
    pub placement: Placement,
    pub face_down: Option<bool>,
    pub semantic: Option<MoveSemantic>,
}

impl MoveRequest {
    /// A plain move to the top of the destination.
    #[must_use]
    pub fn new(actor: PlayerId, card_id: CardId, to_zone: ZoneId) -> Self {
        Self {
            actor,
            card_id,
            to_zone,
            position: None,
            placement: Placement::Top,
            face_down: None,
            semantic: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn face_down(mut self, face_down: bool) -> Self {
        self.face_down = Some(face_down);
        self
    }

    #[must_use]
    pub fn semantic(mut self, semantic: MoveSemantic) -> Self {
        self.semantic = Some(semantic);
        self
    }
}

/// The result of a resolved move.
#[derive(Clone, Debug, Default)]
pub struct MoveOutcome {
    pub events: Vec<LogEvent>,

    /// The hidden partition changed; overlays must rebuild and hidden
    /// state must re-persist.
    pub hidden_changed: bool,

    /// The card was a token leaving the battlefield and was deleted.
    pub card_deleted: bool,
}

/// Resolve one card move.
pub fn move_card(
    doc: &mut GameDoc,
    hidden: &mut HiddenState,
    req: &MoveRequest,
) -> Result<MoveOutcome, MoveError> {
    let to_zone = doc.zone(&req.to_zone).ok_or(MoveError::ZoneNotFound)?.clone();

    // Locate the card in exactly one partition.
    let (from_zone_id, in_hidden) = if let Some(card) = doc.card(&req.card_id) {
        (card.zone_id.clone(), false)
    } else if let Some(card) = hidden.cards.get(&req.card_id) {
        (card.zone_id.clone(), true)
    } else {
        return Err(MoveError::CardNotFound);
    };
    let from_zone = doc.zone(&from_zone_id).ok_or(MoveError::ZoneNotFound)?.clone();
    if from_zone.is_hidden() != in_hidden {
        return Err(MoveError::InvalidMove);
    }

    let from_bf = from_zone.kind.is_battlefield();
    let to_bf = to_zone.kind.is_battlefield();
    let to_hidden_zone = to_zone.is_hidden();

    // Sub-decision: face-down.
    let currently_face_down = current_card(doc, hidden, &req.card_id, in_hidden)
        .map(|c| c.face_down)
        .unwrap_or(false);
    let face_down = match req.face_down {
        Some(explicit) => explicit && to_bf,
        None => currently_face_down && from_bf && to_bf,
    };
    let was_face_down_bf = currently_face_down && from_bf && !in_hidden;
    let keeps_face_down_identity = was_face_down_bf && face_down;

    let mut outcome = MoveOutcome::default();

    // --- Pull the card out of its origin ---
    let mut card = if in_hidden {
        let card = hidden.take_card(&req.card_id).ok_or(MoveError::CardNotFound)?;
        hidden.clear_card_reveals(doc, &req.card_id);
        hidden.update_player_counts(doc, &from_zone.owner_id);
        if from_zone.kind == ZoneKind::Library {
            hidden.sync_library_reveals_to_all(doc, &from_zone.owner_id);
        }
        outcome.hidden_changed = true;
        card
    } else {
        let mut card = doc.take_card(&req.card_id).ok_or(MoveError::CardNotFound)?;
        if was_face_down_bf && !keeps_face_down_identity {
            if let Some(identity) = hidden.face_down_battlefield.remove(&req.card_id) {
                transforms::restore_identity(&mut card, &identity);
            }
            hidden.clear_card_reveals(doc, &req.card_id);
            outcome.hidden_changed = true;
        }
        card
    };

    // Name for the log line, after any identity restore. Cards still
    // holding a parked face-down identity log redacted regardless.
    let visible_name = if keeps_face_down_identity {
        REDACTED_CARD_NAME.to_string()
    } else {
        card.name().to_string()
    };

    // Sub-decision: controller.
    card.controller_id = if to_bf {
        if from_bf && from_zone.owner_id == to_zone.owner_id {
            card.controller_id.clone()
        } else {
            to_zone.owner_id.clone()
        }
    } else {
        card.owner_id.clone()
    };

    // Leaving a battlefield resets presentation state.
    if from_bf && !to_bf {
        transforms::reset_to_front(&mut card);
        transforms::clear_battlefield_state(&mut card);
    }

    let force_hidden = to_hidden_zone || (to_bf && face_down);
    push_move_event(&mut outcome, req, &from_zone, &to_zone, &visible_name, force_hidden);

    // Tokens are deleted rather than moved off a battlefield.
    if card.is_token && from_bf && !to_bf {
        outcome.card_deleted = true;
        return Ok(outcome);
    }

    // Sub-decision: reveal patch.
    if force_hidden || to_zone.kind == ZoneKind::Library {
        card.clear_reveals();
    } else {
        card.known_to_all = true;
    }

    card.zone_id = to_zone.id.clone();

    // --- Insert into the destination ---
    if to_hidden_zone {
        card.face_down = false;
        card.face_down_mode = None;
        hidden.insert_card(card, to_zone.kind, &to_zone.owner_id, req.placement);
        hidden.update_player_counts(doc, &to_zone.owner_id);
        if to_zone.kind == ZoneKind::Library {
            hidden.sync_library_reveals_to_all(doc, &to_zone.owner_id);
        }
        outcome.hidden_changed = true;
    } else {
        if to_bf {
            let desired = req.position.or(card.position).unwrap_or(position::DEFAULT_DROP);
            let occupied = doc.occupied_positions(&to_zone.id, Some(&req.card_id));
            card.position = Some(position::resolve(desired, &occupied));

            if face_down {
                card.face_down = true;
                if card.face_down_mode.is_none() {
                    card.face_down_mode = Some(FaceDownMode::Manual);
                }
                if !hidden.face_down_battlefield.contains_key(&req.card_id) {
                    let identity = transforms::strip_identity(&mut card);
                    hidden.face_down_battlefield.insert(req.card_id.clone(), identity);
                    outcome.hidden_changed = true;
                }
            } else {
                card.face_down = false;
                card.face_down_mode = None;
            }
        } else {
            card.face_down = false;
            card.face_down_mode = None;
            card.position = None;
        }
        doc.insert_card(card, req.placement);
    }

    Ok(outcome)
}

fn current_card<'a>(
    doc: &'a GameDoc,
    hidden: &'a HiddenState,
    id: &CardId,
    in_hidden: bool,
) -> Option<&'a Card> {
    if in_hidden {
        hidden.cards.get(id)
    } else {
        doc.card(id)
    }
}

fn push_move_event(
    outcome: &mut MoveOutcome,
    req: &MoveRequest,
    from: &crate::core::Zone,
    to: &crate::core::Zone,
    visible_name: &str,
    force_hidden: bool,
) {
    match req.semantic {
        Some(MoveSemantic::Draw) => {
            outcome.events.push(LogEvent::card_draw(&req.actor, 1));
        }
        Some(MoveSemantic::Discard) => {
            outcome
                .events
                .push(LogEvent::card_discard(&req.actor, visible_name));
        }
        None => {
            let name = if force_hidden {
                REDACTED_CARD_NAME
            } else {
                visible_name
            };
            outcome.events.push(LogEvent::card_move(
                &req.actor,
                &req.card_id,
                name,
                (&from.id, from.kind),
                (&to.id, to.kind),
                force_hidden,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardFace, Player, RoomId, Zone};

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

    fn battlefield_card(doc: &mut GameDoc, id: &str, owner: &str) -> CardId {
        let card = Card::new(
            CardId::new(id),
            PlayerId::new(owner),
            ZoneId::new(format!("battlefield-{owner}")),
            vec![CardFace::named(format!("Name {id}"))],
        );
        doc.insert_card(card, Placement::Top);
        CardId::new(id)
    }

    fn hand_card(hidden: &mut HiddenState, id: &str, owner: &str) -> CardId {
        let card = Card::new(
            CardId::new(id),
            PlayerId::new(owner),
            ZoneId::new(format!("hand-{owner}")),
            vec![CardFace::named(format!("Name {id}"))],
        );
        hidden.insert_card(card, ZoneKind::Hand, &PlayerId::new(owner), Placement::Bottom);
        CardId::new(id)
    }

    #[test]
    fn test_battlefield_to_hand_hides_identity() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "c1", "p1");

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(PlayerId::new("p1"), c1.clone(), ZoneId::new("hand-p1")),
        )
        .unwrap();

        assert!(outcome.hidden_changed);
        assert!(doc.card(&c1).is_none());
        assert_eq!(
            hidden.order(ZoneKind::Hand, &PlayerId::new("p1")),
            &[c1.clone()]
        );

        let event = &outcome.events[0];
        assert_eq!(event.kind, "card.move");
        assert_eq!(event.payload["cardName"], "a card");
        assert_eq!(event.payload["forceHidden"], true);

        assert_eq!(doc.player(&PlayerId::new("p1")).unwrap().hand_count, 1);
    }

    #[test]
    fn test_hand_to_battlefield_becomes_known() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p1"),
            ),
        )
        .unwrap();

        assert!(outcome.hidden_changed);
        let card = doc.card(&c1).unwrap();
        assert!(card.known_to_all);
        assert!(card.position.is_some());
        assert!(!hidden.contains(&c1));

        // Played face up: full name in the log.
        assert_eq!(outcome.events[0].payload["cardName"], "Name c1");
        assert_eq!(outcome.events[0].payload["forceHidden"], false);
    }

    #[test]
    fn test_face_down_entry_strips_identity() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p1"),
            )
            .face_down(true),
        )
        .unwrap();

        let card = doc.card(&c1).unwrap();
        assert!(card.face_down);
        assert_eq!(card.name(), "");
        assert!(!card.known_to_all);

        let identity = hidden.face_down_battlefield.get(&c1).unwrap();
        assert_eq!(identity.name(), "Name c1");

        assert_eq!(outcome.events[0].payload["cardName"], "a card");
    }

    #[test]
    fn test_face_down_leaves_battlefield_restores_identity() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");
        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p1"),
            )
            .face_down(true),
        )
        .unwrap();

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("graveyard-p1"),
            ),
        )
        .unwrap();

        let card = doc.card(&c1).unwrap();
        assert!(!card.face_down);
        assert_eq!(card.name(), "Name c1");
        assert!(card.known_to_all);
        assert!(hidden.face_down_battlefield.get(&c1).is_none());

        // Face was up by the time it hit the graveyard.
        assert_eq!(outcome.events[0].payload["cardName"], "Name c1");
    }

    #[test]
    fn test_face_down_persists_between_battlefields() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");
        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p1"),
            )
            .face_down(true),
        )
        .unwrap();

        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p2"),
            ),
        )
        .unwrap();

        let card = doc.card(&c1).unwrap();
        assert!(card.face_down);
        assert_eq!(card.name(), "");
        // Identity still parked for the eventual flip.
        assert!(hidden.face_down_battlefield.get(&c1).is_some());
        // Crossing to another battlefield hands over control.
        assert_eq!(card.controller_id, PlayerId::new("p2"));
    }

    #[test]
    fn test_controller_resets_when_leaving_battlefield() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "c1", "p1");

        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p2"),
            ),
        )
        .unwrap();
        assert_eq!(doc.card(&c1).unwrap().controller_id, PlayerId::new("p2"));

        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("graveyard-p1"),
            ),
        )
        .unwrap();
        assert_eq!(doc.card(&c1).unwrap().controller_id, PlayerId::new("p1"));
    }

    #[test]
    fn test_token_leaving_battlefield_is_deleted() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "t1", "p1");
        doc.card_mut(&c1).unwrap().is_token = true;

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("graveyard-p1"),
            ),
        )
        .unwrap();

        assert!(outcome.card_deleted);
        assert!(doc.card(&c1).is_none());
        assert!(!hidden.contains(&c1));
        assert!(doc
            .zone(&ZoneId::new("graveyard-p1"))
            .unwrap()
            .card_ids
            .is_empty());
    }

    #[test]
    fn test_token_survives_battlefield_to_battlefield() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "t1", "p1");
        doc.card_mut(&c1).unwrap().is_token = true;

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("battlefield-p2"),
            ),
        )
        .unwrap();

        assert!(!outcome.card_deleted);
        assert!(doc.card(&c1).is_some());
    }

    #[test]
    fn test_library_entry_clears_reveals() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "c1", "p1");
        {
            let card = doc.card_mut(&c1).unwrap();
            card.known_to_all = true;
            card.revealed_to_all = true;
        }

        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c1.clone(),
                ZoneId::new("library-p1"),
            )
            .placed(Placement::Bottom),
        )
        .unwrap();

        let card = hidden.cards.get(&c1).unwrap();
        assert!(!card.known_to_all);
        assert!(!card.revealed_to_all);
        assert_eq!(
            hidden.order(ZoneKind::Library, &PlayerId::new("p1")),
            &[c1.clone()]
        );
    }

    #[test]
    fn test_draw_semantic_suppresses_move_event() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");
        // Stash it in the library first.
        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(PlayerId::new("p1"), c1.clone(), ZoneId::new("library-p1")),
        )
        .unwrap();

        let outcome = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(PlayerId::new("p1"), c1.clone(), ZoneId::new("hand-p1"))
                .placed(Placement::Bottom)
                .semantic(MoveSemantic::Draw),
        )
        .unwrap();

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, "card.draw");
    }

    #[test]
    fn test_collision_bumps_on_battlefield_entry() {
        let (mut doc, mut hidden) = setup();
        let c1 = battlefield_card(&mut doc, "c1", "p1");
        doc.card_mut(&c1).unwrap().position = Some(Position::new(0.5, 0.5));

        let c2 = hand_card(&mut hidden, "c2", "p1");
        move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                c2.clone(),
                ZoneId::new("battlefield-p1"),
            )
            .at(Position::new(0.5, 0.5)),
        )
        .unwrap();

        let placed = doc.card(&c2).unwrap().position.unwrap();
        assert_ne!(placed, Position::new(0.5, 0.5));
    }

    #[test]
    fn test_missing_card_and_zone_errors() {
        let (mut doc, mut hidden) = setup();

        let err = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(
                PlayerId::new("p1"),
                CardId::new("ghost"),
                ZoneId::new("hand-p1"),
            ),
        )
        .unwrap_err();
        assert_eq!(err, MoveError::CardNotFound);

        let c1 = battlefield_card(&mut doc, "c1", "p1");
        let err = move_card(
            &mut doc,
            &mut hidden,
            &MoveRequest::new(PlayerId::new("p1"), c1, ZoneId::new("nowhere")),
        )
        .unwrap_err();
        assert_eq!(err, MoveError::ZoneNotFound);
    }

    #[test]
    fn test_partition_invariant_held() {
        let (mut doc, mut hidden) = setup();
        let c1 = hand_card(&mut hidden, "c1", "p1");

        for zone in [
            "battlefield-p1",
            "graveyard-p1",
            "exile-p1",
            "library-p1",
            "hand-p1",
            "commander-p1",
        ] {
            move_card(
                &mut doc,
                &mut hidden,
                &MoveRequest::new(PlayerId::new("p1"), c1.clone(), ZoneId::new(zone)),
            )
            .unwrap();

            let public = doc.card(&c1).is_some();
            let private = hidden.contains(&c1);
            assert!(public ^ private, "card must live in exactly one partition");
        }
    }
}
