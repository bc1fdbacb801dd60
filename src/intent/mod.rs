//! The intent pipeline: validate, authorize, dispatch, apply atomically.
//!
//! One intent is one atomic unit: either every mutation it implies lands,
//! or none do. The document rolls back through its transaction snapshot
//! and the hidden partition through a checkpoint taken on entry, so a
//! rejected intent is externally invisible.
//!
//! Dispatch is an exhaustive match over the sealed [`IntentKind`]
//! registry; every handler re-checks permission through [`crate::perms`]
//! before mutating.

mod handlers;
mod types;

pub use types::*;

use crate::core::{GameRng, PlayerId};
use crate::document::GameDoc;
use crate::hidden::HiddenState;

const LOG_TARGET: &str = "cardroom::intent";

/// Apply one intent to the room state.
///
/// Returns the log events to broadcast and whether hidden state changed
/// (signalling the caller to rebuild overlays and re-persist).
pub fn apply(
    doc: &mut GameDoc,
    hidden: &mut HiddenState,
    rng: &mut GameRng,
    intent: &Intent,
) -> Result<ApplyOutcome, IntentError> {
    let actor = validate_actor(intent)?;

    tracing::debug!(
        target: LOG_TARGET,
        intent_id = %intent.id,
        intent_type = intent.kind.type_name(),
        actor = %actor,
        "applying intent"
    );

    let hidden_checkpoint = hidden.clone();
    let result = doc.transact(|doc| {
        let mut ctx = handlers::Ctx {
            doc,
            hidden,
            rng,
            events: Vec::new(),
            hidden_changed: false,
        };
        handlers::dispatch(&mut ctx, &actor, &intent.kind)?;
        Ok(ApplyOutcome {
            log_events: ctx.events,
            hidden_changed: ctx.hidden_changed,
        })
    });

    match &result {
        Ok(outcome) => {
            tracing::debug!(
                target: LOG_TARGET,
                intent_id = %intent.id,
                events = outcome.log_events.len(),
                hidden_changed = outcome.hidden_changed,
                "intent applied"
            );
        }
        Err(err) => {
            *hidden = hidden_checkpoint;
            tracing::debug!(
                target: LOG_TARGET,
                intent_id = %intent.id,
                error = %err,
                "intent rejected"
            );
        }
    }
    result
}

fn validate_actor(intent: &Intent) -> Result<PlayerId, IntentError> {
    match &intent.actor {
        Some(actor) if !actor.is_empty() => Ok(actor.clone()),
        _ => Err(IntentError::MissingActor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardFace, CardId, RoomId, ZoneId, ZoneKind};
    use crate::document::Placement;

    fn room() -> (GameDoc, HiddenState, GameRng) {
        (
            GameDoc::new(RoomId::new("r1"), 4),
            HiddenState::new(),
            GameRng::new(7),
        )
    }

    fn join(doc: &mut GameDoc, hidden: &mut HiddenState, rng: &mut GameRng, id: &str) {
        let intent = Intent::new(
            format!("join-{id}"),
            PlayerId::new(id),
            IntentKind::PlayerJoin(PlayerJoin {
                player_id: PlayerId::new(id),
                name: id.to_uppercase(),
                life: None,
            }),
        );
        apply(doc, hidden, rng, &intent).unwrap();
    }

    fn library_card(id: &str, owner: &str) -> Card {
        Card::new(
            CardId::new(id),
            PlayerId::new(owner),
            ZoneId::new(format!("library-{owner}")),
            vec![CardFace::named(format!("Name {id}"))],
        )
    }

    #[test]
    fn test_missing_actor_rejected_before_mutation() {
        let (mut doc, mut hidden, mut rng) = room();
        let intent = Intent {
            id: "i1".into(),
            actor: None,
            kind: IntentKind::PlayerJoin(PlayerJoin {
                player_id: PlayerId::new("p1"),
                name: "Alice".into(),
                life: None,
            }),
        };

        let err = apply(&mut doc, &mut hidden, &mut rng, &intent).unwrap_err();
        assert_eq!(err, IntentError::MissingActor);
        assert_eq!(doc.player_count(), 0);
    }

    #[test]
    fn test_first_joiner_becomes_host() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");
        join(&mut doc, &mut hidden, &mut rng, "p2");

        assert_eq!(doc.meta.host_id, Some(PlayerId::new("p1")));
        assert_eq!(doc.player_count(), 2);
        // Each joiner received a full zone set.
        assert_eq!(doc.zones().count(), 14);
    }

    #[test]
    fn test_join_rejected_when_locked_or_full() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");

        // Host locks the room.
        let lock = Intent::new(
            "lock",
            PlayerId::new("p1"),
            IntentKind::RoomLock(RoomLock { locked: true }),
        );
        apply(&mut doc, &mut hidden, &mut rng, &lock).unwrap();

        let intent = Intent::new(
            "join-p2",
            PlayerId::new("p2"),
            IntentKind::PlayerJoin(PlayerJoin {
                player_id: PlayerId::new("p2"),
                name: "Bob".into(),
                life: None,
            }),
        );
        let err = apply(&mut doc, &mut hidden, &mut rng, &intent).unwrap_err();
        assert_eq!(err, IntentError::RoomLocked);

        // Unlock, fill the room, then overflow.
        let unlock = Intent::new(
            "unlock",
            PlayerId::new("p1"),
            IntentKind::RoomLock(RoomLock { locked: false }),
        );
        apply(&mut doc, &mut hidden, &mut rng, &unlock).unwrap();
        for id in ["p2", "p3", "p4"] {
            join(&mut doc, &mut hidden, &mut rng, id);
        }
        let intent = Intent::new(
            "join-p5",
            PlayerId::new("p5"),
            IntentKind::PlayerJoin(PlayerJoin {
                player_id: PlayerId::new("p5"),
                name: "Eve".into(),
                life: None,
            }),
        );
        let err = apply(&mut doc, &mut hidden, &mut rng, &intent).unwrap_err();
        assert_eq!(err, IntentError::RoomFull);
    }

    #[test]
    fn test_actor_mismatch_distinct_from_permission() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");
        join(&mut doc, &mut hidden, &mut rng, "p2");

        // p2 drawing for p1 is an actor mismatch.
        let draw = Intent::new(
            "draw",
            PlayerId::new("p2"),
            IntentKind::LibraryDraw(LibraryDraw {
                player_id: PlayerId::new("p1"),
                count: None,
            }),
        );
        let err = apply(&mut doc, &mut hidden, &mut rng, &draw).unwrap_err();
        assert_eq!(err.to_string(), "actor mismatch");

        // p2 changing p1's life is a permission denial.
        let update = Intent::new(
            "life",
            PlayerId::new("p2"),
            IntentKind::PlayerUpdate(PlayerUpdate {
                life: Some(10),
                ..PlayerUpdate::for_player(PlayerId::new("p1"))
            }),
        );
        let err = apply(&mut doc, &mut hidden, &mut rng, &update).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot change another player's life total"
        );
    }

    #[test]
    fn test_foreign_hand_add_rejected_with_contract_reason() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");
        join(&mut doc, &mut hidden, &mut rng, "p2");

        let card = Card::new(
            CardId::new("c1"),
            PlayerId::new("p2"),
            ZoneId::new("hand-p1"),
            vec![CardFace::named("Sneaky Insert")],
        );
        let intent = Intent::new(
            "add",
            PlayerId::new("p2"),
            IntentKind::CardAdd(CardAdd {
                card,
                position: None,
                placement: Placement::Top,
            }),
        );

        let err = apply(&mut doc, &mut hidden, &mut rng, &intent).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot place into a hidden zone you do not own"
        );
        assert!(!hidden.contains(&CardId::new("c1")));
    }

    #[test]
    fn test_deck_load_draw_and_counts() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");

        let cards: Vec<Card> = (0..10).map(|i| library_card(&format!("c{i}"), "p1")).collect();
        let load = Intent::new(
            "load",
            PlayerId::new("p1"),
            IntentKind::DeckLoad(DeckLoad {
                player_id: PlayerId::new("p1"),
                cards,
            }),
        );
        let outcome = apply(&mut doc, &mut hidden, &mut rng, &load).unwrap();
        assert!(outcome.hidden_changed);
        assert_eq!(doc.player(&PlayerId::new("p1")).unwrap().library_count, 10);

        let draw = Intent::new(
            "draw",
            PlayerId::new("p1"),
            IntentKind::LibraryDraw(LibraryDraw {
                player_id: PlayerId::new("p1"),
                count: Some(3),
            }),
        );
        let outcome = apply(&mut doc, &mut hidden, &mut rng, &draw).unwrap();
        assert!(outcome.hidden_changed);
        assert_eq!(outcome.log_events.len(), 3);
        assert!(outcome.log_events.iter().all(|e| e.kind == "card.draw"));

        let player = doc.player(&PlayerId::new("p1")).unwrap();
        assert_eq!(player.hand_count, 3);
        assert_eq!(player.library_count, 7);

        // Order authority: counts always equal order lengths.
        assert_eq!(
            hidden.order(ZoneKind::Hand, &PlayerId::new("p1")).len(),
            3
        );
        assert_eq!(
            hidden.order(ZoneKind::Library, &PlayerId::new("p1")).len(),
            7
        );
    }

    #[test]
    fn test_rejected_intent_leaves_no_partial_mutation() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");
        join(&mut doc, &mut hidden, &mut rng, "p2");

        let cards: Vec<Card> = (0..3).map(|i| library_card(&format!("c{i}"), "p1")).collect();
        apply(
            &mut doc,
            &mut hidden,
            &mut rng,
            &Intent::new(
                "load",
                PlayerId::new("p1"),
                IntentKind::DeckLoad(DeckLoad {
                    player_id: PlayerId::new("p1"),
                    cards,
                }),
            ),
        )
        .unwrap();
        apply(
            &mut doc,
            &mut hidden,
            &mut rng,
            &Intent::new(
                "draw",
                PlayerId::new("p1"),
                IntentKind::LibraryDraw(LibraryDraw {
                    player_id: PlayerId::new("p1"),
                    count: Some(1),
                }),
            ),
        )
        .unwrap();

        let hidden_before = hidden.clone();
        let doc_before = doc.clone();

        // Discard batch naming a card not in hand: rejected whole.
        let discard = Intent::new(
            "discard",
            PlayerId::new("p1"),
            IntentKind::LibraryDiscard(LibraryDiscard {
                player_id: PlayerId::new("p1"),
                card_ids: vec![CardId::new("c2"), CardId::new("ghost")],
            }),
        );
        let err = apply(&mut doc, &mut hidden, &mut rng, &discard).unwrap_err();
        assert!(matches!(err, IntentError::CardNotFound(_)));

        assert_eq!(hidden, hidden_before);
        assert_eq!(doc, doc_before);
    }

    #[test]
    fn test_coin_flip_and_dice_are_deterministic_per_seed() {
        let run = |seed: u64| -> Vec<serde_json::Value> {
            let mut doc = GameDoc::new(RoomId::new("r1"), 4);
            let mut hidden = HiddenState::new();
            let mut rng = GameRng::new(seed);
            join(&mut doc, &mut hidden, &mut rng, "p1");

            let flip = Intent::new(
                "flip",
                PlayerId::new("p1"),
                IntentKind::CoinFlip(CoinFlip { count: Some(5) }),
            );
            let roll = Intent::new(
                "roll",
                PlayerId::new("p1"),
                IntentKind::DiceRoll(DiceRoll {
                    sides: 20,
                    count: Some(2),
                }),
            );
            let mut events = apply(&mut doc, &mut hidden, &mut rng, &flip)
                .unwrap()
                .log_events;
            events.extend(apply(&mut doc, &mut hidden, &mut rng, &roll).unwrap().log_events);
            events.into_iter().map(|e| e.payload).collect()
        };

        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_partition_invariant_across_mixed_intents() {
        let (mut doc, mut hidden, mut rng) = room();
        join(&mut doc, &mut hidden, &mut rng, "p1");

        let cards: Vec<Card> = (0..5).map(|i| library_card(&format!("c{i}"), "p1")).collect();
        apply(
            &mut doc,
            &mut hidden,
            &mut rng,
            &Intent::new(
                "load",
                PlayerId::new("p1"),
                IntentKind::DeckLoad(DeckLoad {
                    player_id: PlayerId::new("p1"),
                    cards,
                }),
            ),
        )
        .unwrap();

        let intents = vec![
            Intent::new(
                "draw",
                PlayerId::new("p1"),
                IntentKind::LibraryDraw(LibraryDraw {
                    player_id: PlayerId::new("p1"),
                    count: Some(2),
                }),
            ),
            Intent::new(
                "shuffle",
                PlayerId::new("p1"),
                IntentKind::LibraryShuffle(LibraryShuffle {
                    player_id: PlayerId::new("p1"),
                }),
            ),
            Intent::new(
                "mull",
                PlayerId::new("p1"),
                IntentKind::DeckMulligan(DeckMulligan {
                    player_id: PlayerId::new("p1"),
                    draw: Some(1),
                }),
            ),
        ];
        for intent in &intents {
            apply(&mut doc, &mut hidden, &mut rng, intent).unwrap();
        }

        for i in 0..5 {
            let id = CardId::new(format!("c{i}"));
            let public = doc.card(&id).is_some();
            let private = hidden.contains(&id);
            assert!(public ^ private, "c{i} must be in exactly one partition");
        }
    }
}
