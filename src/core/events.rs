//! Log events derived from applied intents.
//!
//! Every mutating intent appends zero or more log events; the room actor
//! stamps them with a monotonically increasing event id and broadcasts
//! them to every connection. Payloads are free-form JSON because the log
//! channel is display-only; the constructors below keep the shapes
//! consistent.
//!
//! Card names in `card.move` events are redacted to `"a card"` whenever
//! the destination hides identity, so the log never leaks what went into
//! a hand or library.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ids::{CardId, PlayerId, ZoneId};
use super::zone::ZoneKind;

/// Redacted display name for cards whose identity the log must not leak.
pub const REDACTED_CARD_NAME: &str = "a card";

/// One log event, before the room assigns it an event id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Event kind, dotted ("card.move", "player.join").
    pub kind: String,

    /// Display payload.
    pub payload: serde_json::Value,
}

impl LogEvent {
    /// Build an event with an arbitrary kind and payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// A player joined the room.
    #[must_use]
    pub fn player_join(player: &PlayerId, name: &str) -> Self {
        Self::new(
            "player.join",
            json!({ "playerId": player, "name": name }),
        )
    }

    /// A player left the room.
    #[must_use]
    pub fn player_leave(player: &PlayerId) -> Self {
        Self::new("player.leave", json!({ "playerId": player }))
    }

    /// A card moved between zones.
    ///
    /// `card_name` must already be redacted by the caller when the
    /// destination hides identity; `force_hidden` records that redaction
    /// for the client renderer.
    #[must_use]
    pub fn card_move(
        actor: &PlayerId,
        card: &CardId,
        card_name: &str,
        from: (&ZoneId, ZoneKind),
        to: (&ZoneId, ZoneKind),
        force_hidden: bool,
    ) -> Self {
        Self::new(
            "card.move",
            json!({
                "playerId": actor,
                "cardId": card,
                "cardName": card_name,
                "fromZoneId": from.0,
                "fromZone": from.1,
                "toZoneId": to.0,
                "toZone": to.1,
                "forceHidden": force_hidden,
            }),
        )
    }

    /// A player drew a card.
    #[must_use]
    pub fn card_draw(player: &PlayerId, count: usize) -> Self {
        Self::new("card.draw", json!({ "playerId": player, "count": count }))
    }

    /// A player discarded a card.
    #[must_use]
    pub fn card_discard(player: &PlayerId, card_name: &str) -> Self {
        Self::new(
            "card.discard",
            json!({ "playerId": player, "cardName": card_name }),
        )
    }

    /// A coin flip result.
    #[must_use]
    pub fn coin_flip(player: &PlayerId, results: &[bool]) -> Self {
        Self::new(
            "coin.flip",
            json!({ "playerId": player, "results": results }),
        )
    }

    /// A dice roll result.
    #[must_use]
    pub fn dice_roll(player: &PlayerId, sides: u32, results: &[u32]) -> Self {
        Self::new(
            "dice.roll",
            json!({ "playerId": player, "sides": sides, "results": results }),
        )
    }
}

/// A log event stamped for broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventEnvelope {
    pub event_id: u64,

    #[serde(flatten)]
    pub event: LogEvent,
}
