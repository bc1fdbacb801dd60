//! Intent envelope, payload types, and pipeline errors.
//!
//! An intent is one client-submitted command: `{id, type, actor, payload}`.
//! The kind enum is a sealed registry — dispatch is an exhaustive match,
//! so adding a kind without a handler fails to compile.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    Card, CardId, LibraryTopReveal, LogEvent, PlayerId, Position, Zone, ZoneId,
};
use crate::document::Placement;
use crate::movement::MoveError;
use crate::perms::PermissionDenied;

/// One client-submitted command.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Client-chosen id, echoed in the ack.
    pub id: String,

    /// The player this command acts as. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<PlayerId>,

    #[serde(flatten)]
    pub kind: IntentKind,
}

impl Intent {
    /// Build an intent with an actor.
    #[must_use]
    pub fn new(id: impl Into<String>, actor: PlayerId, kind: IntentKind) -> Self {
        Self {
            id: id.into(),
            actor: Some(actor),
            kind,
        }
    }
}

/// The sealed intent registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IntentKind {
    #[serde(rename = "player.join")]
    PlayerJoin(PlayerJoin),
    #[serde(rename = "player.update")]
    PlayerUpdate(PlayerUpdate),
    #[serde(rename = "player.leave")]
    PlayerLeave(PlayerLeave),

    #[serde(rename = "zone.add")]
    ZoneAdd(ZoneAdd),
    #[serde(rename = "zone.reorder")]
    ZoneReorder(ZoneReorder),

    #[serde(rename = "card.add")]
    CardAdd(CardAdd),
    #[serde(rename = "card.remove")]
    CardRemove(CardRemove),
    #[serde(rename = "card.update")]
    CardUpdate(CardUpdate),
    #[serde(rename = "card.tap")]
    CardTap(CardTap),
    #[serde(rename = "card.duplicate")]
    CardDuplicate(CardDuplicate),
    #[serde(rename = "card.transform")]
    CardTransform(CardTransform),
    #[serde(rename = "card.move")]
    CardMove(CardMove),
    #[serde(rename = "card.reveal")]
    CardReveal(CardReveal),
    #[serde(rename = "counter.adjust")]
    CounterAdjust(CounterAdjust),

    #[serde(rename = "library.draw")]
    LibraryDraw(LibraryDraw),
    #[serde(rename = "library.discard")]
    LibraryDiscard(LibraryDiscard),
    #[serde(rename = "library.shuffle")]
    LibraryShuffle(LibraryShuffle),
    #[serde(rename = "library.view")]
    LibraryView(LibraryView),

    #[serde(rename = "deck.load")]
    DeckLoad(DeckLoad),
    #[serde(rename = "deck.reset")]
    DeckReset(DeckReset),
    #[serde(rename = "deck.unload")]
    DeckUnload(DeckUnload),
    #[serde(rename = "deck.mulligan")]
    DeckMulligan(DeckMulligan),

    #[serde(rename = "room.lock")]
    RoomLock(RoomLock),
    #[serde(rename = "room.scale")]
    BattlefieldScale(BattlefieldScale),
    #[serde(rename = "counter.global")]
    GlobalCounterAdd(GlobalCounterAdd),

    #[serde(rename = "coin.flip")]
    CoinFlip(CoinFlip),
    #[serde(rename = "dice.roll")]
    DiceRoll(DiceRoll),
}

impl IntentKind {
    /// Dotted type name, for logging and acks.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            IntentKind::PlayerJoin(_) => "player.join",
            IntentKind::PlayerUpdate(_) => "player.update",
            IntentKind::PlayerLeave(_) => "player.leave",
            IntentKind::ZoneAdd(_) => "zone.add",
            IntentKind::ZoneReorder(_) => "zone.reorder",
            IntentKind::CardAdd(_) => "card.add",
            IntentKind::CardRemove(_) => "card.remove",
            IntentKind::CardUpdate(_) => "card.update",
            IntentKind::CardTap(_) => "card.tap",
            IntentKind::CardDuplicate(_) => "card.duplicate",
            IntentKind::CardTransform(_) => "card.transform",
            IntentKind::CardMove(_) => "card.move",
            IntentKind::CardReveal(_) => "card.reveal",
            IntentKind::CounterAdjust(_) => "counter.adjust",
            IntentKind::LibraryDraw(_) => "library.draw",
            IntentKind::LibraryDiscard(_) => "library.discard",
            IntentKind::LibraryShuffle(_) => "library.shuffle",
            IntentKind::LibraryView(_) => "library.view",
            IntentKind::DeckLoad(_) => "deck.load",
            IntentKind::DeckReset(_) => "deck.reset",
            IntentKind::DeckUnload(_) => "deck.unload",
            IntentKind::DeckMulligan(_) => "deck.mulligan",
            IntentKind::RoomLock(_) => "room.lock",
            IntentKind::BattlefieldScale(_) => "room.scale",
            IntentKind::GlobalCounterAdd(_) => "counter.global",
            IntentKind::CoinFlip(_) => "coin.flip",
            IntentKind::DiceRoll(_) => "dice.roll",
        }
    }
}

// === Payloads ===

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoin {
    pub player_id: PlayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life: Option<i32>,
}

/// Wire value for setting the library top-reveal mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopRevealSetting {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "self")]
    OwnerOnly,
    #[serde(rename = "unset")]
    Unset,
}

impl TopRevealSetting {
    #[must_use]
    pub fn into_mode(self) -> Option<LibraryTopReveal> {
        match self {
            TopRevealSetting::All => Some(LibraryTopReveal::All),
            TopRevealSetting::OwnerOnly => Some(LibraryTopReveal::OwnerOnly),
            TopRevealSetting::Unset => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub player_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Counter deltas, applied on top of current values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<FxHashMap<String, i32>>,
    /// Commander damage entries to set, keyed by the damage source player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commander_damage: Option<FxHashMap<PlayerId, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commander_tax: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_top_reveal: Option<TopRevealSetting>,
}

impl PlayerUpdate {
    /// An update touching only the target's id (useful in tests).
    #[must_use]
    pub fn for_player(player_id: PlayerId) -> Self {
        Self {
            player_id,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeave {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAdd {
    pub zone: Zone,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneReorder {
    pub zone_id: ZoneId,
    /// The full new order; must be a permutation of the current one.
    pub card_ids: Vec<CardId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAdd {
    pub card: Card,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub placement: Placement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRemove {
    pub card_id: CardId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    pub card_id: CardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toughness: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTap {
    pub card_ids: Vec<CardId>,
    pub tapped: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDuplicate {
    pub card_id: CardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Ids for the copies; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_ids: Option<Vec<CardId>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransform {
    pub card_id: CardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_index: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMove {
    pub card_ids: Vec<CardId>,
    pub to_zone_id: ZoneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_down: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardReveal {
    pub card_id: CardId,
    #[serde(default)]
    pub to_all: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<PlayerId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterAdjust {
    pub card_id: CardId,
    pub counter: String,
    pub delta: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDraw {
    pub player_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDiscard {
    pub player_id: PlayerId,
    pub card_ids: Vec<CardId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryShuffle {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryView {
    pub player_id: PlayerId,
    /// Top-N request; absent or zero clears the view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckLoad {
    pub player_id: PlayerId,
    /// Complete card records targeting the loader's own zones.
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckReset {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckUnload {
    pub player_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckMulligan {
    pub player_id: PlayerId,
    /// Cards to draw back; defaults to the returned hand size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLock {
    pub locked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlefieldScale {
    pub scale: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCounterAdd {
    pub name: String,
    pub delta: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinFlip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    pub sides: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

// === Outcomes and errors ===

/// Result of applying one intent.
#[derive(Clone, Debug, Default)]
pub struct ApplyOutcome {
    pub log_events: Vec<LogEvent>,

    /// The hidden partition changed; the caller must rebuild overlays and
    /// re-persist hidden state.
    pub hidden_changed: bool,
}

/// The exactly-once reply to a submitted intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentAck {
    pub intent_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntentAck {
    #[must_use]
    pub fn ok(intent_id: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
            ok: true,
            error: None,
        }
    }

    #[must_use]
    pub fn rejected(intent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Why an intent was rejected. The `Display` string becomes the ack error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("missing actor")]
    MissingActor,

    #[error("actor mismatch")]
    ActorMismatch,

    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("zone not found: {0}")]
    ZoneNotFound(ZoneId),

    #[error("card not found: {0}")]
    CardNotFound(CardId),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("room is locked")]
    RoomLocked,

    #[error("room is full")]
    RoomFull,

    #[error("player already joined: {0}")]
    AlreadyJoined(PlayerId),

    #[error("{0}")]
    Denied(#[from] PermissionDenied),

    #[error(transparent)]
    Move(#[from] MoveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_shape() {
        let json = r#"{
            "id": "i1",
            "actor": "p1",
            "type": "card.move",
            "payload": {
                "cardIds": ["c1"],
                "toZoneId": "hand-p1",
                "placement": "bottom"
            }
        }"#;

        let intent: Intent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.id, "i1");
        assert_eq!(intent.actor, Some(PlayerId::new("p1")));
        match &intent.kind {
            IntentKind::CardMove(m) => {
                assert_eq!(m.card_ids, vec![CardId::new("c1")]);
                assert_eq!(m.placement, Placement::Bottom);
            }
            other => panic!("wrong kind: {}", other.type_name()),
        }
    }

    #[test]
    fn test_missing_actor_parses_as_none() {
        let json = r#"{"id": "i2", "type": "coin.flip", "payload": {}}"#;
        let intent: Intent = serde_json::from_str(json).unwrap();
        assert!(intent.actor.is_none());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"id": "i3", "type": "nope", "payload": {}}"#;
        assert!(serde_json::from_str::<Intent>(json).is_err());
    }

    #[test]
    fn test_denied_error_surfaces_reason_verbatim() {
        let err = IntentError::Denied(PermissionDenied::HiddenZoneNotOwner);
        assert_eq!(
            err.to_string(),
            "Cannot place into a hidden zone you do not own"
        );
    }

    #[test]
    fn test_ack_shapes() {
        let ok = IntentAck::ok("i1");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["intentId"], "i1");
        assert_eq!(json["ok"], true);
        assert!(json.get("error").is_none());

        let bad = IntentAck::rejected("i2", "actor mismatch");
        assert_eq!(bad.error.as_deref(), Some("actor mismatch"));
    }
}
