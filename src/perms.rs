//! Permission predicates: may actor X do Y to entity Z.
//!
//! One predicate per action family. Each returns `Ok(())` or a
//! [`PermissionDenied`] whose message is surfaced verbatim in the intent
//! ack, so the strings here are part of the observable contract.
//!
//! Predicates are pure: they read the document and never mutate. Handlers
//! re-check the relevant predicate immediately before mutating, even when
//! an earlier layer already screened the intent.

use thiserror::Error;

use crate::core::{Card, PlayerId, Zone, ZoneKind};

/// A denied permission check, with the client-facing reason.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PermissionDenied {
    #[error("Cannot modify a card you do not control")]
    NotController,

    #[error("Card is not on the battlefield")]
    NotOnBattlefield,

    #[error("Cannot change another player's life total")]
    LifeNotSelf,

    #[error("Cannot rename another player")]
    NameNotSelf,

    #[error("Cannot update another player")]
    PlayerNotSelf,

    #[error("Cannot view a hidden zone you do not own")]
    ViewHiddenZoneNotOwner,

    #[error("Cannot place into a hidden zone you do not own")]
    HiddenZoneNotOwner,

    #[error("Cannot move a card you do not own or control")]
    MoveNotOwnerOrController,

    #[error("Cannot put a card you do not own into another player's commander zone")]
    CommanderZoneNeedsOwnership,

    #[error("Cannot remove another player's token from the battlefield")]
    TokenNotOwner,

    #[error("Tokens can only be created on a battlefield")]
    TokenOffBattlefield,

    #[error("Cannot add a card owned by another player to this zone")]
    AddOwnerMismatch,

    #[error("Cannot remove this token")]
    RemoveTokenNotAllowed,

    #[error("Cannot remove a card you do not own")]
    RemoveNotOwner,

    #[error("Only the host can lock the room")]
    HostOnly,
}

/// Which player-record fields an update touches; used to pick the denial
/// reason when the actor is not the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerUpdateScope {
    pub life: bool,
    pub name: bool,
    /// Only the commander-damage entry keyed by the acting player.
    pub own_commander_damage_only: bool,
}

/// Tap, untap, or otherwise modify a battlefield card.
///
/// The actor must control the card and it must be on a battlefield.
pub fn can_modify_card(
    actor: &PlayerId,
    card: &Card,
    zone: &Zone,
) -> Result<(), PermissionDenied> {
    if !zone.kind.is_battlefield() {
        return Err(PermissionDenied::NotOnBattlefield);
    }
    if &card.controller_id != actor {
        return Err(PermissionDenied::NotController);
    }
    Ok(())
}

/// Update a player record.
///
/// Self-updates are unrestricted. Another player may only record the
/// commander damage their own commander dealt; anything else is denied
/// with a field-specific reason.
pub fn can_update_player(
    actor: &PlayerId,
    target: &PlayerId,
    scope: PlayerUpdateScope,
) -> Result<(), PermissionDenied> {
    if actor == target {
        return Ok(());
    }
    if scope.life {
        return Err(PermissionDenied::LifeNotSelf);
    }
    if scope.name {
        return Err(PermissionDenied::NameNotSelf);
    }
    if scope.own_commander_damage_only {
        return Ok(());
    }
    Err(PermissionDenied::PlayerNotSelf)
}

/// View the contents of a hidden zone.
pub fn can_view_hidden_zone(actor: &PlayerId, zone: &Zone) -> Result<(), PermissionDenied> {
    if &zone.owner_id == actor {
        Ok(())
    } else {
        Err(PermissionDenied::ViewHiddenZoneNotOwner)
    }
}

/// Move a card from one zone to another.
pub fn can_move_card(
    actor: &PlayerId,
    card: &Card,
    from: &Zone,
    to: &Zone,
) -> Result<(), PermissionDenied> {
    if &card.owner_id != actor && &card.controller_id != actor {
        return Err(PermissionDenied::MoveNotOwnerOrController);
    }
    if to.is_hidden() && &to.owner_id != actor {
        return Err(PermissionDenied::HiddenZoneNotOwner);
    }
    if to.kind == ZoneKind::Commander && to.owner_id != card.owner_id {
        return Err(PermissionDenied::CommanderZoneNeedsOwnership);
    }
    if card.is_token
        && from.kind.is_battlefield()
        && !to.kind.is_battlefield()
        && &card.owner_id != actor
    {
        return Err(PermissionDenied::TokenNotOwner);
    }
    Ok(())
}

/// Add a brand-new card record to a zone.
pub fn can_add_card(
    actor: &PlayerId,
    card_owner: &PlayerId,
    is_token: bool,
    zone: &Zone,
) -> Result<(), PermissionDenied> {
    if is_token {
        if !zone.kind.is_battlefield() {
            return Err(PermissionDenied::TokenOffBattlefield);
        }
        return Ok(());
    }
    if zone.is_hidden() && &zone.owner_id != actor {
        return Err(PermissionDenied::HiddenZoneNotOwner);
    }
    if card_owner != &zone.owner_id {
        return Err(PermissionDenied::AddOwnerMismatch);
    }
    Ok(())
}

/// Remove a token from play.
///
/// Allowed for the token's owner, its controller, or the host zone's owner.
pub fn can_remove_token(
    actor: &PlayerId,
    card: &Card,
    zone: &Zone,
) -> Result<(), PermissionDenied> {
    if &card.owner_id == actor || &card.controller_id == actor || &zone.owner_id == actor {
        Ok(())
    } else {
        Err(PermissionDenied::RemoveTokenNotAllowed)
    }
}

/// Remove any card record from the room.
///
/// Tokens follow the token rule; real cards may only be removed by their
/// owner.
pub fn can_remove_card(
    actor: &PlayerId,
    card: &Card,
    zone: &Zone,
) -> Result<(), PermissionDenied> {
    if card.is_token {
        return can_remove_token(actor, card, zone);
    }
    if &card.owner_id == actor {
        Ok(())
    } else {
        Err(PermissionDenied::RemoveNotOwner)
    }
}

/// Lock or unlock the room.
pub fn can_lock_room(actor: &PlayerId, host: Option<&PlayerId>) -> Result<(), PermissionDenied> {
    if host == Some(actor) {
        Ok(())
    } else {
        Err(PermissionDenied::HostOnly)
    }
}
