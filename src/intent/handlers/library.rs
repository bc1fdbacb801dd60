//! Library handlers: draw, discard, shuffle, view.

use serde_json::json;

use crate::core::{LogEvent, PlayerId, ZoneKind};
use crate::document::Placement;
use crate::intent::types::{
    IntentError, LibraryDiscard, LibraryDraw, LibraryShuffle, LibraryView,
};
use crate::movement::{move_card, MoveRequest, MoveSemantic};
use crate::perms;

use super::{require_self, Ctx};

/// Upper bound on one draw intent, to keep a typo from dumping a library.
const MAX_DRAW: usize = 50;

pub(super) fn draw(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &LibraryDraw) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }
    let hand = ctx
        .doc
        .find_zone(&p.player_id, ZoneKind::Hand)
        .ok_or_else(|| IntentError::ZoneNotFound(crate::core::ZoneId::new("hand")))?
        .id
        .clone();

    let available = ctx.hidden.order(ZoneKind::Library, &p.player_id).len();
    let count = p.count.unwrap_or(1).clamp(1, MAX_DRAW).min(available);

    for _ in 0..count {
        let Some(top) = ctx
            .hidden
            .order(ZoneKind::Library, &p.player_id)
            .first()
            .cloned()
        else {
            break;
        };
        let outcome = move_card(
            ctx.doc,
            ctx.hidden,
            &MoveRequest::new(actor.clone(), top, hand.clone())
                .placed(Placement::Bottom)
                .semantic(MoveSemantic::Draw),
        )?;
        ctx.absorb(outcome);
    }
    Ok(())
}

pub(super) fn discard(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &LibraryDiscard,
) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    let graveyard = ctx
        .doc
        .find_zone(&p.player_id, ZoneKind::Graveyard)
        .ok_or_else(|| IntentError::ZoneNotFound(crate::core::ZoneId::new("graveyard")))?
        .id
        .clone();

    // Every card must be in the actor's hand before anything moves.
    for card_id in &p.card_ids {
        if !ctx
            .hidden
            .order(ZoneKind::Hand, &p.player_id)
            .contains(card_id)
        {
            return Err(IntentError::CardNotFound(card_id.clone()));
        }
    }

    for card_id in &p.card_ids {
        let outcome = move_card(
            ctx.doc,
            ctx.hidden,
            &MoveRequest::new(actor.clone(), card_id.clone(), graveyard.clone())
                .semantic(MoveSemantic::Discard),
        )?;
        ctx.absorb(outcome);
    }
    Ok(())
}

pub(super) fn shuffle(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &LibraryShuffle,
) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }

    if let Some(order) = ctx.hidden.order_mut(ZoneKind::Library, &p.player_id) {
        ctx.rng.shuffle(order);
    }
    ctx.hidden
        .sync_library_reveals_to_all(ctx.doc, &p.player_id);
    ctx.mark_hidden_changed();

    ctx.log(LogEvent::new(
        "library.shuffle",
        json!({ "playerId": p.player_id }),
    ));
    Ok(())
}

pub(super) fn view(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &LibraryView) -> Result<(), IntentError> {
    let zone = ctx
        .doc
        .find_zone(&p.player_id, ZoneKind::Library)
        .ok_or_else(|| IntentError::PlayerNotFound(p.player_id.clone()))?
        .clone();
    perms::can_view_hidden_zone(actor, &zone)?;

    let count = p.count.unwrap_or(0);
    if count == 0 {
        ctx.hidden.library_views.remove(&p.player_id);
    } else {
        ctx.hidden.library_views.insert(p.player_id.clone(), count);
        ctx.log(LogEvent::new(
            "library.view",
            json!({ "playerId": p.player_id, "count": count }),
        ));
    }
    ctx.mark_hidden_changed();
    Ok(())
}
