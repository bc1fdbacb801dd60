//! Deck lifecycle: load, reset, unload, mulligan.
//!
//! These are bulk operations, so they manipulate the partitions directly
//! instead of routing every card through the movement machine; a single
//! log event summarizes each.

use serde_json::json;

use crate::core::{CardId, LogEvent, PlayerId, ZoneKind};
use crate::document::Placement;
use crate::intent::types::{DeckLoad, DeckMulligan, DeckReset, DeckUnload, IntentError};
use crate::movement::{move_card, MoveRequest, MoveSemantic};
use crate::perms;
use crate::transforms;

use super::{require_self, Ctx};

pub(super) fn load(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &DeckLoad) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }

    // Validate the whole list before the first insert.
    for card in &p.cards {
        if card.owner_id != p.player_id {
            return Err(IntentError::Malformed(format!(
                "deck card {} not owned by {}",
                card.id, p.player_id
            )));
        }
        if ctx.doc.card(&card.id).is_some() || ctx.hidden.contains(&card.id) {
            return Err(IntentError::Malformed(format!(
                "card already exists: {}",
                card.id
            )));
        }
        let zone = ctx
            .doc
            .zone(&card.zone_id)
            .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?;
        perms::can_add_card(actor, &card.owner_id, card.is_token, zone)?;
    }

    let mut touched_library = false;
    for card in &p.cards {
        let zone = ctx
            .doc
            .zone(&card.zone_id)
            .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
            .clone();
        let mut card = card.clone();
        card.controller_id = zone.owner_id.clone();

        if zone.is_hidden() {
            card.clear_reveals();
            ctx.hidden
                .insert_card(card, zone.kind, &zone.owner_id, Placement::Bottom);
            touched_library |= zone.kind == ZoneKind::Library;
        } else {
            card.known_to_all = true;
            ctx.doc.insert_card(card, Placement::Bottom);
        }
    }

    ctx.hidden.update_player_counts(ctx.doc, &p.player_id);
    if touched_library {
        ctx.hidden
            .sync_library_reveals_to_all(ctx.doc, &p.player_id);
    }
    ctx.mark_hidden_changed();

    ctx.log(LogEvent::new(
        "deck.load",
        json!({ "playerId": p.player_id, "count": p.cards.len() }),
    ));
    Ok(())
}

pub(super) fn reset(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &DeckReset) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }
    let owner = &p.player_id;
    let commander_zone = ctx.doc.find_zone(owner, ZoneKind::Commander).map(|z| z.id.clone());

    // Public cards owned by the player: tokens vanish, commanders go to
    // the commander zone, the rest go back into the library.
    let owned: Vec<CardId> = ctx
        .doc
        .cards()
        .filter(|c| &c.owner_id == owner)
        .map(|c| c.id.clone())
        .collect();
    for id in owned {
        let Some(mut card) = ctx.doc.take_card(&id) else {
            continue;
        };
        if let Some(identity) = ctx.hidden.face_down_battlefield.remove(&id) {
            transforms::restore_identity(&mut card, &identity);
        }
        ctx.hidden.clear_card_reveals(ctx.doc, &id);
        if card.is_token {
            continue;
        }
        transforms::reset_to_front(&mut card);
        transforms::clear_battlefield_state(&mut card);
        card.counters.clear();
        card.controller_id = card.owner_id.clone();

        if card.is_commander {
            if let Some(zone_id) = &commander_zone {
                card.zone_id = zone_id.clone();
                card.known_to_all = true;
                ctx.doc.insert_card(card, Placement::Bottom);
                continue;
            }
        }
        card.clear_reveals();
        if let Some(library) = ctx.doc.find_zone(owner, ZoneKind::Library).map(|z| z.id.clone()) {
            card.zone_id = library;
        }
        ctx.hidden
            .insert_card(card, ZoneKind::Library, owner, Placement::Bottom);
    }

    // Hand cards return to the library as well. Sideboard stays put.
    let hand: Vec<CardId> = ctx.hidden.order(ZoneKind::Hand, owner).to_vec();
    for id in hand {
        if let Some(mut card) = ctx.hidden.take_card(&id) {
            ctx.hidden.clear_card_reveals(ctx.doc, &id);
            card.clear_reveals();
            if let Some(library) = ctx.doc.find_zone(owner, ZoneKind::Library).map(|z| z.id.clone()) {
                card.zone_id = library;
            }
            ctx.hidden
                .insert_card(card, ZoneKind::Library, owner, Placement::Bottom);
        }
    }

    if let Some(order) = ctx.hidden.order_mut(ZoneKind::Library, owner) {
        ctx.rng.shuffle(order);
    }
    ctx.hidden.update_player_counts(ctx.doc, owner);
    ctx.hidden.sync_library_reveals_to_all(ctx.doc, owner);
    ctx.mark_hidden_changed();

    ctx.log(LogEvent::new("deck.reset", json!({ "playerId": owner })));
    Ok(())
}

pub(super) fn unload(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &DeckUnload) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }
    let owner = &p.player_id;

    let owned: Vec<CardId> = ctx
        .doc
        .cards()
        .filter(|c| &c.owner_id == owner)
        .map(|c| c.id.clone())
        .collect();
    for id in owned {
        ctx.doc.take_card(&id);
        ctx.hidden.face_down_battlefield.remove(&id);
        ctx.hidden.clear_card_reveals(ctx.doc, &id);
    }

    let hidden_owned: Vec<CardId> = ctx
        .hidden
        .cards
        .values()
        .filter(|c| &c.owner_id == owner)
        .map(|c| c.id.clone())
        .collect();
    for id in hidden_owned {
        ctx.hidden.take_card(&id);
        ctx.hidden.clear_card_reveals(ctx.doc, &id);
    }

    ctx.hidden.library_views.remove(owner);
    ctx.hidden.update_player_counts(ctx.doc, owner);
    ctx.hidden.sync_library_reveals_to_all(ctx.doc, owner);
    ctx.mark_hidden_changed();

    ctx.log(LogEvent::new("deck.unload", json!({ "playerId": owner })));
    Ok(())
}

pub(super) fn mulligan(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &DeckMulligan,
) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }
    let owner = &p.player_id;
    let hand_zone = ctx
        .doc
        .find_zone(owner, ZoneKind::Hand)
        .ok_or_else(|| IntentError::ZoneNotFound(crate::core::ZoneId::new("hand")))?
        .id
        .clone();

    let hand: Vec<CardId> = ctx.hidden.order(ZoneKind::Hand, owner).to_vec();
    let returned = hand.len();
    for id in hand {
        if let Some(mut card) = ctx.hidden.take_card(&id) {
            ctx.hidden.clear_card_reveals(ctx.doc, &id);
            card.clear_reveals();
            if let Some(library) = ctx.doc.find_zone(owner, ZoneKind::Library).map(|z| z.id.clone()) {
                card.zone_id = library;
            }
            ctx.hidden
                .insert_card(card, ZoneKind::Library, owner, Placement::Bottom);
        }
    }

    if let Some(order) = ctx.hidden.order_mut(ZoneKind::Library, owner) {
        ctx.rng.shuffle(order);
    }

    let draw = p
        .draw
        .unwrap_or(returned)
        .min(ctx.hidden.order(ZoneKind::Library, owner).len());
    for _ in 0..draw {
        let Some(top) = ctx
            .hidden
            .order(ZoneKind::Library, owner)
            .first()
            .cloned()
        else {
            break;
        };
        let outcome = move_card(
            ctx.doc,
            ctx.hidden,
            &MoveRequest::new(actor.clone(), top, hand_zone.clone())
                .placed(Placement::Bottom)
                .semantic(MoveSemantic::Draw),
        )?;
        // The per-card draw lines are folded into the mulligan event.
        ctx.hidden_changed |= outcome.hidden_changed;
    }

    ctx.hidden.update_player_counts(ctx.doc, owner);
    ctx.hidden.sync_library_reveals_to_all(ctx.doc, owner);
    ctx.mark_hidden_changed();

    ctx.log(LogEvent::new(
        "deck.mulligan",
        json!({ "playerId": owner, "returned": returned, "drew": draw }),
    ));
    Ok(())
}
