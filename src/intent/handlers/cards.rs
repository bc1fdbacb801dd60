//! Card handlers: add, remove, update, tap, duplicate, transform, move,
//! reveal, counter adjust.

use serde_json::json;

use crate::core::{
    CardId, FaceDownMode, LogEvent, PlayerId, Position, ZoneKind, REDACTED_CARD_NAME,
};
use crate::document::Placement;
use crate::hidden::RevealGrant;
use crate::intent::types::{
    CardAdd, CardDuplicate, CardMove, CardRemove, CardReveal, CardTap, CardTransform, CardUpdate,
    CounterAdjust, IntentError,
};
use crate::movement::{move_card, MoveRequest};
use crate::perms;
use crate::{position, transforms};

use super::Ctx;

pub(super) fn add(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardAdd) -> Result<(), IntentError> {
    let zone = ctx
        .doc
        .zone(&p.card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(p.card.zone_id.clone()))?
        .clone();
    if ctx.doc.card(&p.card.id).is_some() || ctx.hidden.contains(&p.card.id) {
        return Err(IntentError::Malformed(format!(
            "card already exists: {}",
            p.card.id
        )));
    }
    perms::can_add_card(actor, &p.card.owner_id, p.card.is_token, &zone)?;

    let mut card = p.card.clone();
    card.controller_id = zone.owner_id.clone();

    if zone.is_hidden() {
        card.clear_reveals();
        card.face_down = false;
        card.face_down_mode = None;
        transforms::clear_battlefield_state(&mut card);
        ctx.hidden
            .insert_card(card, zone.kind, &zone.owner_id, p.placement);
        ctx.hidden.update_player_counts(ctx.doc, &zone.owner_id);
        if zone.kind == ZoneKind::Library {
            ctx.hidden
                .sync_library_reveals_to_all(ctx.doc, &zone.owner_id);
        }
        ctx.mark_hidden_changed();
        ctx.log(LogEvent::new(
            "card.add",
            json!({
                "playerId": actor,
                "cardId": p.card.id,
                "cardName": REDACTED_CARD_NAME,
                "zoneId": zone.id,
                "zone": zone.kind,
            }),
        ));
    } else {
        let name = card.name().to_string();
        if zone.kind.is_battlefield() {
            let desired = p.position.or(card.position).unwrap_or(position::DEFAULT_DROP);
            let occupied = ctx.doc.occupied_positions(&zone.id, None);
            card.position = Some(position::resolve(desired, &occupied));
        }
        card.known_to_all = true;
        ctx.doc.insert_card(card, p.placement);
        ctx.log(LogEvent::new(
            "card.add",
            json!({
                "playerId": actor,
                "cardId": p.card.id,
                "cardName": name,
                "zoneId": zone.id,
                "zone": zone.kind,
            }),
        ));
    }
    Ok(())
}

pub(super) fn remove(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardRemove) -> Result<(), IntentError> {
    let (card, in_hidden) = if let Some(card) = ctx.doc.card(&p.card_id) {
        (card.clone(), false)
    } else if let Some(card) = ctx.hidden.cards.get(&p.card_id) {
        (card.clone(), true)
    } else {
        return Err(IntentError::CardNotFound(p.card_id.clone()));
    };
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
        .clone();

    perms::can_remove_card(actor, &card, &zone)?;

    if in_hidden {
        ctx.hidden.take_card(&p.card_id);
        ctx.hidden.update_player_counts(ctx.doc, &zone.owner_id);
        if zone.kind == ZoneKind::Library {
            ctx.hidden
                .sync_library_reveals_to_all(ctx.doc, &zone.owner_id);
        }
        ctx.mark_hidden_changed();
    } else {
        ctx.doc.take_card(&p.card_id);
        if ctx.hidden.face_down_battlefield.remove(&p.card_id).is_some() {
            ctx.mark_hidden_changed();
        }
    }
    ctx.hidden.clear_card_reveals(ctx.doc, &p.card_id);

    let name = if in_hidden || card.face_down {
        REDACTED_CARD_NAME.to_string()
    } else {
        card.name().to_string()
    };
    ctx.log(LogEvent::new(
        "card.remove",
        json!({ "playerId": actor, "cardId": p.card_id, "cardName": name }),
    ));
    Ok(())
}

pub(super) fn update(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardUpdate) -> Result<(), IntentError> {
    let card = ctx
        .doc
        .card(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?;
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?;
    perms::can_modify_card(actor, card, zone)?;

    let resolved = p.position.map(|desired| {
        let occupied = ctx.doc.occupied_positions(&card.zone_id.clone(), Some(&p.card_id));
        position::resolve(desired, &occupied)
    });

    let card = ctx
        .doc
        .card_mut(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?;
    if let Some(position) = resolved {
        card.position = Some(position);
    }
    if let Some(rotation) = p.rotation {
        card.rotation = rotation;
    }
    if p.power.is_some() {
        card.power = p.power.clone();
    }
    if p.toughness.is_some() {
        card.toughness = p.toughness.clone();
    }
    Ok(())
}

pub(super) fn tap(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardTap) -> Result<(), IntentError> {
    // Validate the whole batch before touching anything.
    for card_id in &p.card_ids {
        let card = ctx
            .doc
            .card(card_id)
            .ok_or_else(|| IntentError::CardNotFound(card_id.clone()))?;
        let zone = ctx
            .doc
            .zone(&card.zone_id)
            .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?;
        perms::can_modify_card(actor, card, zone)?;
    }

    for card_id in &p.card_ids {
        if let Some(card) = ctx.doc.card_mut(card_id) {
            card.tapped = p.tapped;
        }
    }

    ctx.log(LogEvent::new(
        "card.tap",
        json!({ "playerId": actor, "cardIds": p.card_ids, "tapped": p.tapped }),
    ));
    Ok(())
}

pub(super) fn duplicate(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &CardDuplicate,
) -> Result<(), IntentError> {
    let card = ctx
        .doc
        .card(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?
        .clone();
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
        .clone();
    perms::can_modify_card(actor, &card, &zone)?;

    let count = p.count.unwrap_or(1).clamp(1, 10);
    let ids = match &p.new_ids {
        Some(ids) => {
            if ids.len() != count {
                return Err(IntentError::Malformed(
                    "newIds length must match count".into(),
                ));
            }
            for id in ids {
                if ctx.doc.card(id).is_some() || ctx.hidden.contains(id) {
                    return Err(IntentError::Malformed(format!("card already exists: {id}")));
                }
            }
            ids.clone()
        }
        None => generate_copy_ids(ctx, &p.card_id, count),
    };

    for (i, id) in ids.iter().enumerate() {
        let mut token = transforms::duplicate_token(&card, id.clone(), i + 1);
        let desired = token.position.unwrap_or(position::DEFAULT_DROP);
        let occupied = ctx.doc.occupied_positions(&zone.id, None);
        token.position = Some(position::resolve(desired, &occupied));
        ctx.doc.insert_card(token, Placement::Top);
    }

    ctx.log(LogEvent::new(
        "card.duplicate",
        json!({
            "playerId": actor,
            "cardId": p.card_id,
            "cardName": card.name(),
            "count": count,
        }),
    ));
    Ok(())
}

fn generate_copy_ids(ctx: &Ctx<'_>, source: &CardId, count: usize) -> Vec<CardId> {
    let mut ids = Vec::with_capacity(count);
    let mut suffix = 1usize;
    while ids.len() < count {
        let id = CardId::new(format!("{source}-copy{suffix}"));
        if ctx.doc.card(&id).is_none() && !ctx.hidden.contains(&id) && !ids.contains(&id) {
            ids.push(id);
        }
        suffix += 1;
    }
    ids
}

pub(super) fn transform(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &CardTransform,
) -> Result<(), IntentError> {
    let card = ctx
        .doc
        .card(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?
        .clone();
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
        .clone();
    perms::can_modify_card(actor, &card, &zone)?;

    match p.face_down {
        Some(true) if !card.face_down => {
            let card = ctx
                .doc
                .card_mut(&p.card_id)
                .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?;
            card.clear_reveals();
            transforms::set_face_down(card, Some(FaceDownMode::Manual));
            let identity = transforms::strip_identity(card);
            ctx.hidden
                .face_down_battlefield
                .insert(p.card_id.clone(), identity);
            ctx.mark_hidden_changed();
        }
        Some(false) if card.face_down => {
            let identity = ctx.hidden.face_down_battlefield.remove(&p.card_id);
            ctx.hidden.clear_card_reveals(ctx.doc, &p.card_id);
            let card = ctx
                .doc
                .card_mut(&p.card_id)
                .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?;
            if let Some(identity) = &identity {
                transforms::restore_identity(card, identity);
            }
            transforms::set_face_up(card);
            card.known_to_all = true;
            ctx.mark_hidden_changed();
        }
        _ => {}
    }

    if let Some(face_index) = p.face_index {
        if let Some(card) = ctx.doc.card_mut(&p.card_id) {
            if !card.face_down {
                transforms::show_face(card, face_index);
            }
        }
    }

    let shown = ctx
        .doc
        .card(&p.card_id)
        .map(|c| {
            if c.face_down {
                REDACTED_CARD_NAME.to_string()
            } else {
                c.name().to_string()
            }
        })
        .unwrap_or_default();
    ctx.log(LogEvent::new(
        "card.transform",
        json!({ "playerId": actor, "cardId": p.card_id, "cardName": shown }),
    ));
    Ok(())
}

pub(super) fn mv(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardMove) -> Result<(), IntentError> {
    if p.card_ids.is_empty() {
        return Err(IntentError::Malformed("no cards to move".into()));
    }
    let to_zone = ctx
        .doc
        .zone(&p.to_zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(p.to_zone_id.clone()))?
        .clone();

    // Validate and permission-check the whole group first.
    let mut current_positions = Vec::with_capacity(p.card_ids.len());
    for card_id in &p.card_ids {
        let card = ctx
            .doc
            .card(card_id)
            .or_else(|| ctx.hidden.cards.get(card_id))
            .ok_or_else(|| IntentError::CardNotFound(card_id.clone()))?;
        let from_zone = ctx
            .doc
            .zone(&card.zone_id)
            .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?;
        perms::can_move_card(actor, card, from_zone, &to_zone)?;
        current_positions.push(card.position);
    }

    // Grouped battlefield drops keep their relative offsets.
    let resolved: Vec<Option<Position>> = if to_zone.kind.is_battlefield() {
        let desired: Vec<Position> = p
            .card_ids
            .iter()
            .zip(&current_positions)
            .enumerate()
            .map(|(i, (_, current))| {
                let base = p.position.or(*current).unwrap_or(position::DEFAULT_DROP);
                let step = 0.02 * i as f32;
                if p.position.is_some() && p.card_ids.len() > 1 {
                    Position::new(base.x + step, base.y + step)
                } else {
                    base
                }
            })
            .collect();
        // Moving cards do not collide with themselves.
        let mut occupied = ctx.doc.occupied_positions(&to_zone.id, None);
        occupied.retain(|pos| !current_positions.iter().flatten().any(|m| m == pos));
        position::resolve_group(&desired, &occupied)
            .into_iter()
            .map(Some)
            .collect()
    } else {
        vec![None; p.card_ids.len()]
    };

    for (card_id, position) in p.card_ids.iter().zip(resolved) {
        let mut request = MoveRequest::new(actor.clone(), card_id.clone(), p.to_zone_id.clone())
            .placed(p.placement);
        request.face_down = p.face_down;
        request.position = position;
        let outcome = move_card(ctx.doc, ctx.hidden, &request)?;
        ctx.absorb(outcome);
    }
    Ok(())
}

pub(super) fn reveal(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardReveal) -> Result<(), IntentError> {
    // Hidden-zone card or face-down battlefield card.
    if let Some(card) = ctx.hidden.cards.get(&p.card_id).cloned() {
        let zone = ctx
            .doc
            .zone(&card.zone_id)
            .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
            .clone();
        perms::can_view_hidden_zone(actor, &zone)?;

        let grant = RevealGrant::build(&zone.owner_id, p.to_all, &p.to);
        if let Some(card) = ctx.hidden.cards.get_mut(&p.card_id) {
            card.revealed_to_all = grant.to_all;
            card.revealed_to = grant.to_players.clone();
        }
        match zone.kind {
            ZoneKind::Hand => ctx.hidden.set_hand_reveal(ctx.doc, &p.card_id, grant.clone()),
            ZoneKind::Library => {
                ctx.hidden
                    .set_library_reveal(ctx.doc, &zone.owner_id, &p.card_id, grant.clone())
            }
            _ => {
                return Err(IntentError::Malformed(
                    "cannot reveal from this zone".into(),
                ))
            }
        }
        ctx.mark_hidden_changed();
        log_reveal(ctx, actor, p, &grant, card.name());
        return Ok(());
    }

    let card = ctx
        .doc
        .card(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?
        .clone();
    if !card.face_down || !ctx.hidden.face_down_battlefield.contains_key(&p.card_id) {
        return Err(IntentError::Malformed(
            "card has no hidden identity to reveal".into(),
        ));
    }
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?
        .clone();
    perms::can_modify_card(actor, &card, &zone)?;

    let grant = RevealGrant::build(&card.controller_id, p.to_all, &p.to);
    let name = ctx
        .hidden
        .face_down_battlefield
        .get(&p.card_id)
        .map(|i| i.name().to_string())
        .unwrap_or_default();
    ctx.hidden
        .set_face_down_reveal(ctx.doc, &p.card_id, grant.clone());
    if let Some(card) = ctx.doc.card_mut(&p.card_id) {
        card.revealed_to_all = grant.to_all;
        card.revealed_to = grant.to_players.clone();
    }
    ctx.mark_hidden_changed();
    log_reveal(ctx, actor, p, &grant, &name);
    Ok(())
}

fn log_reveal(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CardReveal, grant: &RevealGrant, name: &str) {
    let card_name = if grant.to_all { name } else { REDACTED_CARD_NAME };
    ctx.log(LogEvent::new(
        "card.reveal",
        json!({
            "playerId": actor,
            "cardId": p.card_id,
            "cardName": card_name,
            "toAll": grant.to_all,
            "toPlayers": grant.to_players,
        }),
    ));
}

pub(super) fn counter_adjust(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &CounterAdjust,
) -> Result<(), IntentError> {
    let card = ctx
        .doc
        .card(&p.card_id)
        .ok_or_else(|| IntentError::CardNotFound(p.card_id.clone()))?;
    let zone = ctx
        .doc
        .zone(&card.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(card.zone_id.clone()))?;
    perms::can_modify_card(actor, card, zone)?;

    if let Some(card) = ctx.doc.card_mut(&p.card_id) {
        transforms::adjust_counter(&mut card.counters, &p.counter, p.delta);
    }

    ctx.log(LogEvent::new(
        "counter.adjust",
        json!({
            "playerId": actor,
            "cardId": p.card_id,
            "counter": p.counter,
            "delta": p.delta,
        }),
    ));
    Ok(())
}
