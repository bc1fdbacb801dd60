//! Player lifecycle: join, update, leave.

use serde_json::json;

use crate::core::{LogEvent, Player, PlayerId, Zone, ZoneId, ZoneKind};
use crate::intent::types::{IntentError, PlayerJoin, PlayerLeave, PlayerUpdate};
use crate::perms::{self, PlayerUpdateScope};

use super::{require_self, Ctx};

const DEFAULT_LIFE: i32 = 40;

pub(super) fn join(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &PlayerJoin) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if p.player_id.is_empty() {
        return Err(IntentError::Malformed("empty player id".into()));
    }
    if ctx.doc.player(&p.player_id).is_some() {
        return Err(IntentError::AlreadyJoined(p.player_id.clone()));
    }
    if ctx.doc.meta.locked {
        return Err(IntentError::RoomLocked);
    }
    if ctx.doc.player_count() >= ctx.doc.meta.max_players {
        return Err(IntentError::RoomFull);
    }

    let mut player = Player::new(p.player_id.clone(), p.name.clone());
    player.life = p.life.unwrap_or(DEFAULT_LIFE);
    ctx.doc.add_player(player);

    for kind in ZoneKind::all() {
        ctx.doc.add_zone(Zone::new(
            ZoneId::new(format!("{kind}-{}", p.player_id)),
            kind,
            p.player_id.clone(),
        ));
    }

    // First valid joiner with no existing valid host becomes host.
    if !ctx.doc.has_valid_host() {
        ctx.doc.meta.host_id = Some(p.player_id.clone());
    }

    ctx.log(LogEvent::player_join(&p.player_id, &p.name));
    Ok(())
}

pub(super) fn update(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &PlayerUpdate,
) -> Result<(), IntentError> {
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }

    let only_own_commander_damage = p.life.is_none()
        && p.name.is_none()
        && p.counters.is_none()
        && p.commander_tax.is_none()
        && p.library_top_reveal.is_none()
        && p.commander_damage
            .as_ref()
            .is_some_and(|m| !m.is_empty() && m.keys().all(|k| k == actor));

    let scope = PlayerUpdateScope {
        life: p.life.is_some(),
        name: p.name.is_some(),
        own_commander_damage_only: only_own_commander_damage,
    };
    perms::can_update_player(actor, &p.player_id, scope)?;

    let mut top_reveal_changed = false;
    {
        let player = ctx
            .doc
            .player_mut(&p.player_id)
            .ok_or_else(|| IntentError::PlayerNotFound(p.player_id.clone()))?;

        if let Some(life) = p.life {
            player.life = life;
        }
        if let Some(name) = &p.name {
            player.name = name.clone();
        }
        if let Some(counters) = &p.counters {
            for (counter, delta) in counters {
                player.adjust_counter(counter, *delta);
            }
        }
        if let Some(damage) = &p.commander_damage {
            for (source, value) in damage {
                if *value <= 0 {
                    player.commander_damage.remove(source);
                } else {
                    player.commander_damage.insert(source.clone(), *value);
                }
            }
        }
        if let Some(tax) = p.commander_tax {
            player.commander_tax = tax;
        }
        if let Some(setting) = p.library_top_reveal {
            player.library_top_reveal = setting.into_mode();
            top_reveal_changed = true;
        }
    }

    if top_reveal_changed {
        ctx.hidden
            .sync_library_reveals_to_all(ctx.doc, &p.player_id);
        ctx.mark_hidden_changed();
    }

    if p.life.is_some() || p.name.is_some() {
        ctx.log(LogEvent::new(
            "player.update",
            json!({ "playerId": p.player_id, "life": p.life, "name": p.name }),
        ));
    }
    Ok(())
}

pub(super) fn leave(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &PlayerLeave,
) -> Result<(), IntentError> {
    require_self(actor, &p.player_id)?;
    if ctx.doc.player(&p.player_id).is_none() {
        return Err(IntentError::PlayerNotFound(p.player_id.clone()));
    }
    let leaver = &p.player_id;

    // Cards the leaver controls but does not own return to their owners.
    let borrowed: Vec<_> = ctx
        .doc
        .cards()
        .filter(|c| &c.controller_id == leaver && &c.owner_id != leaver)
        .map(|c| c.id.clone())
        .collect();
    for id in borrowed {
        if let Some(card) = ctx.doc.card_mut(&id) {
            card.controller_id = card.owner_id.clone();
        }
    }

    // The leaver's own cards go with them.
    let owned: Vec<_> = ctx
        .doc
        .cards()
        .filter(|c| &c.owner_id == leaver)
        .map(|c| c.id.clone())
        .collect();
    for id in owned {
        ctx.doc.take_card(&id);
        ctx.hidden.face_down_battlefield.remove(&id);
        ctx.hidden.clear_card_reveals(ctx.doc, &id);
    }
    ctx.hidden.remove_player(ctx.doc, leaver);

    let zones: Vec<_> = ctx
        .doc
        .zones_owned_by(leaver)
        .map(|z| z.id.clone())
        .collect();
    for id in zones {
        ctx.doc.remove_zone(&id);
    }

    ctx.doc.remove_player(leaver);
    if !ctx.doc.has_valid_host() {
        ctx.doc.meta.host_id = ctx.doc.first_player().cloned();
    }

    ctx.mark_hidden_changed();
    ctx.log(LogEvent::player_leave(leaver));
    Ok(())
}
