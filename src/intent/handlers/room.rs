//! Room-level handlers: lock, battlefield scale, global counters, rolls.

use serde_json::json;

use crate::core::{LogEvent, PlayerId};
use crate::intent::types::{
    BattlefieldScale, CoinFlip, DiceRoll, GlobalCounterAdd, IntentError, RoomLock,
};
use crate::perms;

use super::Ctx;

/// Cap on one coin-flip or dice-roll batch.
const MAX_ROLLS: usize = 20;

const MIN_SCALE: f32 = 0.25;
const MAX_SCALE: f32 = 4.0;

fn require_player(ctx: &Ctx<'_>, actor: &PlayerId) -> Result<(), IntentError> {
    if ctx.doc.player(actor).is_some() {
        Ok(())
    } else {
        Err(IntentError::PlayerNotFound(actor.clone()))
    }
}

pub(super) fn lock(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &RoomLock) -> Result<(), IntentError> {
    require_player(ctx, actor)?;
    perms::can_lock_room(actor, ctx.doc.meta.host_id.as_ref())?;

    ctx.doc.meta.locked = p.locked;
    ctx.log(LogEvent::new(
        "room.lock",
        json!({ "playerId": actor, "locked": p.locked }),
    ));
    Ok(())
}

pub(super) fn scale(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &BattlefieldScale,
) -> Result<(), IntentError> {
    require_player(ctx, actor)?;
    if !p.scale.is_finite() {
        return Err(IntentError::Malformed("scale must be finite".into()));
    }

    ctx.doc.meta.battlefield_scale = p.scale.clamp(MIN_SCALE, MAX_SCALE);
    Ok(())
}

pub(super) fn global_counter(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &GlobalCounterAdd,
) -> Result<(), IntentError> {
    require_player(ctx, actor)?;
    if p.name.is_empty() {
        return Err(IntentError::Malformed("counter name is empty".into()));
    }

    let value = ctx.doc.meta.global_counters.get(&p.name).copied().unwrap_or(0) + p.delta;
    ctx.doc.meta.global_counters.insert(p.name.clone(), value);

    ctx.log(LogEvent::new(
        "counter.global",
        json!({ "playerId": actor, "name": p.name, "value": value }),
    ));
    Ok(())
}

pub(super) fn coin_flip(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &CoinFlip) -> Result<(), IntentError> {
    require_player(ctx, actor)?;

    let count = p.count.unwrap_or(1).clamp(1, MAX_ROLLS);
    let results: Vec<bool> = (0..count).map(|_| ctx.rng.coin_flip()).collect();

    ctx.log(LogEvent::coin_flip(actor, &results));
    Ok(())
}

pub(super) fn dice_roll(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &DiceRoll) -> Result<(), IntentError> {
    require_player(ctx, actor)?;
    if p.sides == 0 {
        return Err(IntentError::Malformed("dice need at least one side".into()));
    }

    let count = p.count.unwrap_or(1).clamp(1, MAX_ROLLS);
    let results: Vec<u32> = (0..count).map(|_| ctx.rng.roll_die(p.sides)).collect();

    ctx.log(LogEvent::dice_roll(actor, p.sides, &results));
    Ok(())
}
