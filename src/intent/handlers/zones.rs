//! Zone management: add and reorder.

use serde_json::json;

use crate::core::{LogEvent, PlayerId, ZoneKind};
use crate::intent::types::{IntentError, ZoneAdd, ZoneReorder};
use crate::perms;

use super::{require_self, Ctx};

pub(super) fn add(ctx: &mut Ctx<'_>, actor: &PlayerId, p: &ZoneAdd) -> Result<(), IntentError> {
    require_self(actor, &p.zone.owner_id)?;
    if ctx.doc.zone(&p.zone.id).is_some() {
        return Err(IntentError::Malformed(format!(
            "zone already exists: {}",
            p.zone.id
        )));
    }

    let mut zone = p.zone.clone();
    // Hidden zones never replicate contents; drop any smuggled list.
    if zone.is_hidden() {
        zone.card_ids.clear();
    }
    ctx.doc.add_zone(zone);
    Ok(())
}

pub(super) fn reorder(
    ctx: &mut Ctx<'_>,
    actor: &PlayerId,
    p: &ZoneReorder,
) -> Result<(), IntentError> {
    let zone = ctx
        .doc
        .zone(&p.zone_id)
        .ok_or_else(|| IntentError::ZoneNotFound(p.zone_id.clone()))?
        .clone();

    if zone.is_hidden() {
        perms::can_view_hidden_zone(actor, &zone)?;
    } else {
        require_self(actor, &zone.owner_id)?;
    }

    let current: &[_] = if zone.is_hidden() {
        ctx.hidden.order(zone.kind, &zone.owner_id)
    } else {
        &zone.card_ids
    };

    let mut want = p.card_ids.clone();
    let mut have = current.to_vec();
    want.sort();
    have.sort();
    if want != have {
        return Err(IntentError::Malformed(
            "reorder must be a permutation of the zone".into(),
        ));
    }

    if zone.is_hidden() {
        if let Some(order) = ctx.hidden.order_mut(zone.kind, &zone.owner_id) {
            *order = p.card_ids.clone();
        }
        if zone.kind == ZoneKind::Library {
            ctx.hidden
                .sync_library_reveals_to_all(ctx.doc, &zone.owner_id);
        }
        ctx.mark_hidden_changed();
    } else if let Some(zone) = ctx.doc.zone_mut(&p.zone_id) {
        zone.card_ids = p.card_ids.clone();
    }

    ctx.log(LogEvent::new(
        "zone.reorder",
        json!({ "playerId": actor, "zoneId": p.zone_id, "zone": zone.kind }),
    ));
    Ok(())
}
