//! Per-connection overlay diffing.
//!
//! Each connection keeps a content hash per card id and per zone-order
//! list plus a monotonically increasing overlay version. On every rebuild
//! the tracker computes upserts and removals against the last-sent state
//! and chooses between a full snapshot and a diff: whenever the encoded
//! diff exceeds an absolute byte cap or a fixed fraction of the encoded
//! snapshot, the snapshot wins. Diffs therefore never cost more
//! bandwidth than a periodic resync.

use std::collections::BTreeMap;
use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::core::{CardId, CardLite, PlayerId, RoomId, ZoneId};

use super::builder::{OverlayView, Viewer, ViewerRole};

/// Overlay wire schema version.
pub const OVERLAY_SCHEMA_VERSION: u32 = 1;

/// Absolute cap on an encoded diff before upgrading to a snapshot.
pub const MAX_DIFF_BYTES: usize = 32 * 1024;

/// A diff larger than this fraction of the snapshot is not worth sending.
pub const MAX_DIFF_FRACTION: f64 = 0.5;

/// Extra context sent with every overlay message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayMeta {
    pub role: ViewerRole,
}

/// Full per-viewer overlay state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshotPayload {
    pub schema_version: u32,
    pub overlay_version: u64,
    pub room_id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<PlayerId>,
    pub cards: Vec<CardLite>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zone_card_orders: BTreeMap<ZoneId, Vec<CardId>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zone_card_order_versions: BTreeMap<ZoneId, u64>,
    pub meta: OverlayMeta,
}

/// Incremental update against a prior overlay version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDiffPayload {
    pub schema_version: u32,
    pub overlay_version: u64,
    pub base_overlay_version: u64,
    pub upserts: Vec<CardLite>,
    pub removes: Vec<CardId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zone_card_orders: BTreeMap<ZoneId, Vec<CardId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zone_order_removals: Vec<ZoneId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zone_card_order_versions: BTreeMap<ZoneId, u64>,
    pub meta: OverlayMeta,
}

/// One outbound overlay message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OverlayMessage {
    #[serde(rename = "privateOverlay")]
    Snapshot(OverlaySnapshotPayload),
    #[serde(rename = "privateOverlayDiff")]
    Diff(OverlayDiffPayload),
}

impl OverlayMessage {
    /// The overlay version this message advances the connection to.
    #[must_use]
    pub fn overlay_version(&self) -> u64 {
        match self {
            OverlayMessage::Snapshot(p) => p.overlay_version,
            OverlayMessage::Diff(p) => p.overlay_version,
        }
    }
}

/// Tracks what one connection last received.
#[derive(Clone, Debug)]
pub struct OverlayTracker {
    room_id: RoomId,
    viewer: Viewer,
    overlay_version: u64,
    card_hashes: FxHashMap<CardId, u64>,
    order_hashes: FxHashMap<ZoneId, u64>,
    order_versions: FxHashMap<ZoneId, u64>,
    primed: bool,
}

impl OverlayTracker {
    /// A fresh tracker; the first message is always a full snapshot.
    #[must_use]
    pub fn new(room_id: RoomId, viewer: Viewer) -> Self {
        Self {
            room_id,
            viewer,
            overlay_version: 0,
            card_hashes: FxHashMap::default(),
            order_hashes: FxHashMap::default(),
            order_versions: FxHashMap::default(),
            primed: false,
        }
    }

    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Produce the next message for this connection given a fresh view.
    pub fn message_for(&mut self, view: &OverlayView) -> OverlayMessage {
        self.overlay_version += 1;
        let base_version = self.overlay_version - 1;

        let new_card_hashes: FxHashMap<CardId, u64> = view
            .cards
            .iter()
            .map(|c| (c.id.clone(), hash_card(c)))
            .collect();

        let upserts: Vec<CardLite> = view
            .cards
            .iter()
            .filter(|c| self.card_hashes.get(&c.id) != new_card_hashes.get(&c.id))
            .cloned()
            .collect();
        let removes: Vec<CardId> = self
            .card_hashes
            .keys()
            .filter(|id| !new_card_hashes.contains_key(*id))
            .cloned()
            .collect();

        let mut changed_orders: BTreeMap<ZoneId, Vec<CardId>> = BTreeMap::new();
        let mut new_order_hashes: FxHashMap<ZoneId, u64> = FxHashMap::default();
        for (zone_id, order) in &view.zone_orders {
            let hash = hash_order(order);
            new_order_hashes.insert(zone_id.clone(), hash);
            if self.order_hashes.get(zone_id) != Some(&hash) {
                changed_orders.insert(zone_id.clone(), order.clone());
                *self.order_versions.entry(zone_id.clone()).or_insert(0) += 1;
            }
        }
        let order_removals: Vec<ZoneId> = self
            .order_hashes
            .keys()
            .filter(|z| !new_order_hashes.contains_key(*z))
            .cloned()
            .collect();
        for zone_id in &order_removals {
            self.order_versions.remove(zone_id);
        }

        let all_versions: BTreeMap<ZoneId, u64> = self
            .order_versions
            .iter()
            .map(|(z, v)| (z.clone(), *v))
            .collect();
        let changed_versions: BTreeMap<ZoneId, u64> = changed_orders
            .keys()
            .filter_map(|z| self.order_versions.get(z).map(|v| (z.clone(), *v)))
            .collect();

        let meta = OverlayMeta {
            role: self.viewer.role,
        };

        let snapshot = OverlaySnapshotPayload {
            schema_version: OVERLAY_SCHEMA_VERSION,
            overlay_version: self.overlay_version,
            room_id: self.room_id.clone(),
            viewer_id: self.viewer.id.clone(),
            cards: view.cards.clone(),
            zone_card_orders: view
                .zone_orders
                .iter()
                .cloned()
                .collect(),
            zone_card_order_versions: all_versions,
            meta: meta.clone(),
        };

        let message = if self.primed {
            let diff = OverlayDiffPayload {
                schema_version: OVERLAY_SCHEMA_VERSION,
                overlay_version: self.overlay_version,
                base_overlay_version: base_version,
                upserts,
                removes,
                zone_card_orders: changed_orders,
                zone_order_removals: order_removals,
                zone_card_order_versions: changed_versions,
                meta,
            };
            if diff_is_affordable(&diff, &snapshot) {
                OverlayMessage::Diff(diff)
            } else {
                OverlayMessage::Snapshot(snapshot)
            }
        } else {
            OverlayMessage::Snapshot(snapshot)
        };

        self.card_hashes = new_card_hashes;
        self.order_hashes = new_order_hashes;
        self.primed = true;
        message
    }
}

/// A diff is worth sending only when it beats the snapshot by enough.
fn diff_is_affordable(diff: &OverlayDiffPayload, snapshot: &OverlaySnapshotPayload) -> bool {
    let diff_bytes = encoded_len(diff);
    if diff_bytes > MAX_DIFF_BYTES {
        return false;
    }
    let snapshot_bytes = encoded_len(snapshot);
    (diff_bytes as f64) <= (snapshot_bytes as f64) * MAX_DIFF_FRACTION
}

fn encoded_len<T: Serialize>(value: &T) -> usize {
    serde_json::to_vec(value).map_or(usize::MAX, |v| v.len())
}

fn hash_card(card: &CardLite) -> u64 {
    hash_bytes(&bincode::serialize(card).unwrap_or_default())
}

fn hash_order(order: &[CardId]) -> u64 {
    let mut hasher = FxHasher::default();
    for id in order {
        hasher.write(id.as_str().as_bytes());
        hasher.write_u8(0);
    }
    hasher.finish()
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}
