//! Size-bounded chunking of the hidden card map.
//!
//! Storage backends cap the size of a single record, so the hidden card
//! map is split into chunks whose serialized size stays below the ceiling.
//! Cards are ordered by id so the same map always chunks the same way.

use rustc_hash::FxHashMap;

use crate::core::{Card, CardId};

/// Per-chunk serialized size ceiling in bytes.
pub const MAX_CHUNK_BYTES: usize = 120_000;

/// Fixed framing allowance per chunk (length prefix and slack).
const CHUNK_OVERHEAD: usize = 16;

/// Split the hidden card map into chunks, each serializing to at most
/// `max_bytes`.
///
/// A single card larger than the ceiling still becomes its own chunk;
/// cards are indivisible.
#[must_use]
pub fn chunk_hidden_cards(cards: &FxHashMap<CardId, Card>, max_bytes: usize) -> Vec<Vec<Card>> {
    let mut sorted: Vec<&Card> = cards.values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut chunks: Vec<Vec<Card>> = Vec::new();
    let mut current: Vec<Card> = Vec::new();
    let mut current_bytes = CHUNK_OVERHEAD;

    for card in sorted {
        let card_bytes = bincode::serialized_size(card).map_or(max_bytes, |n| n as usize);

        if !current.is_empty() && current_bytes + card_bytes > max_bytes {
            chunks.push(std::mem::take(&mut current));
            current_bytes = CHUNK_OVERHEAD;
        }

        current_bytes += card_bytes;
        current.push(card.clone());
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
