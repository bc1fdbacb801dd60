//! Pure card-record transforms.
//!
//! Everything here mutates or builds a single card record with no access
//! to the document or hidden state; the movement machine and the intent
//! handlers compose these into full operations.

use rustc_hash::FxHashMap;

use crate::core::{Card, CardFace, CardId, CardLite, FaceDownMode, Position};

/// Turn a battlefield card face down, remembering why.
pub fn set_face_down(card: &mut Card, mode: Option<FaceDownMode>) {
    card.face_down = true;
    card.face_down_mode = mode.or(Some(FaceDownMode::Manual));
}

/// Turn a card face up again.
pub fn set_face_up(card: &mut Card) {
    card.face_down = false;
    card.face_down_mode = None;
}

/// Show a specific face (double-faced and flip cards).
///
/// Out-of-range indexes are ignored.
pub fn show_face(card: &mut Card, face_index: usize) {
    if face_index < card.faces.len() {
        card.face_index = face_index;
    }
}

/// Reset a card to its front face, face up.
///
/// Applied whenever a card leaves a battlefield.
pub fn reset_to_front(card: &mut Card) {
    card.face_index = 0;
    set_face_up(card);
    card.power = None;
    card.toughness = None;
}

/// Clear battlefield-only display state (tap, rotation, placement).
pub fn clear_battlefield_state(card: &mut Card) {
    card.tapped = false;
    card.rotation = 0;
    card.position = None;
}

/// Strip a card's identity out of the public record, returning the
/// identity snapshot to park in the hidden state.
///
/// The public record keeps placement and ownership but shows a blank
/// face, so replicating it leaks nothing.
pub fn strip_identity(card: &mut Card) -> CardLite {
    let snapshot = card.lite();
    card.faces = vec![CardFace::default()];
    card.face_index = 0;
    card.power = None;
    card.toughness = None;
    snapshot
}

/// Restore a previously stripped identity onto the public record.
pub fn restore_identity(card: &mut Card, snapshot: &CardLite) {
    card.faces = snapshot.faces.clone();
    card.face_index = snapshot.face_index;
    card.power = snapshot.power.clone();
    card.toughness = snapshot.toughness.clone();
}

/// Merge counters from `src` into `dst`, summing shared names.
pub fn merge_counters(dst: &mut FxHashMap<String, i32>, src: &FxHashMap<String, i32>) {
    for (name, value) in src {
        *dst.entry(name.clone()).or_insert(0) += value;
    }
}

/// Adjust one named counter by delta, removing it at zero or below.
pub fn adjust_counter(counters: &mut FxHashMap<String, i32>, name: &str, delta: i32) {
    let value = counters.get(name).copied().unwrap_or(0) + delta;
    if value <= 0 {
        counters.remove(name);
    } else {
        counters.insert(name.to_string(), value);
    }
}

/// Build a token copy of a card.
///
/// The copy gets its own counter map, so post-duplication counters are
/// independently mutable. Placement is offset from the source so copies
/// fan out instead of stacking.
#[must_use]
pub fn duplicate_token(source: &Card, new_id: CardId, copy_number: usize) -> Card {
    let mut token = source.clone();
    token.id = new_id;
    token.is_token = true;
    token.is_commander = false;
    token.commander_tax = 0;
    token.face_down = false;
    token.face_down_mode = None;
    token.known_to_all = true;
    token.revealed_to_all = false;
    token.revealed_to.clear();
    token.counters = source.counters.clone();
    token.position = source.position.map(|p| {
        let step = 0.02 * copy_number as f32;
        Position::new(p.x + step, p.y + step)
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlayerId, ZoneId};

    fn card() -> Card {
        let mut faces = vec![CardFace::named("Delver of Secrets")];
        faces.push(CardFace::named("Insectile Aberration"));
        Card::new(
            CardId::new("c1"),
            PlayerId::new("p1"),
            ZoneId::new("bf-p1"),
            faces,
        )
    }

    #[test]
    fn test_face_down_round_trip() {
        let mut c = card();
        set_face_down(&mut c, None);
        assert!(c.face_down);
        assert_eq!(c.face_down_mode, Some(FaceDownMode::Manual));

        set_face_up(&mut c);
        assert!(!c.face_down);
        assert!(c.face_down_mode.is_none());
    }

    #[test]
    fn test_show_face_bounds() {
        let mut c = card();
        show_face(&mut c, 1);
        assert_eq!(c.face_index, 1);
        assert_eq!(c.name(), "Insectile Aberration");

        show_face(&mut c, 5);
        assert_eq!(c.face_index, 1);
    }

    #[test]
    fn test_reset_to_front() {
        let mut c = card();
        c.face_index = 1;
        c.power = Some("3".into());
        set_face_down(&mut c, Some(FaceDownMode::Morph));

        reset_to_front(&mut c);

        assert_eq!(c.face_index, 0);
        assert!(!c.face_down);
        assert!(c.power.is_none());
    }

    #[test]
    fn test_strip_and_restore_identity() {
        let mut c = card();
        c.face_index = 1;

        let snapshot = strip_identity(&mut c);

        assert_eq!(c.name(), "");
        assert_eq!(c.faces.len(), 1);
        assert_eq!(snapshot.name(), "Insectile Aberration");

        restore_identity(&mut c, &snapshot);
        assert_eq!(c.name(), "Insectile Aberration");
        assert_eq!(c.faces.len(), 2);
    }

    #[test]
    fn test_merge_counters() {
        let mut dst = FxHashMap::default();
        dst.insert("+1/+1".to_string(), 2);

        let mut src = FxHashMap::default();
        src.insert("+1/+1".to_string(), 1);
        src.insert("charge".to_string(), 3);

        merge_counters(&mut dst, &src);

        assert_eq!(dst.get("+1/+1"), Some(&3));
        assert_eq!(dst.get("charge"), Some(&3));
    }

    #[test]
    fn test_adjust_counter_removes_at_zero() {
        let mut counters = FxHashMap::default();
        adjust_counter(&mut counters, "loyalty", 4);
        assert_eq!(counters.get("loyalty"), Some(&4));

        adjust_counter(&mut counters, "loyalty", -4);
        assert!(counters.is_empty());
    }

    #[test]
    fn test_duplicate_token_counters_independent() {
        let mut c = card();
        c.counters.insert("+1/+1".to_string(), 2);
        c.position = Some(Position::new(0.5, 0.5));

        let mut token = duplicate_token(&c, CardId::new("t1"), 1);

        assert!(token.is_token);
        assert!(token.known_to_all);
        assert_eq!(token.counters.get("+1/+1"), Some(&2));

        // Mutating the copy leaves the source untouched.
        adjust_counter(&mut token.counters, "+1/+1", -2);
        assert_eq!(c.counters.get("+1/+1"), Some(&2));
        assert!(token.counters.get("+1/+1").is_none());

        // Fanned out, not stacked.
        assert_ne!(token.position, c.position);
    }
}
