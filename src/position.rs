//! Battlefield placement and collision avoidance.
//!
//! Positions are normalized to the unit square so every client can map
//! them onto its own viewport. A card dropped onto an occupied spot is
//! bumped to the nearest free spot by a deterministic scan: step right by
//! one grid step, wrap to the next row, give up after a bounded number of
//! attempts and accept the overlap.
//!
//! Group moves keep the cards' relative offsets: the whole group is
//! shifted together until every member lands on a free spot.

use crate::core::Position;

/// Two positions closer than this on both axes collide.
pub const OVERLAP_EPSILON: f32 = 0.01;

/// Horizontal and vertical step used when bumping a colliding card.
pub const GRID_STEP: f32 = 0.04;

/// Upper bound on bump attempts before accepting an overlap.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 512;

/// Default drop position when the client supplied none.
pub const DEFAULT_DROP: Position = Position { x: 0.1, y: 0.1 };

/// Whether `pos` collides with any occupied position.
#[must_use]
pub fn is_occupied(pos: Position, occupied: &[Position]) -> bool {
    occupied.iter().any(|o| {
        (o.x - pos.x).abs() < OVERLAP_EPSILON && (o.y - pos.y).abs() < OVERLAP_EPSILON
    })
}

/// Resolve a single card's position against the occupied set.
///
/// Returns `desired` unchanged when free; otherwise the first free spot in
/// the deterministic scan order.
#[must_use]
pub fn resolve(desired: Position, occupied: &[Position]) -> Position {
    let mut candidate = Position::new(desired.x, desired.y);
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        if !is_occupied(candidate, occupied) {
            return candidate;
        }
        candidate = bump(candidate);
    }
    candidate
}

/// Resolve a group of positions, preserving their relative offsets.
///
/// The group is translated as a unit; each shift is the same scan used for
/// single cards, applied to the group's anchor (its first member).
#[must_use]
pub fn resolve_group(desired: &[Position], occupied: &[Position]) -> Vec<Position> {
    let Some(&anchor) = desired.first() else {
        return Vec::new();
    };

    let offsets: Vec<(f32, f32)> = desired
        .iter()
        .map(|p| (p.x - anchor.x, p.y - anchor.y))
        .collect();

    let mut candidate = anchor;
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let placed: Vec<Position> = offsets
            .iter()
            .map(|(dx, dy)| Position::new(candidate.x + dx, candidate.y + dy))
            .collect();

        if placed.iter().all(|p| !is_occupied(*p, occupied)) {
            return placed;
        }
        candidate = bump(candidate);
    }

    offsets
        .iter()
        .map(|(dx, dy)| Position::new(candidate.x + dx, candidate.y + dy))
        .collect()
}

/// One deterministic scan step: right by a grid step, wrapping to the next
/// row at the right edge, wrapping to the origin at the bottom.
fn bump(pos: Position) -> Position {
    let mut x = pos.x + GRID_STEP;
    let mut y = pos.y;
    if x > 1.0 {
        x = 0.0;
        y += GRID_STEP;
    }
    if y > 1.0 {
        y = 0.0;
    }
    Position::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_position_untouched() {
        let desired = Position::new(0.5, 0.5);
        let resolved = resolve(desired, &[Position::new(0.1, 0.1)]);
        assert_eq!(resolved, desired);
    }

    #[test]
    fn test_collision_bumps_right() {
        let taken = Position::new(0.5, 0.5);
        let resolved = resolve(taken, &[taken]);

        assert_ne!(resolved, taken);
        assert!(!is_occupied(resolved, &[taken]));
        assert!((resolved.x - (0.5 + GRID_STEP)).abs() < 1e-6);
    }

    #[test]
    fn test_bump_is_deterministic() {
        let taken = vec![Position::new(0.5, 0.5), Position::new(0.5 + GRID_STEP, 0.5)];
        let a = resolve(Position::new(0.5, 0.5), &taken);
        let b = resolve(Position::new(0.5, 0.5), &taken);
        assert_eq!(a, b);
    }

    #[test]
    fn test_wraps_at_right_edge() {
        let taken = Position::new(0.99, 0.2);
        let resolved = resolve(taken, &[taken]);

        // Wrapped to the next row.
        assert!(resolved.x < 0.1);
        assert!(resolved.y > 0.2);
    }

    #[test]
    fn test_dense_field_eventually_places() {
        // Occupy a full row around the drop point.
        let occupied: Vec<Position> = (0..26)
            .map(|i| Position::new(i as f32 * GRID_STEP, 0.5))
            .collect();

        let resolved = resolve(Position::new(0.5, 0.5), &occupied);
        assert!(!is_occupied(resolved, &occupied));
    }

    #[test]
    fn test_group_keeps_offsets() {
        let group = vec![Position::new(0.3, 0.3), Position::new(0.34, 0.3)];
        let occupied = vec![Position::new(0.3, 0.3)];

        let placed = resolve_group(&group, &occupied);

        assert_eq!(placed.len(), 2);
        assert!((placed[1].x - placed[0].x - 0.04).abs() < 1e-6);
        assert!((placed[1].y - placed[0].y).abs() < 1e-6);
        for p in &placed {
            assert!(!is_occupied(*p, &occupied));
        }
    }

    #[test]
    fn test_empty_group() {
        assert!(resolve_group(&[], &[]).is_empty());
    }
}
