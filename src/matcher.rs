//! Geometric-proximity duplicate predicate over two code positions

use crate::models::{CodePosition, Point};

/// Squared pixel tolerance for corner proximity (5 px per axis).
///
/// Deliberately fixed and scale-independent: a known heuristic
/// approximation, not proportional to code size.
pub const MATCH_TOLERANCE_SQ: u64 = 25;

/// Whether two positions describe the same physical code.
///
/// True iff either diagonal corner pairing matches within tolerance:
/// bottom-left with top-right, or top-left with bottom-right. Checking both
/// pairings tolerates the two backends reporting different starting corners
/// or winding for the same quadrilateral. Idempotent and symmetric.
pub fn is_duplicate(a: &CodePosition, b: &CodePosition) -> bool {
    if within_tolerance(a.bottom_left, b.bottom_left) && within_tolerance(a.top_right, b.top_right)
    {
        return true;
    }
    within_tolerance(a.top_left, b.top_left) && within_tolerance(a.bottom_right, b.bottom_right)
}

fn within_tolerance(p: Point, q: Point) -> bool {
    p.distance_squared(&q) <= MATCH_TOLERANCE_SQ
}
