//! Convex hull of an ordered border (Andrew's monotone chain).

use crate::contour::sort_clockwise;
use crate::types::Point;

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (i64::from(a.x) - i64::from(o.x)) * (i64::from(b.y) - i64::from(o.y))
        - (i64::from(a.y) - i64::from(o.y)) * (i64::from(b.x) - i64::from(o.x))
}

/// Monotone-chain convex hull, oriented clockwise.
///
/// Points are sorted by `(x, y)`; each chain pops its last point while
/// the last three do not turn strictly left (cross product <= 0), so
/// collinear points are never hull vertices. Inputs of zero or one point
/// are returned unchanged.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_unstable();

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    // Each chain ends where the other begins.
    lower.pop();
    upper.pop();
    lower.extend(upper);

    sort_clockwise(lower)
}
