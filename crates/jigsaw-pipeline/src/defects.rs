//! Convexity defects: where the border falls inward from the hull.
//!
//! For every hull edge the border run strictly between its two vertices
//! is scanned for the point farthest from the edge's line. Shallow
//! defects are noise and are dropped.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::border::BorderIndex;
use crate::types::{PipelineError, Point};

/// A hull edge together with the deepest border point beneath it.
///
/// Two defects are equal when their hull vertices and deepest point
/// match, regardless of the contained run or the depth value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvexityDefect {
    /// Hull vertex where the edge starts (clockwise).
    pub hull_point_a: Point,
    /// Hull vertex where the edge ends.
    pub hull_point_b: Point,
    /// Border points strictly between the two vertices, clockwise.
    pub contained_points: Vec<Point>,
    /// The contained point farthest from the line through the vertices.
    pub deepest_point: Point,
    /// Perpendicular distance of `deepest_point` from that line.
    pub depth: f64,
}

impl PartialEq for ConvexityDefect {
    fn eq(&self, other: &Self) -> bool {
        self.hull_point_a == other.hull_point_a
            && self.hull_point_b == other.hull_point_b
            && self.deepest_point == other.deepest_point
    }
}

impl Eq for ConvexityDefect {}

impl Hash for ConvexityDefect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hull_point_a.hash(state);
        self.hull_point_b.hash(state);
        self.deepest_point.hash(state);
    }
}

/// Detect defects deeper than `min_depth` along every hull edge,
/// including the edge closing the hull.
///
/// Edges that coincide with the border contain no points and yield no
/// defect. Survivors are ordered by the border position of
/// `hull_point_a`.
///
/// # Errors
///
/// Returns [`PipelineError::PointNotOnBorder`] if a hull vertex is not a
/// border point.
pub fn convexity_defects(
    border: &[Point],
    hull: &[Point],
    min_depth: f64,
) -> Result<Vec<ConvexityDefect>, PipelineError> {
    if hull.len() < 2 {
        return Ok(Vec::new());
    }
    let index = BorderIndex::new(border);

    let mut found = Vec::new();
    for (i, &a) in hull.iter().enumerate() {
        let b = hull[(i + 1) % hull.len()];
        let from = index.position(a)?;
        let to = index.position(b)?;
        let contained = index.between(from, to);

        let Some((deepest_point, depth)) = deepest(&contained, a, b) else {
            continue;
        };
        if depth > min_depth {
            found.push((
                from,
                ConvexityDefect {
                    hull_point_a: a,
                    hull_point_b: b,
                    contained_points: contained,
                    deepest_point,
                    depth,
                },
            ));
        }
    }

    found.sort_by_key(|&(position, _)| position);
    Ok(found.into_iter().map(|(_, defect)| defect).collect())
}

/// First point of maximum distance from the line `a`-`b`.
fn deepest(run: &[Point], a: Point, b: Point) -> Option<(Point, f64)> {
    run.iter()
        .map(|&p| (p, perpendicular_distance(p, a, b)))
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let length_sq = a.distance_squared(b);
    if length_sq == 0 {
        return p.distance(a);
    }
    let dx = i64::from(b.x) - i64::from(a.x);
    let dy = i64::from(b.y) - i64::from(a.y);
    let cross = dx * (i64::from(p.y) - i64::from(a.y)) - dy * (i64::from(p.x) - i64::from(a.x));
    cross.abs() as f64 / (length_sq as f64).sqrt()
}
