//! Lock classification: recognise tabs and blanks from convexity
//! defects.
//!
//! A tab ("outer lock") protrudes between two consecutive defects; a
//! blank ("inner lock") is carved under a single defect. Both are
//! accepted by comparing the circularity of the enclosed region with a
//! template, see [`CircularityTemplate`].

use serde::{Deserialize, Serialize};

use crate::border::BorderIndex;
use crate::defects::ConvexityDefect;
use crate::region::{
    CircularityTemplate, bounding_box_complement, closed_perimeter, enclosed_area, segment_between,
};
use crate::types::{PipelineError, Point};

/// A tab protruding between two consecutive defects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterLock {
    /// Closed, duplicate-free loop: the border arc between the two
    /// deepest points followed by the chord closing it.
    pub perimeter: Vec<Point>,
    /// Piece points enclosed by the perimeter, perimeter included.
    pub area: Vec<Point>,
    /// The two defects bounding the tab, in clockwise order.
    pub defects: [ConvexityDefect; 2],
}

/// A blank carved under a single defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerLock {
    /// Closed, duplicate-free loop: the border arc between the two neck
    /// points followed by the chord across the neck.
    pub perimeter: Vec<Point>,
    /// Background points enclosed by the perimeter (missing material).
    pub area: Vec<Point>,
    /// The defect the blank sits under.
    pub defect: ConvexityDefect,
}

/// Greedy scan for tabs over the clockwise defect list.
///
/// Pairs `(defects[i - 1], defects[i % n])` for `i` in `1..=n`. An
/// accepted pair consumes both defects and the scan skips ahead by two;
/// a rejected pair advances by one. The wrap-around pair is skipped when
/// its second defect already belongs to a tab. Fewer than two defects
/// cannot form a tab.
///
/// # Errors
///
/// Returns [`PipelineError::PointNotOnBorder`] if a deepest point is not
/// on `border`, or [`PipelineError::NoInteriorSeed`] if a candidate
/// perimeter encloses no piece point.
pub fn detect_outer_locks(
    defects: &[ConvexityDefect],
    border: &[Point],
    points: &[Point],
    template: CircularityTemplate,
) -> Result<Vec<OuterLock>, PipelineError> {
    let n = defects.len();
    if n < 2 {
        return Ok(Vec::new());
    }
    let index = BorderIndex::new(border);
    let mut claimed = vec![false; n];
    let mut locks = Vec::new();

    let mut i = 1;
    while i <= n {
        let (first, second) = (i - 1, i % n);
        if claimed[second] {
            i += 1;
            continue;
        }

        let (one, two) = (&defects[first], &defects[second]);
        let perimeter = closed_perimeter(
            index.arc(one.deepest_point, two.deepest_point)?,
            segment_between(one.deepest_point, two.deepest_point),
        );
        let mut area = enclosed_area(&perimeter, points)?;
        area.extend_from_slice(&perimeter);

        let accepted = template.accepts(area.len(), perimeter.len());
        log::trace!(
            "outer lock candidate {:?} -> {:?}: perimeter {} area {} ratio {}e-5 accepted {accepted}",
            one.deepest_point,
            two.deepest_point,
            perimeter.len(),
            area.len(),
            CircularityTemplate::ratio_units(area.len(), perimeter.len()),
        );

        if accepted {
            claimed[first] = true;
            claimed[second] = true;
            locks.push(OuterLock {
                perimeter,
                area,
                defects: [one.clone(), two.clone()],
            });
            i += 2;
        } else {
            i += 1;
        }
    }

    Ok(locks)
}

/// The defects not consumed by any tab, in their original order.
#[must_use]
pub fn unclaimed_defects(
    defects: &[ConvexityDefect],
    outer_locks: &[OuterLock],
) -> Vec<ConvexityDefect> {
    defects
        .iter()
        .filter(|d| !outer_locks.iter().any(|lock| lock.defects.contains(d)))
        .cloned()
        .collect()
}

/// Test each defect for a blank.
///
/// The perimeter runs between the neck points found by [`neck`] and is
/// flood-filled through the background of the piece's bounding box. A
/// neck that collapses to a single point encloses nothing and is not a
/// blank.
///
/// # Errors
///
/// Returns [`PipelineError::PointNotOnBorder`] if a hull vertex is not on
/// `border`, or [`PipelineError::NoInteriorSeed`] if a neck perimeter
/// encloses no background point.
pub fn detect_inner_locks(
    defects: &[ConvexityDefect],
    border: &[Point],
    points: &[Point],
    template: CircularityTemplate,
) -> Result<Vec<InnerLock>, PipelineError> {
    if defects.is_empty() {
        return Ok(Vec::new());
    }
    let index = BorderIndex::new(border);
    let background = bounding_box_complement(points);
    let mut locks = Vec::new();

    for defect in defects {
        let (neck_a, neck_b) = neck(&index, defect.hull_point_a, defect.hull_point_b)?;
        if neck_a == neck_b {
            log::trace!("inner lock candidate under {:?}: neck collapsed", defect.deepest_point);
            continue;
        }

        let perimeter = closed_perimeter(index.arc(neck_a, neck_b)?, segment_between(neck_a, neck_b));
        let area = enclosed_area(&perimeter, &background)?;

        let accepted = template.accepts(area.len(), perimeter.len());
        log::trace!(
            "inner lock candidate under {:?}: neck {neck_a:?}-{neck_b:?} perimeter {} area {} accepted {accepted}",
            defect.deepest_point,
            perimeter.len(),
            area.len(),
        );

        if accepted {
            locks.push(InnerLock {
                perimeter,
                area,
                defect: defect.clone(),
            });
        }
    }

    Ok(locks)
}

/// Tighten a hull edge to the neck of the indentation beneath it.
///
/// Walks clockwise from `a` while the distance to `b` does not grow and
/// keeps the last point reached; then walks counter-clockwise from `b`
/// toward that point the same way. Each walk is bounded by one lap.
///
/// A walk ends on the closest point itself, one step short of the first
/// point where the distance grows again.
fn neck(index: &BorderIndex<'_>, a: Point, b: Point) -> Result<(Point, Point), PipelineError> {
    let from_a = descend(index, index.position(a)?, b, BorderIndex::next);
    let neck_a = index.at(from_a);
    let from_b = descend(index, index.position(b)?, neck_a, BorderIndex::previous);
    Ok((neck_a, index.at(from_b)))
}

fn descend<'a>(
    index: &BorderIndex<'a>,
    start: usize,
    target: Point,
    step: impl Fn(&BorderIndex<'a>, usize) -> usize,
) -> usize {
    let mut position = start;
    let mut best = index.at(start).distance_squared(target);
    for _ in 0..index.len() {
        let candidate = step(index, position);
        let distance = index.at(candidate).distance_squared(target);
        if distance > best {
            break;
        }
        best = distance;
        position = candidate;
    }
    position
}
