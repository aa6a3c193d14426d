//! Contour tracing: order a piece's border points into one closed loop.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime, plus the [`sort_clockwise`] orientation normalisation shared
//! by the border and the convex hull.
//!
//! # Strategy pattern
//!
//! The tracer only has to produce *a* loop through the border; the
//! orientation is fixed afterwards. New tracers can be added as enum
//! variants without changing [`PipelineConfig`](crate::PipelineConfig).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::point_set::PointSet;
use crate::types::{PipelineError, Point};

/// Neighbour search order: up, up-left, left, down-left, down,
/// down-right, right, up-right (`y` grows downward).
const NEIGHBOR_PRIORITY: [(i32, i32); 8] = [
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
];

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Depth-first walk over 8-connected border points with an explicit
    /// backtrack stack.
    ///
    /// Dead-end points (spurs one pixel wide) are popped off the stack
    /// and do not appear in the traced loop, nor do corner pixels the
    /// walk cuts across diagonally.
    #[default]
    Backtracking,
}

impl std::fmt::Display for ContourTracerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backtracking => f.write_str("backtracking"),
        }
    }
}

/// Trait for contour tracing strategies.
///
/// Input: the unordered border points of one piece.
/// Output: the points in walk order, not yet oriented.
pub trait ContourTracer {
    /// Trace a loop through `border`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DisconnectedBorder`] when the border
    /// cannot be covered by a single walk.
    fn trace(&self, border: &[Point]) -> Result<Vec<Point>, PipelineError>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, border: &[Point]) -> Result<Vec<Point>, PipelineError> {
        match *self {
            Self::Backtracking => trace_backtracking(border),
        }
    }
}

/// Depth-first trace starting at `border[0]`.
///
/// A dead end next to the start closes the loop once every point still
/// unvisited touches the path. Those are corner pixels a diagonal step
/// cut across, and they are left out. Any other dead end is a spur: it
/// is popped and the walk resumes from the point before it.
fn trace_backtracking(border: &[Point]) -> Result<Vec<Point>, PipelineError> {
    let Some(&start) = border.first() else {
        return Ok(Vec::new());
    };

    let mut unvisited: PointSet = border.iter().copied().collect();
    let total = unvisited.len();
    unvisited.remove(start);
    let mut visited = 1;
    let mut path = vec![start];

    while visited < total {
        let Some(&top) = path.last() else {
            return Err(PipelineError::DisconnectedBorder { visited, total });
        };
        if let Some(next) = next_unvisited(&unvisited, top) {
            unvisited.remove(next);
            visited += 1;
            path.push(next);
        } else if path.len() > 2
            && top.touches(start)
            && only_cut_corners_left(border, &unvisited, &path)
        {
            break;
        } else {
            path.pop();
        }
    }

    Ok(path)
}

/// Whether every unvisited border point is 8-adjacent to the path.
fn only_cut_corners_left(border: &[Point], unvisited: &PointSet, path: &[Point]) -> bool {
    let on_path: PointSet = path.iter().copied().collect();
    border
        .iter()
        .filter(|&&p| unvisited.contains(p))
        .all(|&p| {
            NEIGHBOR_PRIORITY
                .iter()
                .any(|&(dx, dy)| on_path.contains(p.offset(dx, dy)))
        })
}

fn next_unvisited(unvisited: &PointSet, from: Point) -> Option<Point> {
    NEIGHBOR_PRIORITY
        .iter()
        .map(|&(dx, dy)| from.offset(dx, dy))
        .find(|&p| unvisited.contains(p))
}

/// Return `points` in clockwise (on-screen) order, reversing if needed.
///
/// Idempotent: a list this returns is returned unchanged.
#[must_use = "returns the oriented list"]
pub fn sort_clockwise(mut points: Vec<Point>) -> Vec<Point> {
    if !is_clockwise(&points) {
        points.reverse();
    }
    points
}

/// Landmark orientation test.
///
/// The extremes min-y, max-x, max-y, min-x (first occurrence in list
/// order) are coded 0, 1, 2, 3; a point matching several extremes takes
/// the first code in that order. Walking the list cyclically, the signs
/// of `code[i] - code[i + 1]` are summed: negative means clockwise,
/// positive counter-clockwise. A zero sum is undecided and falls back to
/// the sign of the shoelace area, where a positive area is clockwise in
/// image coordinates and a zero area counts as clockwise. A plain
/// landmark test would reverse every zero-sum list, so a list and its
/// reverse could not both come back unchanged.
#[must_use]
pub fn is_clockwise(points: &[Point]) -> bool {
    let Some(landmarks) = Landmarks::of(points) else {
        return true;
    };

    let codes: Vec<u8> = points.iter().filter_map(|&p| landmarks.code(p)).collect();
    let turn: i32 = codes
        .iter()
        .zip(codes.iter().cycle().skip(1))
        .map(|(a, b)| match a.cmp(b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
        .sum();

    match turn.cmp(&0) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => doubled_signed_area(points) >= 0,
    }
}

/// Twice the shoelace area; positive for clockwise loops when `y` grows
/// downward.
pub(crate) fn doubled_signed_area(points: &[Point]) -> i64 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum()
}

struct Landmarks {
    min_y: Point,
    max_x: Point,
    max_y: Point,
    min_x: Point,
}

impl Landmarks {
    fn of(points: &[Point]) -> Option<Self> {
        Some(Self {
            min_y: first_extreme(points, |p, best| p.y < best.y)?,
            max_x: first_extreme(points, |p, best| p.x > best.x)?,
            max_y: first_extreme(points, |p, best| p.y > best.y)?,
            min_x: first_extreme(points, |p, best| p.x < best.x)?,
        })
    }

    fn code(&self, p: Point) -> Option<u8> {
        if p == self.min_y {
            Some(0)
        } else if p == self.max_x {
            Some(1)
        } else if p == self.max_y {
            Some(2)
        } else if p == self.min_x {
            Some(3)
        } else {
            None
        }
    }
}

/// The first point for which no later point is strictly `better`.
fn first_extreme(points: &[Point], better: impl Fn(Point, Point) -> bool) -> Option<Point> {
    points
        .iter()
        .copied()
        .reduce(|best, p| if better(p, best) { p } else { best })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::point_set::border_points;

    fn filled(width: i32, height: i32) -> Vec<Point> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| Point::new(x, y)))
            .collect()
    }

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn default_is_backtracking() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::Backtracking
        );
    }

    #[test]
    fn empty_border_traces_to_empty() {
        let traced = ContourTracerKind::Backtracking.trace(&[]).unwrap();
        assert!(traced.is_empty());
    }

    #[test]
    fn square_ring_is_walked_down_the_left_side_first() {
        let border = border_points(&filled(5, 5));
        let traced = ContourTracerKind::Backtracking.trace(&border).unwrap();
        assert_eq!(traced.len(), 16);
        assert_eq!(
            &traced[..6],
            pts(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (1, 4)]).as_slice()
        );
        assert_eq!(traced.last(), Some(&Point::new(1, 0)));
    }

    #[test]
    fn dead_end_spur_is_dropped() {
        let mut points = filled(10, 10);
        points.push(Point::new(5, -1));
        points.push(Point::new(5, -2));
        let border = border_points(&points);
        assert_eq!(border.len(), 37);

        let traced = ContourTracerKind::Backtracking.trace(&border).unwrap();
        assert_eq!(traced.len(), 36);
        assert!(traced.contains(&Point::new(5, -1)));
        assert!(!traced.contains(&Point::new(5, -2)));
    }

    #[test]
    fn staircase_side_is_kept_when_a_corner_is_cut() {
        // Rows shift right every second row, so the walk up the right
        // side steps diagonally past (9, 4).
        let points: Vec<Point> = (0..5)
            .flat_map(|y| (y / 2..y / 2 + 8).map(move |x| Point::new(x, y)))
            .collect();
        let border = border_points(&points);
        assert_eq!(border.len(), 22);

        let traced = ContourTracerKind::Backtracking.trace(&border).unwrap();
        assert_eq!(traced.len(), 21);
        assert!(!traced.contains(&Point::new(9, 4)));
        assert!(traced[0].touches(traced[traced.len() - 1]));
        assert!(traced.windows(2).all(|pair| pair[0].touches(pair[1])));
        assert_eq!(
            &traced[traced.len() - 3..],
            pts(&[(3, 0), (2, 0), (1, 0)]).as_slice()
        );
    }

    #[test]
    fn disconnected_border_is_an_error() {
        let ring = |ox: i32| {
            filled(3, 3)
                .into_iter()
                .filter(|&p| p != Point::new(1, 1))
                .map(move |p| p.offset(ox, 0))
        };
        let border: Vec<Point> = ring(0).chain(ring(10)).collect();
        let result = ContourTracerKind::Backtracking.trace(&border);
        assert_eq!(
            result,
            Err(PipelineError::DisconnectedBorder {
                visited: 8,
                total: 16
            })
        );
    }

    #[test]
    fn sort_clockwise_reverses_counter_clockwise_diamond() {
        let (a, b, c, d) = (
            Point::new(1, 0),
            Point::new(0, -1),
            Point::new(-1, 0),
            Point::new(0, 1),
        );
        assert_eq!(sort_clockwise(vec![a, b, c, d]), vec![d, c, b, a]);
        assert_eq!(sort_clockwise(vec![d, c, b, a]), vec![d, c, b, a]);
    }

    #[test]
    fn sort_clockwise_is_idempotent() {
        let border = border_points(&filled(6, 4));
        let traced = ContourTracerKind::Backtracking.trace(&border).unwrap();
        let once = sort_clockwise(traced);
        let twice = sort_clockwise(once.clone());
        assert_eq!(once, twice);

        let reversed: Vec<Point> = once.iter().rev().copied().collect();
        assert_eq!(sort_clockwise(sort_clockwise(reversed.clone())), sort_clockwise(reversed));
    }

    #[test]
    fn traced_square_is_reversed_to_run_along_the_top() {
        let border = border_points(&filled(5, 5));
        let traced = ContourTracerKind::Backtracking.trace(&border).unwrap();
        assert!(!is_clockwise(&traced));
        let oriented = sort_clockwise(traced);
        assert_eq!(&oriented[..2], pts(&[(1, 0), (2, 0)]).as_slice());
        assert!(doubled_signed_area(&oriented) > 0);
    }

    #[test]
    fn collinear_lists_are_left_alone() {
        let line = pts(&[(0, 0), (1, 0), (2, 0)]);
        assert_eq!(sort_clockwise(line.clone()), line);
        let back: Vec<Point> = line.into_iter().rev().collect();
        assert_eq!(sort_clockwise(back.clone()), back);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(sort_clockwise(Vec::new()).is_empty());
        assert_eq!(sort_clockwise(pts(&[(4, 4)])), pts(&[(4, 4)]));
    }

    #[test]
    fn signed_area_of_clockwise_unit_square() {
        let square = pts(&[(0, 0), (1, 0), (1, 1), (0, 1)]);
        assert_eq!(doubled_signed_area(&square), 2);
    }
}
