//! Normalisation: the lock-free silhouette, its mass center, its four
//! corners, and the rotation that aligns it with the axes.

use crate::contour::ContourTracer;
use crate::locks::{InnerLock, OuterLock};
use crate::point_set::{PointSet, border_points};
use crate::types::{PipelineError, Point};

/// The piece with its tabs cut off and its blanks filled in.
///
/// Blank fill comes first, lock by lock, then the remaining piece points
/// in input order. [`detect_corners`] traces from the first border point
/// of this list, so the order decides where the outline starts.
#[must_use]
pub fn lock_free_silhouette(
    points: &[Point],
    outer_locks: &[OuterLock],
    inner_locks: &[InnerLock],
) -> Vec<Point> {
    let tabs: PointSet = outer_locks
        .iter()
        .flat_map(|lock| lock.area.iter().copied())
        .collect();

    let mut seen = PointSet::new();
    inner_locks
        .iter()
        .flat_map(|lock| lock.area.iter().copied())
        .chain(points.iter().copied().filter(|&p| !tabs.contains(p)))
        .filter(|&p| seen.insert(p))
        .collect()
}

/// Componentwise mean of `points`, rounded half away from zero.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateShape`] if `points` is empty.
pub fn mass_center(points: &[Point]) -> Result<Point, PipelineError> {
    if points.is_empty() {
        return Err(PipelineError::DegenerateShape {
            needed: 1,
            found: 0,
        });
    }
    let n = i64::try_from(points.len()).map_err(|_| PipelineError::DegenerateShape {
        needed: 1,
        found: points.len(),
    })?;
    let (sum_x, sum_y) = points.iter().fold((0_i64, 0_i64), |(sx, sy), p| {
        (sx + i64::from(p.x), sy + i64::from(p.y))
    });
    Ok(Point::new(rounded_mean(sum_x, n), rounded_mean(sum_y, n)))
}

#[allow(clippy::cast_possible_truncation)]
const fn rounded_mean(sum: i64, n: i64) -> i32 {
    let magnitude = (2 * sum.abs() + n) / (2 * n);
    (if sum < 0 { -magnitude } else { magnitude }) as i32
}

/// The four border points farthest from `center`, one per quarter of
/// the traced outline.
///
/// The outline is split into chunks of `len / 4` points (a short tail
/// forms a fifth chunk). Each chunk contributes its first farthest
/// point; the four farthest candidates win, ties keeping chunk order.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateShape`] if the outline has fewer
/// than four points, or any tracing error from `tracer`.
pub fn detect_corners(
    shape: &[Point],
    center: Point,
    tracer: &impl ContourTracer,
) -> Result<[Point; 4], PipelineError> {
    let outline = tracer.trace(&border_points(shape))?;
    if outline.len() < 4 {
        return Err(PipelineError::DegenerateShape {
            needed: 4,
            found: outline.len(),
        });
    }

    let mut candidates: Vec<Point> = outline
        .chunks(outline.len() / 4)
        .filter_map(|chunk| {
            chunk.iter().copied().reduce(|best, p| {
                if p.distance_squared(center) > best.distance_squared(center) {
                    p
                } else {
                    best
                }
            })
        })
        .collect();
    candidates.sort_by_key(|p| std::cmp::Reverse(p.distance_squared(center)));

    Ok([candidates[0], candidates[1], candidates[2], candidates[3]])
}

/// Rotation in degrees, within `[-45, 45]`, that squares the corners
/// with the axes.
///
/// The corners are chained by nearest neighbour starting from the
/// first. The midpoints of two opposite sides are rotated about
/// `center` for every whole angle in `0..90` and the first angle
/// minimising `min(|dx|, |dy|)` between them wins. Angles beyond 45 are
/// reported as their negative complement.
#[must_use]
pub fn rotation_angle(corners: &[Point; 4], center: Point) -> i32 {
    let mut remaining = corners[1..].to_vec();
    let mut chain = vec![corners[0]];
    while let Some(closest) = remaining
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| p.distance_squared(chain[chain.len() - 1]))
        .map(|(i, _)| i)
    {
        chain.push(remaining.remove(closest));
    }

    let first_side = midpoint(chain[0], chain[1]);
    let second_side = midpoint(chain[2], chain[3]);

    let mut best: Option<(i32, i64)> = None;
    for alpha in 0..90 {
        if matches!(best, Some((_, 0))) {
            break;
        }
        let a = rotate(first_side, center, alpha);
        let b = rotate(second_side, center, alpha);
        let score = (i64::from(a.x) - i64::from(b.x))
            .abs()
            .min((i64::from(a.y) - i64::from(b.y)).abs());
        if best.is_none_or(|(_, lowest)| score < lowest) {
            best = Some((alpha, score));
        }
    }

    let alpha = best.map_or(0, |(alpha, _)| alpha);
    if (alpha - 90).abs() < alpha {
        alpha - 90
    } else {
        alpha
    }
}

const fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2, (a.y + b.y) / 2)
}

/// Rotate `p` about `center` by `degrees`, truncating toward zero.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn rotate(p: Point, center: Point, degrees: i32) -> Point {
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let dx = f64::from(p.x - center.x);
    let dy = f64::from(p.y - center.y);
    Point::new(
        (dx * cos - dy * sin) as i32 + center.x,
        (dx * sin + dy * cos) as i32 + center.y,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::contour::ContourTracerKind;

    fn square(side: i32) -> Vec<Point> {
        (0..side)
            .flat_map(|y| (0..side).map(move |x| Point::new(x, y)))
            .collect()
    }

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    fn corners_of(coords: [(i32, i32); 4]) -> [Point; 4] {
        coords.map(Point::from)
    }

    #[test]
    fn mass_center_rounds_half_away_from_zero() {
        assert_eq!(mass_center(&pts(&[(0, 0), (1, 1)])).unwrap(), Point::new(1, 1));
        assert_eq!(
            mass_center(&pts(&[(0, 0), (-1, -1)])).unwrap(),
            Point::new(-1, -1)
        );
        assert_eq!(
            mass_center(&pts(&[(0, 0), (0, 0), (1, 2)])).unwrap(),
            Point::new(0, 1)
        );
        assert_eq!(mass_center(&square(20)).unwrap(), Point::new(10, 10));
    }

    #[test]
    fn empty_shape_has_no_center() {
        assert_eq!(
            mass_center(&[]),
            Err(PipelineError::DegenerateShape {
                needed: 1,
                found: 0
            })
        );
    }

    #[test]
    fn square_corners() {
        let shape = square(20);
        let center = mass_center(&shape).unwrap();
        let mut corners = detect_corners(&shape, center, &ContourTracerKind::Backtracking).unwrap();
        corners.sort();
        assert_eq!(corners, corners_of([(0, 0), (0, 19), (19, 0), (19, 19)]));
        assert_eq!(rotation_angle(&corners, center), 0);
    }

    #[test]
    fn tiny_outline_is_degenerate() {
        let shape = pts(&[(0, 0), (1, 0), (0, 1)]);
        assert_eq!(
            detect_corners(&shape, Point::new(0, 0), &ContourTracerKind::Backtracking),
            Err(PipelineError::DegenerateShape {
                needed: 4,
                found: 3
            })
        );
    }

    #[test]
    fn silhouette_cuts_tabs_and_fills_blanks() {
        let points = pts(&[(0, 0), (1, 0), (2, 0)]);
        let tab = OuterLock {
            perimeter: pts(&[(2, 0)]),
            area: pts(&[(2, 0)]),
            defects: std::array::from_fn(|_| crate::defects::ConvexityDefect {
                hull_point_a: Point::new(0, 0),
                hull_point_b: Point::new(2, 0),
                contained_points: Vec::new(),
                deepest_point: Point::new(1, 0),
                depth: 1.0,
            }),
        };
        let blank = InnerLock {
            perimeter: Vec::new(),
            area: pts(&[(0, 1), (0, 0), (1, 1)]),
            defect: tab.defects[0].clone(),
        };
        assert_eq!(
            lock_free_silhouette(&points, &[tab], &[blank]),
            pts(&[(0, 1), (0, 0), (1, 1), (1, 0)])
        );
    }

    #[test]
    fn rotate_quarter_turn() {
        let c = Point::new(10, 10);
        assert_eq!(rotate(Point::new(20, 10), c, 90), Point::new(10, 20));
        assert_eq!(rotate(Point::new(20, 10), c, 0), Point::new(20, 10));
    }

    #[test]
    fn rotated_square_angles() {
        let center = Point::new(500, 500);
        assert_eq!(
            rotation_angle(
                &corners_of([(263, 346), (654, 263), (737, 654), (346, 737)]),
                center
            ),
            12
        );
        assert_eq!(
            rotation_angle(
                &corners_of([(278, 674), (326, 278), (722, 326), (674, 722)]),
                center
            ),
            -7
        );
    }

    #[test]
    fn angles_fold_into_plus_minus_45() {
        let center = Point::new(500, 500);
        let base = [(300, 300), (700, 300), (700, 700), (300, 700)].map(Point::from);
        for (theta, expected) in [(0, 0), (5, 5), (30, 30), (44, 44), (46, -44), (60, -30), (89, -1)] {
            let corners = base.map(|p| rotate(p, center, -theta));
            assert_eq!(rotation_angle(&corners, center), expected, "theta {theta}");
        }
    }
}
