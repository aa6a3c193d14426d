//! Closed regions on the lattice: chords, perimeters, enclosed flood
//! fill, and the circularity test used to recognise locks.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::point_set::PointSet;
use crate::types::{PipelineConfig, PipelineError, Point};

/// Rasterise the chord from `a` to `b` by recursive midpoint bisection.
///
/// The result starts with `a` and `b`; midpoints (componentwise integer
/// halves, truncated toward zero) follow in the order they are generated.
/// Bisection stops once both halves of a pair are 8-adjacent.
#[must_use]
pub fn segment_between(a: Point, b: Point) -> Vec<Point> {
    let mut result = vec![a, b];
    let mut pending = vec![(a, b)];

    while let Some((p, q)) = pending.pop() {
        if !p.touches(q) {
            let mid = Point::new((p.x + q.x) / 2, (p.y + q.y) / 2);
            result.push(mid);
            pending.push((p, mid));
            pending.push((mid, q));
        }
    }

    result
}

/// Concatenate `arc` and `chord`, keeping the first occurrence of each
/// point.
#[must_use]
pub fn closed_perimeter(arc: Vec<Point>, chord: Vec<Point>) -> Vec<Point> {
    let mut seen = HashSet::with_capacity(arc.len() + chord.len());
    arc.into_iter()
        .chain(chord)
        .filter(|p| seen.insert(*p))
        .collect()
}

/// Row and column extents of a perimeter, for the four-ray interior
/// test.
struct Extents {
    rows: HashMap<i32, (i32, i32)>,
    columns: HashMap<i32, (i32, i32)>,
}

impl Extents {
    fn of(perimeter: &[Point]) -> Self {
        let mut rows: HashMap<i32, (i32, i32)> = HashMap::new();
        let mut columns: HashMap<i32, (i32, i32)> = HashMap::new();
        for p in perimeter {
            let row = rows.entry(p.y).or_insert((p.x, p.x));
            row.0 = row.0.min(p.x);
            row.1 = row.1.max(p.x);
            let column = columns.entry(p.x).or_insert((p.y, p.y));
            column.0 = column.0.min(p.y);
            column.1 = column.1.max(p.y);
        }
        Self { rows, columns }
    }

    /// Perimeter points exist strictly left, right, above, and below `p`.
    fn surrounds(&self, p: Point) -> bool {
        let horizontal = self
            .rows
            .get(&p.y)
            .is_some_and(|&(min, max)| min < p.x && p.x < max);
        let vertical = self
            .columns
            .get(&p.x)
            .is_some_and(|&(min, max)| min < p.y && p.y < max);
        horizontal && vertical
    }
}

/// The first candidate, not itself on the perimeter, whose four axis
/// rays each meet the perimeter.
#[must_use]
pub fn interior_seed(perimeter: &[Point], candidates: &[Point]) -> Option<Point> {
    let on_perimeter: HashSet<Point> = perimeter.iter().copied().collect();
    let extents = Extents::of(perimeter);
    candidates
        .iter()
        .copied()
        .find(|&p| !on_perimeter.contains(&p) && extents.surrounds(p))
}

/// Flood-fill (4-connected) the candidates enclosed by `perimeter`.
///
/// The fill starts from [`interior_seed`] and never enters a perimeter
/// point or a point outside `candidates`. The result excludes the
/// perimeter.
///
/// # Errors
///
/// Returns [`PipelineError::NoInteriorSeed`] if no candidate lies inside
/// the perimeter.
pub fn enclosed_area(perimeter: &[Point], candidates: &[Point]) -> Result<Vec<Point>, PipelineError> {
    let seed = interior_seed(perimeter, candidates).ok_or(PipelineError::NoInteriorSeed {
        perimeter_len: perimeter.len(),
    })?;

    let mut available: PointSet = candidates.iter().copied().collect();
    for &p in perimeter {
        available.remove(p);
    }
    available.remove(seed);

    let mut area = Vec::new();
    let mut frontier = VecDeque::from([seed]);
    while let Some(current) = frontier.pop_front() {
        area.push(current);
        for neighbor in current.neighbors4() {
            if available.remove(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }

    Ok(area)
}

/// Every lattice point of the inclusive bounding box of `points` that
/// is not itself in `points`, column by column.
#[must_use]
pub fn bounding_box_complement(points: &[Point]) -> Vec<Point> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    }

    let present: PointSet = points.iter().copied().collect();
    (min.x..=max.x)
        .flat_map(|x| (min.y..=max.y).map(move |y| Point::new(x, y)))
        .filter(|&p| !present.contains(p))
        .collect()
}

/// Ratios are compared rounded half-up to five decimals.
const RATIO_UNITS: i64 = 100_000;

/// Accepts regions whose `area / perimeter²` matches a lock template.
///
/// Comparison happens in integer units of 1e-5 so the rounding is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularityTemplate {
    reference: i64,
    tolerance: i64,
}

impl CircularityTemplate {
    /// Build a template from a reference ratio and tolerance.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn new(reference: f64, tolerance: f64) -> Self {
        let scale = RATIO_UNITS as f64;
        Self {
            reference: (reference * scale).round() as i64,
            tolerance: (tolerance * scale).round() as i64,
        }
    }

    /// The template configured by `config`.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.lock_circularity, config.lock_circularity_tolerance)
    }

    /// `area / perimeter²` in units of 1e-5, rounded half-up.
    ///
    /// An empty perimeter has ratio 0.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn ratio_units(area: usize, perimeter: usize) -> i64 {
        if perimeter == 0 {
            return 0;
        }
        let area = area as i64;
        let squared = (perimeter as i64) * (perimeter as i64);
        (2 * area * RATIO_UNITS + squared) / (2 * squared)
    }

    /// Whether the ratio is within the tolerance of the reference,
    /// inclusive.
    #[must_use]
    pub const fn accepts(&self, area: usize, perimeter: usize) -> bool {
        (Self::ratio_units(area, perimeter) - self.reference).abs() <= self.tolerance
    }
}

impl Default for CircularityTemplate {
    fn default() -> Self {
        Self::new(
            PipelineConfig::DEFAULT_LOCK_CIRCULARITY,
            PipelineConfig::DEFAULT_LOCK_CIRCULARITY_TOLERANCE,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    fn square_ring(side: i32) -> Vec<Point> {
        (0..side)
            .flat_map(|y| (0..side).map(move |x| Point::new(x, y)))
            .filter(|p| p.x == 0 || p.y == 0 || p.x == side - 1 || p.y == side - 1)
            .collect()
    }

    fn filled(side: i32) -> Vec<Point> {
        (0..side)
            .flat_map(|y| (0..side).map(move |x| Point::new(x, y)))
            .collect()
    }

    #[test]
    fn adjacent_endpoints_produce_no_midpoints() {
        assert_eq!(
            segment_between(Point::new(0, 0), Point::new(1, 1)),
            pts(&[(0, 0), (1, 1)])
        );
    }

    #[test]
    fn chord_bisection_order_and_connectivity() {
        let chord = segment_between(Point::new(0, 0), Point::new(10, 4));
        assert_eq!(
            chord,
            pts(&[
                (0, 0),
                (10, 4),
                (5, 2),
                (7, 3),
                (8, 3),
                (9, 3),
                (6, 2),
                (2, 1),
                (3, 1),
                (4, 1),
                (1, 0)
            ])
        );

        let mut by_x = chord;
        by_x.sort();
        for pair in by_x.windows(2) {
            assert!(pair[0].touches(pair[1]));
        }
    }

    #[test]
    fn midpoints_truncate_toward_zero() {
        assert_eq!(
            segment_between(Point::new(0, 0), Point::new(-5, -3)),
            pts(&[(0, 0), (-5, -3), (-2, -1), (-3, -2), (-4, -2), (-1, 0)])
        );
    }

    #[test]
    fn closed_perimeter_removes_duplicates_keeping_first() {
        let perimeter = closed_perimeter(pts(&[(1, 0), (2, 0)]), pts(&[(0, 0), (2, 0), (1, 0)]));
        assert_eq!(perimeter, pts(&[(1, 0), (2, 0), (0, 0)]));
    }

    #[test]
    fn seed_requires_all_four_rays() {
        let ring = square_ring(5);
        assert_eq!(interior_seed(&ring, &filled(5)), Some(Point::new(1, 1)));
        // Outside the square: no ray to the left.
        assert_eq!(interior_seed(&ring, &[Point::new(-1, 2)]), None);
        // Perimeter points themselves are never seeds.
        assert_eq!(interior_seed(&ring, &ring), None);
    }

    #[test]
    fn enclosed_area_stops_at_perimeter() {
        let ring = square_ring(10);
        let area = enclosed_area(&ring, &filled(10)).unwrap();
        assert_eq!(area.len(), 64);
        assert_eq!(area[0], Point::new(1, 1));
        assert!(area.iter().all(|p| !ring.contains(p)));
    }

    #[test]
    fn enclosed_area_without_seed_is_an_error() {
        let ring = square_ring(4);
        assert_eq!(
            enclosed_area(&ring, &[Point::new(10, 10)]),
            Err(PipelineError::NoInteriorSeed { perimeter_len: 12 })
        );
    }

    #[test]
    fn bounding_box_complement_is_inclusive() {
        let points = pts(&[(0, 0), (2, 0), (2, 1), (0, 1), (1, 1)]);
        assert_eq!(bounding_box_complement(&points), pts(&[(1, 0)]));
        assert!(bounding_box_complement(&[]).is_empty());
        assert!(bounding_box_complement(&filled(3)).is_empty());
    }

    #[test]
    fn circularity_boundaries_are_inclusive() {
        let template = CircularityTemplate::default();
        assert!(template.accepts(620, 100));
        assert!(template.accepts(980, 100));
        assert!(!template.accepts(619, 100));
        assert!(!template.accepts(981, 100));
        assert!(template.accepts(800, 100));
    }

    #[test]
    fn ratio_rounds_half_up() {
        // 1 / 3 = 0.333333 -> 33333; 2 / 3 = 0.666667 -> 66667
        assert_eq!(CircularityTemplate::ratio_units(3, 3), 33_333);
        assert_eq!(CircularityTemplate::ratio_units(6, 3), 66_667);
        // 1 / 64 = 0.015625 -> 0.01563
        assert_eq!(CircularityTemplate::ratio_units(1, 8), 1_563);
        assert_eq!(CircularityTemplate::ratio_units(5, 0), 0);
    }

    #[test]
    fn square_ring_region_matches_template() {
        // 64 interior + 36 perimeter over 36²: 0.07716.
        let ring = square_ring(10);
        let area = enclosed_area(&ring, &filled(10)).unwrap();
        assert!(CircularityTemplate::default().accepts(area.len() + ring.len(), ring.len()));
    }

    #[test]
    fn template_from_config() {
        let config = PipelineConfig {
            lock_circularity: 0.1,
            lock_circularity_tolerance: 0.0,
            ..PipelineConfig::default()
        };
        let template = CircularityTemplate::from_config(&config);
        assert!(template.accepts(10, 10));
        assert!(!template.accepts(11, 10));
    }
}
