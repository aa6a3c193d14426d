//! Connected-component extraction: split a field of foreground points
//! into individual piece candidates.
//!
//! This is the first pipeline step. Components are 4-connected, and a
//! size-gap heuristic drops specks of segmentation noise before any
//! per-piece work happens.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::point_set::PointSet;
use crate::types::Point;

/// The unordered points of one 4-connected component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCandidate(Vec<Point>);

impl PieceCandidate {
    /// Wrap a list of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Number of points in the component.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the component has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the candidate and returns its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Partition `points` into 4-connected components.
///
/// Each flood starts from the first input point not yet claimed, so the
/// output order is deterministic. Neighbours are enqueued in
/// [`Point::neighbors4`] order and removed from the working set as they
/// are enqueued. Duplicate input coordinates are kept once. Empty input
/// yields no components.
#[must_use]
pub fn extract_components(points: &[Point]) -> Vec<PieceCandidate> {
    let mut remaining: PointSet = points.iter().copied().collect();
    let mut components = Vec::new();
    let mut frontier = VecDeque::new();

    for &seed in points {
        if !remaining.remove(seed) {
            continue;
        }
        let mut component = Vec::new();
        frontier.push_back(seed);

        while let Some(current) = frontier.pop_front() {
            component.push(current);
            for neighbor in current.neighbors4() {
                if remaining.remove(neighbor) {
                    frontier.push_back(neighbor);
                }
            }
        }

        components.push(PieceCandidate::new(component));
    }

    components
}

/// Drop components that are much smaller than the pieces.
///
/// Sizes are sorted descending and the largest drop between neighbours
/// (`biggest_gap`) is found. When `biggest_gap` is below half the
/// largest size the distribution is considered uniform and everything
/// is kept. Otherwise the size just above the first drop equal to
/// `biggest_gap` becomes the minimum, and every component at least that
/// large survives. Survivors keep their input order.
#[must_use]
pub fn discard_imperfections(components: Vec<PieceCandidate>) -> Vec<PieceCandidate> {
    let mut sizes: Vec<usize> = components.iter().map(PieceCandidate::len).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    let Some(&largest) = sizes.first() else {
        return components;
    };

    let biggest_gap = sizes
        .windows(2)
        .map(|pair| pair[0] - pair[1])
        .max()
        .unwrap_or(0);

    if biggest_gap < largest / 2 {
        return components;
    }

    let minimum = sizes
        .windows(2)
        .find(|pair| pair[0] - pair[1] == biggest_gap)
        .map_or(0, |pair| pair[0]);

    log::debug!(
        "discarding components smaller than {minimum} points (gap {biggest_gap}, largest {largest})"
    );

    components
        .into_iter()
        .filter(|c| c.len() >= minimum)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn square(size: i32, ox: i32, oy: i32) -> Vec<Point> {
        (0..size)
            .flat_map(|y| (0..size).map(move |x| Point::new(x + ox, y + oy)))
            .collect()
    }

    fn sized(sizes: &[usize]) -> Vec<PieceCandidate> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let x = i32::try_from(i).unwrap_or(i32::MAX);
                PieceCandidate::new(
                    (0..n)
                        .map(|y| Point::new(x, i32::try_from(y).unwrap_or(i32::MAX)))
                        .collect(),
                )
            })
            .collect()
    }

    fn sizes_of(components: &[PieceCandidate]) -> Vec<usize> {
        components.iter().map(PieceCandidate::len).collect()
    }

    #[test]
    fn empty_input_yields_no_components() {
        assert!(extract_components(&[]).is_empty());
        assert!(discard_imperfections(Vec::new()).is_empty());
    }

    #[test]
    fn extraction_partitions_input() {
        let mut points = square(6, 0, 0);
        points.extend(square(4, 10, 10));
        points.push(Point::new(20, 0));

        let components = extract_components(&points);
        assert_eq!(sizes_of(&components), vec![36, 16, 1]);

        let mut seen = HashSet::new();
        for component in &components {
            for &p in component.points() {
                assert!(seen.insert(p), "point {p:?} appears twice");
            }
        }
        let input: HashSet<Point> = points.into_iter().collect();
        assert_eq!(seen, input);
    }

    #[test]
    fn diagonal_contact_does_not_connect() {
        let points = vec![Point::new(0, 0), Point::new(1, 1)];
        assert_eq!(extract_components(&points).len(), 2);
    }

    #[test]
    fn duplicates_are_kept_once() {
        let points = vec![Point::new(0, 0), Point::new(0, 0), Point::new(1, 0)];
        let components = extract_components(&points);
        assert_eq!(sizes_of(&components), vec![2]);
    }

    #[test]
    fn bfs_starts_from_first_input_point() {
        let points = square(3, 0, 0);
        let components = extract_components(&points);
        assert_eq!(components[0].points()[0], Point::new(0, 0));
        assert_eq!(components[0].points()[1], Point::new(1, 0));
    }

    #[test]
    fn uniform_sizes_are_all_kept() {
        let kept = discard_imperfections(sized(&[100, 90, 95]));
        assert_eq!(sizes_of(&kept), vec![100, 90, 95]);
    }

    #[test]
    fn single_component_is_kept() {
        let kept = discard_imperfections(sized(&[10]));
        assert_eq!(sizes_of(&kept), vec![10]);
    }

    #[test]
    fn noise_below_the_gap_is_dropped_in_input_order() {
        let kept = discard_imperfections(sized(&[100, 3, 98, 1]));
        assert_eq!(sizes_of(&kept), vec![100, 98]);
    }

    #[test]
    fn gap_of_exactly_half_prunes() {
        let kept = discard_imperfections(sized(&[100, 50]));
        assert_eq!(sizes_of(&kept), vec![100]);
    }

    #[test]
    fn first_of_equal_gaps_sets_threshold() {
        // Sorted: 200, 100, 0. Both gaps are 100; the one below 200 wins.
        let kept = discard_imperfections(sized(&[100, 0, 200]));
        assert_eq!(sizes_of(&kept), vec![200]);
    }
}
