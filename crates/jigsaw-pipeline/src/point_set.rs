//! Column-indexed lattice point set.
//!
//! Backs flood fill, component extraction, contour tracing, and the
//! boundary predicate. Every operation builds its own [`PointSet`] and
//! drops it when done, so nothing is shared between pieces.

use std::collections::{HashMap, HashSet};

use crate::types::Point;

/// A set of lattice points indexed as `x -> {y}`.
///
/// Membership, insertion, and removal are O(1). Duplicate coordinates
/// are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointSet {
    columns: HashMap<i32, HashSet<i32>>,
    len: usize,
}

impl PointSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a point. Returns `false` if it was already present.
    pub fn insert(&mut self, point: Point) -> bool {
        let inserted = self.columns.entry(point.x).or_default().insert(point.y);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Remove a point. Returns `false` if it was not present.
    pub fn remove(&mut self, point: Point) -> bool {
        let Some(column) = self.columns.get_mut(&point.x) else {
            return false;
        };
        let removed = column.remove(&point.y);
        if removed {
            self.len -= 1;
            if column.is_empty() {
                self.columns.remove(&point.x);
            }
        }
        removed
    }

    /// Whether `(point.x, point.y)` is in the set.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.columns
            .get(&point.x)
            .is_some_and(|column| column.contains(&point.y))
    }

    /// The axis neighbours of `point` that are present, in
    /// [`Point::neighbors4`] order.
    pub fn neighbors4(&self, point: Point) -> impl Iterator<Item = Point> + '_ {
        point
            .neighbors4()
            .into_iter()
            .filter(move |&n| self.contains(n))
    }

    /// Whether `point` has fewer than 4 of its axis neighbours in the set.
    #[must_use]
    pub fn is_boundary(&self, point: Point) -> bool {
        self.neighbors4(point).count() < 4
    }
}

impl FromIterator<Point> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Point> for PointSet {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        for point in iter {
            self.insert(point);
        }
    }
}

/// Points with fewer than 4 of their 4 axis neighbours present.
///
/// Output keeps the input order, which fixes where contour tracing
/// starts.
#[must_use]
pub fn border_points(points: &[Point]) -> Vec<Point> {
    let set: PointSet = points.iter().copied().collect();
    points
        .iter()
        .copied()
        .filter(|&p| set.is_boundary(p))
        .collect()
}
