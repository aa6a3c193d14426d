//! Position lookups and cyclic walks over a clockwise border.

use std::collections::HashMap;

use crate::types::{PipelineError, Point};

/// A clockwise border with an index from point to position.
///
/// The border is treated as a cycle: walking past the last point wraps
/// to the first.
pub(crate) struct BorderIndex<'a> {
    points: &'a [Point],
    positions: HashMap<Point, usize>,
}

impl<'a> BorderIndex<'a> {
    pub(crate) fn new(points: &'a [Point]) -> Self {
        let mut positions = HashMap::with_capacity(points.len());
        for (i, &p) in points.iter().enumerate() {
            positions.entry(p).or_insert(i);
        }
        Self { points, positions }
    }

    pub(crate) const fn len(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn at(&self, position: usize) -> Point {
        self.points[position % self.points.len()]
    }

    pub(crate) fn position(&self, point: Point) -> Result<usize, PipelineError> {
        self.positions
            .get(&point)
            .copied()
            .ok_or_else(|| PipelineError::not_on_border(point))
    }

    pub(crate) const fn next(&self, position: usize) -> usize {
        (position + 1) % self.points.len()
    }

    pub(crate) const fn previous(&self, position: usize) -> usize {
        if position == 0 {
            self.points.len() - 1
        } else {
            position - 1
        }
    }

    /// Border points strictly between positions `from` and `to`, walking
    /// clockwise. Empty when `to` directly follows `from`.
    pub(crate) fn between(&self, from: usize, to: usize) -> Vec<Point> {
        let mut run = Vec::new();
        let mut i = self.next(from);
        while i != to && i != from {
            run.push(self.points[i]);
            i = self.next(i);
        }
        run
    }

    /// Clockwise arc from `from` (exclusive) to `to` (inclusive).
    ///
    /// When both are the same point the arc is just that point.
    pub(crate) fn arc(&self, from: Point, to: Point) -> Result<Vec<Point>, PipelineError> {
        let start = self.position(from)?;
        let end = self.position(to)?;
        if start == end {
            return Ok(vec![to]);
        }
        let mut arc = self.between(start, end);
        arc.push(to);
        Ok(arc)
    }
}
