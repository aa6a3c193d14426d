//! The analysed piece record.

use serde::{Deserialize, Serialize};

use crate::defects::ConvexityDefect;
use crate::locks::{InnerLock, OuterLock};
use crate::types::Point;

/// Everything the pipeline learned about one piece.
///
/// Built once by [`Normalized::into_piece`](crate::pipeline::Normalized::into_piece)
/// and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    /// Foreground points, in input order.
    pub points: Vec<Point>,
    /// Border points in clockwise order.
    pub border: Vec<Point>,
    /// Convex hull vertices in clockwise order.
    pub hull: Vec<Point>,
    /// Defects that passed the depth filter, in border order.
    pub defects: Vec<ConvexityDefect>,
    /// Mean of all points, rounded half away from zero.
    pub center: Point,
    /// Tabs.
    pub outer_locks: Vec<OuterLock>,
    /// Blanks.
    pub inner_locks: Vec<InnerLock>,
    /// The piece with tabs removed and blanks filled.
    pub shape: Vec<Point>,
    /// Mean of [`shape`](Self::shape).
    pub mass_center: Point,
    /// The four corners of the shape.
    pub corners: [Point; 4],
    /// Degrees, within `[-45, 45]`.
    pub rotation_angle: i32,
}

impl Piece {
    /// Whether every surviving defect belongs to a lock.
    #[must_use]
    pub fn is_fully_detected(&self) -> bool {
        let claimed = self.outer_locks.len() * 2 + self.inner_locks.len();
        claimed == self.defects.len()
    }

    /// The defects bounding tabs, in lock order.
    pub fn outer_lock_defects(&self) -> impl Iterator<Item = &ConvexityDefect> {
        self.outer_locks.iter().flat_map(|lock| lock.defects.iter())
    }

    /// Defects that ended up neither bounding a tab nor under a blank.
    #[must_use]
    pub fn unclaimed_defects(&self) -> Vec<&ConvexityDefect> {
        self.defects
            .iter()
            .filter(|d| {
                !self.outer_lock_defects().any(|claimed| claimed == *d)
                    && !self.inner_locks.iter().any(|lock| lock.defect == **d)
            })
            .collect()
    }
}
