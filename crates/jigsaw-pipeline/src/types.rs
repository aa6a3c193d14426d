//! Shared types for the jigsaw piece pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// A point on the image lattice.
///
/// `y` grows downward (image convention), so "up" is `y - 1`. Equality,
/// ordering, and hashing key off `(x, y)` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from the left edge).
    pub x: i32,
    /// Row (pixels from the top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The point shifted by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four axis neighbours in the order `+x`, `-x`, `+y`, `-y`.
    #[must_use]
    pub const fn neighbors4(self) -> [Self; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// Whether `other` is this point or one of its 8 neighbours.
    #[must_use]
    pub const fn touches(self, other: Self) -> bool {
        (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }

    /// Squared Euclidean distance to another point, exact in integers.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Configuration for the piece pipeline.
///
/// Defaults are tuned for pieces of a few hundred pixels across, the
/// size produced by photographing a table of pieces at typical phone
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Which contour tracing algorithm orders the border points.
    pub contour_tracer: ContourTracerKind,

    /// Convexity defects whose depth is not strictly greater than this
    /// (lattice units) are discarded as noise.
    pub min_defect_depth: f64,

    /// Reference `area / perimeter²` ratio of a lock template.
    pub lock_circularity: f64,

    /// Accepted deviation from [`lock_circularity`](Self::lock_circularity),
    /// inclusive on both sides.
    pub lock_circularity_tolerance: f64,

    /// Whether [`detect_pieces`](crate::detect_pieces) analyzes pieces on
    /// the rayon thread pool.
    pub parallel: bool,
}

impl PipelineConfig {
    /// Default depth threshold for convexity defects.
    pub const DEFAULT_MIN_DEFECT_DEPTH: f64 = 10.0;

    /// Default reference circularity of a lock.
    pub const DEFAULT_LOCK_CIRCULARITY: f64 = 0.08;

    /// Default circularity tolerance.
    pub const DEFAULT_LOCK_CIRCULARITY_TOLERANCE: f64 = 0.018;

    /// Default for [`parallel`](Self::parallel).
    pub const DEFAULT_PARALLEL: bool = true;

    /// Check the numeric parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when a threshold is not
    /// finite, the depth or tolerance is negative, or the reference
    /// circularity is not positive.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.min_defect_depth.is_finite() || self.min_defect_depth < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "min_defect_depth must be finite and non-negative, got {}",
                self.min_defect_depth
            )));
        }
        if !self.lock_circularity.is_finite() || self.lock_circularity <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "lock_circularity must be finite and positive, got {}",
                self.lock_circularity
            )));
        }
        if !self.lock_circularity_tolerance.is_finite() || self.lock_circularity_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "lock_circularity_tolerance must be finite and non-negative, got {}",
                self.lock_circularity_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            contour_tracer: ContourTracerKind::default(),
            min_defect_depth: Self::DEFAULT_MIN_DEFECT_DEPTH,
            lock_circularity: Self::DEFAULT_LOCK_CIRCULARITY,
            lock_circularity_tolerance: Self::DEFAULT_LOCK_CIRCULARITY_TOLERANCE,
            parallel: Self::DEFAULT_PARALLEL,
        }
    }
}

/// Errors that abort the analysis of a single piece.
///
/// All variants except [`InvalidConfig`](Self::InvalidConfig) mean the
/// input point set is topologically inconsistent for the stage that
/// failed. They are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A point that must lie on the traced border (a hull vertex or an
    /// arc endpoint) is not part of it.
    #[error("point ({x}, {y}) is not on the piece border")]
    PointNotOnBorder {
        /// Column of the missing point.
        x: i32,
        /// Row of the missing point.
        y: i32,
    },

    /// The contour tracer backtracked past its starting point before
    /// visiting every border point.
    #[error("border is disconnected: traced {visited} of {total} border points")]
    DisconnectedBorder {
        /// Border points reached before the walk was exhausted.
        visited: usize,
        /// Total border points.
        total: usize,
    },

    /// No seed point lies inside a lock perimeter.
    #[error("no interior point found inside a perimeter of {perimeter_len} points")]
    NoInteriorSeed {
        /// Number of points in the perimeter that was searched.
        perimeter_len: usize,
    },

    /// A computation needs more points than the shape provides.
    #[error("degenerate shape: need at least {needed} points, found {found}")]
    DegenerateShape {
        /// Minimum number of points required.
        needed: usize,
        /// Number of points available.
        found: usize,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Whether this error reports a geometry precondition violation (as
    /// opposed to a configuration problem).
    #[must_use]
    pub const fn is_geometry_violation(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }

    pub(crate) const fn not_on_border(point: Point) -> Self {
        Self::PointNotOnBorder {
            x: point.x,
            y: point.y,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn point_identity_is_coordinates() {
        let mut set = HashSet::new();
        set.insert(Point::new(3, 4));
        assert!(set.contains(&Point::new(3, 4)));
        assert!(!set.insert(Point::new(3, 4)));
        assert_ne!(Point::new(3, 4), Point::new(4, 3));
    }

    #[test]
    fn point_ordering_is_x_then_y() {
        let mut points = vec![Point::new(1, 0), Point::new(0, 5), Point::new(0, 1)];
        points.sort();
        assert_eq!(
            points,
            vec![Point::new(0, 1), Point::new(0, 5), Point::new(1, 0)]
        );
    }

    #[test]
    fn point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance_squared(b), 25);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_distance_does_not_overflow() {
        let a = Point::new(i32::MAX, 0);
        let b = Point::new(-1, 0);
        assert_eq!(a.distance_squared(b), 1_i64 << 62);
    }

    #[test]
    fn point_touches() {
        let p = Point::new(5, 5);
        assert!(p.touches(Point::new(6, 4)));
        assert!(p.touches(p));
        assert!(!p.touches(Point::new(7, 5)));
    }

    #[test]
    fn neighbors4_order() {
        assert_eq!(
            Point::new(0, 0).neighbors4(),
            [
                Point::new(1, 0),
                Point::new(-1, 0),
                Point::new(0, 1),
                Point::new(0, -1)
            ]
        );
    }

    #[test]
    fn point_serde_round_trip() {
        let json = serde_json::to_string(&Point::new(-2, 7)).unwrap();
        assert_eq!(json, r#"{"x":-2,"y":7}"#);
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Point::new(-2, 7));
    }

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.min_defect_depth - 10.0).abs() < f64::EPSILON);
        assert!((config.lock_circularity - 0.08).abs() < f64::EPSILON);
        assert!((config.lock_circularity_tolerance - 0.018).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let negative_depth = PipelineConfig {
            min_defect_depth: -1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            negative_depth.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let zero_reference = PipelineConfig {
            lock_circularity: 0.0,
            ..PipelineConfig::default()
        };
        assert!(zero_reference.validate().is_err());

        let nan_tolerance = PipelineConfig {
            lock_circularity_tolerance: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(nan_tolerance.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: PipelineConfig = serde_json::from_str(r#"{"min_defect_depth": 4.5}"#).unwrap();
        assert!((config.min_defect_depth - 4.5).abs() < f64::EPSILON);
        assert_eq!(config.contour_tracer, ContourTracerKind::default());
        assert!(config.parallel);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            PipelineError::PointNotOnBorder { x: 1, y: 2 }.to_string(),
            "point (1, 2) is not on the piece border"
        );
        assert_eq!(
            PipelineError::DisconnectedBorder {
                visited: 3,
                total: 10
            }
            .to_string(),
            "border is disconnected: traced 3 of 10 border points"
        );
    }

    #[test]
    fn geometry_violation_classification() {
        assert!(PipelineError::NoInteriorSeed { perimeter_len: 4 }.is_geometry_violation());
        assert!(
            PipelineError::DegenerateShape {
                needed: 4,
                found: 1
            }
            .is_geometry_violation()
        );
        assert!(!PipelineError::InvalidConfig("x".into()).is_geometry_violation());
    }

    #[test]
    fn error_serde_round_trip() {
        let err = PipelineError::DisconnectedBorder {
            visited: 5,
            total: 9,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
