//! Incremental pipeline: advance one piece stage-by-stage, inspecting
//! each intermediate result before continuing.
//!
//! ```rust
//! # use jigsaw_pipeline::{Pipeline, PipelineConfig, PipelineError, Point};
//! # fn run(points: Vec<Point>) -> Result<(), PipelineError> {
//! let piece = Pipeline::new(points, PipelineConfig::default())
//!     .trace_border()?
//!     .build_hull()
//!     .detect_defects()?
//!     .classify_locks()?
//!     .normalize()?
//!     .into_piece();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or
//! `Result` for fallible stages), carrying every earlier intermediate.
//! Skipping a stage or calling them out of order does not compile.

use rstar::RTree;

use crate::border::BorderIndex;
use crate::contour::{ContourTracer, sort_clockwise};
use crate::defects::ConvexityDefect;
use crate::diagnostics::StageMetrics;
use crate::locks::{InnerLock, OuterLock};
use crate::piece::Piece;
use crate::region::CircularityTemplate;
use crate::types::{PipelineConfig, PipelineError, Point};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`trace_border`](Self::trace_border) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .trace_border() to continue"]
pub struct Pending {
    config: PipelineConfig,
    points: Vec<Point>,
}

impl Pending {
    /// The candidate's points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Validate the config, find the border points and order them
    /// clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a bad config,
    /// [`PipelineError::DegenerateShape`] for an empty candidate, or
    /// [`PipelineError::DisconnectedBorder`] if the border cannot be
    /// walked in one loop.
    pub fn trace_border(self) -> Result<BorderTraced, PipelineError> {
        self.config.validate()?;
        let center = crate::shape::mass_center(&self.points)?;
        let traced = self
            .config
            .contour_tracer
            .trace(&crate::point_set::border_points(&self.points))?;
        let border = sort_clockwise(traced);
        log::debug!(
            "traced {} border points of {} (center {center:?})",
            border.len(),
            self.points.len(),
        );
        Ok(BorderTraced {
            config: self.config,
            points: self.points,
            center,
            border,
        })
    }
}

// ───────────────────────── Stage 1: BorderTraced ─────────────────────

/// Pipeline state after tracing the border.
///
/// Call [`build_hull`](Self::build_hull) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .build_hull() to continue"]
pub struct BorderTraced {
    config: PipelineConfig,
    points: Vec<Point>,
    center: Point,
    border: Vec<Point>,
}

impl BorderTraced {
    /// Border points in clockwise order.
    #[must_use]
    pub fn border(&self) -> &[Point] {
        &self.border
    }

    /// Geometric center of the piece.
    #[must_use]
    pub const fn center(&self) -> Point {
        self.center
    }

    /// Advance to the hull stage.
    pub fn build_hull(self) -> HullBuilt {
        let hull = crate::hull::convex_hull(&self.border);
        log::debug!("hull has {} vertices", hull.len());
        HullBuilt {
            config: self.config,
            points: self.points,
            center: self.center,
            border: self.border,
            hull,
            extra_hull_points: 0,
        }
    }
}

// ───────────────────────── Stage 2: HullBuilt ────────────────────────

/// Pipeline state after building the convex hull.
///
/// The hull can be augmented with
/// [`with_extra_hull_points`](Self::with_extra_hull_points) before
/// calling [`detect_defects`](Self::detect_defects).
#[must_use = "pipeline stages are consumed by advancing, call .detect_defects() to continue"]
pub struct HullBuilt {
    config: PipelineConfig,
    points: Vec<Point>,
    center: Point,
    border: Vec<Point>,
    hull: Vec<Point>,
    extra_hull_points: usize,
}

impl HullBuilt {
    /// Hull vertices in clockwise order.
    #[must_use]
    pub fn hull(&self) -> &[Point] {
        &self.hull
    }

    /// Add hull vertices, each snapped to its nearest border point.
    ///
    /// Snapped points already on the hull are ignored. The augmented
    /// hull is re-ordered by border position, which keeps it clockwise.
    pub fn with_extra_hull_points(mut self, extra: &[Point]) -> Self {
        if extra.is_empty() || self.border.is_empty() {
            return self;
        }
        let tree = RTree::bulk_load(self.border.iter().map(|p| [p.x, p.y]).collect());
        for query in extra {
            let Some(&[x, y]) = tree.nearest_neighbor(&[query.x, query.y]) else {
                continue;
            };
            let snapped = Point::new(x, y);
            if !self.hull.contains(&snapped) {
                log::debug!("extra hull point {query:?} snapped to {snapped:?}");
                self.hull.push(snapped);
                self.extra_hull_points += 1;
            }
        }

        let index = BorderIndex::new(&self.border);
        let mut ordered: Vec<(usize, Point)> = self
            .hull
            .iter()
            .filter_map(|&p| index.position(p).ok().map(|position| (position, p)))
            .collect();
        ordered.sort_unstable_by_key(|&(position, _)| position);
        self.hull = ordered.into_iter().map(|(_, p)| p).collect();
        self
    }

    /// Advance to the defect stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PointNotOnBorder`] if a hull vertex is
    /// not on the border.
    pub fn detect_defects(self) -> Result<DefectsDetected, PipelineError> {
        let defects =
            crate::defects::convexity_defects(&self.border, &self.hull, self.config.min_defect_depth)?;
        log::debug!(
            "{} defects deeper than {}",
            defects.len(),
            self.config.min_defect_depth,
        );
        Ok(DefectsDetected {
            config: self.config,
            points: self.points,
            center: self.center,
            border: self.border,
            hull: self.hull,
            defects,
        })
    }
}

// ───────────────────────── Stage 3: DefectsDetected ──────────────────

/// Pipeline state after convexity defect detection.
///
/// Call [`classify_locks`](Self::classify_locks) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .classify_locks() to continue"]
pub struct DefectsDetected {
    config: PipelineConfig,
    points: Vec<Point>,
    center: Point,
    border: Vec<Point>,
    hull: Vec<Point>,
    defects: Vec<ConvexityDefect>,
}

impl DefectsDetected {
    /// Surviving defects in border order.
    #[must_use]
    pub fn defects(&self) -> &[ConvexityDefect] {
        &self.defects
    }

    /// Advance to the lock stage: tabs first, then blanks among the
    /// defects no tab claimed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PointNotOnBorder`] or
    /// [`PipelineError::NoInteriorSeed`] when a lock candidate cannot be
    /// built.
    pub fn classify_locks(self) -> Result<LocksClassified, PipelineError> {
        let template = CircularityTemplate::from_config(&self.config);
        let outer_locks =
            crate::locks::detect_outer_locks(&self.defects, &self.border, &self.points, template)?;
        let unclaimed = crate::locks::unclaimed_defects(&self.defects, &outer_locks);
        let inner_locks =
            crate::locks::detect_inner_locks(&unclaimed, &self.border, &self.points, template)?;
        log::debug!(
            "{} outer locks, {} inner locks, {} defects",
            outer_locks.len(),
            inner_locks.len(),
            self.defects.len(),
        );
        Ok(LocksClassified {
            config: self.config,
            points: self.points,
            center: self.center,
            border: self.border,
            hull: self.hull,
            defects: self.defects,
            outer_locks,
            inner_locks,
        })
    }
}

// ───────────────────────── Stage 4: LocksClassified ──────────────────

/// Pipeline state after lock classification.
///
/// Call [`normalize`](Self::normalize) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .normalize() to continue"]
pub struct LocksClassified {
    config: PipelineConfig,
    points: Vec<Point>,
    center: Point,
    border: Vec<Point>,
    hull: Vec<Point>,
    defects: Vec<ConvexityDefect>,
    outer_locks: Vec<OuterLock>,
    inner_locks: Vec<InnerLock>,
}

impl LocksClassified {
    /// Detected tabs.
    #[must_use]
    pub fn outer_locks(&self) -> &[OuterLock] {
        &self.outer_locks
    }

    /// Detected blanks.
    #[must_use]
    pub fn inner_locks(&self) -> &[InnerLock] {
        &self.inner_locks
    }

    /// Advance to the final stage: strip locks, then find the mass
    /// center, corners and rotation of what remains.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateShape`] if the silhouette is
    /// too small for corner detection, or a tracing error.
    pub fn normalize(self) -> Result<Normalized, PipelineError> {
        let shape =
            crate::shape::lock_free_silhouette(&self.points, &self.outer_locks, &self.inner_locks);
        let mass_center = crate::shape::mass_center(&shape)?;
        let corners =
            crate::shape::detect_corners(&shape, mass_center, &self.config.contour_tracer)?;
        let rotation_angle = crate::shape::rotation_angle(&corners, mass_center);
        log::debug!("corners {corners:?} around {mass_center:?}, rotated {rotation_angle} degrees");
        Ok(Normalized {
            piece: Piece {
                points: self.points,
                border: self.border,
                hull: self.hull,
                defects: self.defects,
                center: self.center,
                outer_locks: self.outer_locks,
                inner_locks: self.inner_locks,
                shape,
                mass_center,
                corners,
                rotation_angle,
            },
        })
    }
}

// ───────────────────────── Stage 5: Normalized ───────────────────────

/// Final pipeline state.
///
/// Call [`into_piece`](Self::into_piece) to extract the [`Piece`].
#[must_use = "call .into_piece() to extract the Piece"]
pub struct Normalized {
    piece: Piece,
}

impl Normalized {
    /// The finished piece.
    #[must_use]
    pub const fn piece(&self) -> &Piece {
        &self.piece
    }

    /// Consume the pipeline and return the [`Piece`].
    #[must_use]
    pub fn into_piece(self) -> Piece {
        self.piece
    }
}

// ───────────────────────── PipelineStage trait ───────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 6;

/// Trait implemented by every pipeline stage.
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"border"`, `"locks"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `5` for
    /// Normalized).
    const INDEX: usize;

    /// Metrics describing the work done to reach this state.
    fn metrics(&self) -> StageMetrics;

    /// Run all remaining stages and return the [`Piece`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<Piece, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Source {
            point_count: self.points.len(),
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        self.trace_border()?.complete()
    }
}

impl PipelineStage for BorderTraced {
    const NAME: &str = "border";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::BorderTracing {
            tracer: self.config.contour_tracer.to_string(),
            point_count: self.points.len(),
            border_point_count: self.border.len(),
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        self.build_hull().complete()
    }
}

impl PipelineStage for HullBuilt {
    const NAME: &str = "hull";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Hull {
            vertex_count: self.hull.len(),
            extra_point_count: self.extra_hull_points,
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        self.detect_defects()?.complete()
    }
}

impl PipelineStage for DefectsDetected {
    const NAME: &str = "defects";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Defects {
            min_depth: self.config.min_defect_depth,
            defect_count: self.defects.len(),
            max_depth: self.defects.iter().map(|d| d.depth).fold(0.0, f64::max),
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        self.classify_locks()?.complete()
    }
}

impl PipelineStage for LocksClassified {
    const NAME: &str = "locks";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        let claimed = self.outer_locks.len() * 2 + self.inner_locks.len();
        StageMetrics::Locks {
            outer_lock_count: self.outer_locks.len(),
            inner_lock_count: self.inner_locks.len(),
            unclaimed_defect_count: self.defects.len().saturating_sub(claimed),
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        Ok(self.normalize()?.into_piece())
    }
}

impl PipelineStage for Normalized {
    const NAME: &str = "normalize";
    const INDEX: usize = 5;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Normalize {
            shape_point_count: self.piece.shape.len(),
            mass_center: self.piece.mass_center,
            rotation_angle: self.piece.rotation_angle,
        }
    }

    fn complete(self) -> Result<Piece, PipelineError> {
        Ok(self.into_piece())
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental per-piece pipeline.
///
/// Created via [`Pipeline::new`], which stores the points and config
/// without doing any processing.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline for one piece candidate.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(points: Vec<Point>, config: PipelineConfig) -> Pending {
        Pending { config, points }
    }
}
