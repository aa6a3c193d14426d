//! Pipeline diagnostics: timing and counts for each stage of one piece.
//!
//! Timing goes through the [`Clock`] trait so the library never touches
//! a platform clock itself; the bench supplies one backed by
//! [`std::time::Instant`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::piece::Piece;
use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{PipelineConfig, PipelineError, Point};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration must be finite and non-negative"))
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time passed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from analysing one piece.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceDiagnostics {
    /// Stage 1: border tracing.
    pub border_tracing: StageDiagnostics,
    /// Stage 2: convex hull.
    pub hull: StageDiagnostics,
    /// Stage 3: convexity defects.
    pub defects: StageDiagnostics,
    /// Stage 4: lock classification.
    pub locks: StageDiagnostics,
    /// Stage 5: normalisation.
    pub normalize: StageDiagnostics,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the finished piece.
    pub summary: PieceSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// The untouched candidate.
    Source {
        /// Points in the candidate.
        point_count: usize,
    },
    /// Border tracing metrics.
    BorderTracing {
        /// Tracer used.
        tracer: String,
        /// Points in the candidate.
        point_count: usize,
        /// Points in the traced border.
        border_point_count: usize,
    },
    /// Convex hull metrics.
    Hull {
        /// Hull vertices, extras included.
        vertex_count: usize,
        /// Vertices added by hand after snapping.
        extra_point_count: usize,
    },
    /// Convexity defect metrics.
    Defects {
        /// Configured depth threshold.
        min_depth: f64,
        /// Defects surviving the threshold.
        defect_count: usize,
        /// Deepest surviving defect, 0 when there are none.
        max_depth: f64,
    },
    /// Lock classification metrics.
    Locks {
        /// Tabs found.
        outer_lock_count: usize,
        /// Blanks found.
        inner_lock_count: usize,
        /// Defects left unexplained.
        unclaimed_defect_count: usize,
    },
    /// Normalisation metrics.
    Normalize {
        /// Points in the lock-free silhouette.
        shape_point_count: usize,
        /// Mass center of the silhouette.
        mass_center: Point,
        /// Rotation in degrees.
        rotation_angle: i32,
    },
}

/// Headline numbers for a finished piece.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceSummary {
    /// Points in the candidate.
    pub point_count: usize,
    /// Defects surviving the threshold.
    pub defect_count: usize,
    /// Tabs found.
    pub outer_lock_count: usize,
    /// Blanks found.
    pub inner_lock_count: usize,
    /// Whether every defect was explained by a lock.
    pub fully_detected: bool,
    /// Rotation in degrees.
    pub rotation_angle: i32,
}

impl PieceSummary {
    fn of(piece: &Piece) -> Self {
        Self {
            point_count: piece.points.len(),
            defect_count: piece.defects.len(),
            outer_lock_count: piece.outer_locks.len(),
            inner_lock_count: piece.inner_locks.len(),
            fully_detected: piece.is_fully_detected(),
            rotation_angle: piece.rotation_angle,
        }
    }
}

impl PieceDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Piece Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Points: {}", self.summary.point_count));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Border Tracing", &self.border_tracing),
            ("Hull", &self.hull),
            ("Defects", &self.defects),
            ("Locks", &self.locks),
            ("Normalize", &self.normalize),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Defects: {}  |  Outer locks: {}  |  Inner locks: {}  |  Fully detected: {}",
            self.summary.defect_count,
            self.summary.outer_lock_count,
            self.summary.inner_lock_count,
            self.summary.fully_detected,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Source { point_count } => format!("{point_count} pts"),
        StageMetrics::BorderTracing {
            tracer,
            point_count,
            border_point_count,
        } => format!("{tracer} {point_count} pts -> {border_point_count} border"),
        StageMetrics::Hull {
            vertex_count,
            extra_point_count,
        } => format!("{vertex_count} vertices ({extra_point_count} extra)"),
        StageMetrics::Defects {
            min_depth,
            defect_count,
            max_depth,
        } => format!("{defect_count} deeper than {min_depth:.1} (max {max_depth:.2})"),
        StageMetrics::Locks {
            outer_lock_count,
            inner_lock_count,
            unclaimed_defect_count,
        } => format!(
            "outer={outer_lock_count} inner={inner_lock_count} unclaimed={unclaimed_defect_count}"
        ),
        StageMetrics::Normalize {
            shape_point_count,
            mass_center,
            rotation_angle,
        } => format!(
            "{shape_point_count} pts, center ({}, {}), {rotation_angle} deg",
            mass_center.x, mass_center.y
        ),
    }
}

/// Time one stage transition and pair the duration with the metrics of
/// the stage it produced.
fn timed<C: Clock, S: PipelineStage>(
    clock: &C,
    advance: impl FnOnce() -> Result<S, PipelineError>,
) -> Result<(S, StageDiagnostics), PipelineError> {
    let start = clock.now();
    let stage = advance()?;
    let duration = clock.elapsed(&start);
    log::trace!("stage {} ({}) took {duration:?}", S::INDEX, S::NAME);
    let metrics = stage.metrics();
    Ok((stage, StageDiagnostics { duration, metrics }))
}

/// Analyse one piece, timing every stage with `clock`.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage.
pub fn analyze_piece_with_diagnostics<C: Clock>(
    points: Vec<Point>,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Piece, PieceDiagnostics), PipelineError> {
    analyze_piece_with_hull_points_and_diagnostics(points, &[], config, clock)
}

/// As [`analyze_piece_with_diagnostics`], with extra hull points added
/// during the hull stage.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised by any stage.
pub fn analyze_piece_with_hull_points_and_diagnostics<C: Clock>(
    points: Vec<Point>,
    extra_hull_points: &[Point],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(Piece, PieceDiagnostics), PipelineError> {
    let start = clock.now();
    let pending = Pipeline::new(points, config.clone());

    let (traced, border_tracing) = timed(clock, || pending.trace_border())?;
    let (hulled, hull) = timed(clock, || {
        Ok(traced.build_hull().with_extra_hull_points(extra_hull_points))
    })?;
    let (found, defects) = timed(clock, || hulled.detect_defects())?;
    let (classified, locks) = timed(clock, || found.classify_locks())?;
    let (normalized, normalize) = timed(clock, || classified.normalize())?;

    let total_duration = clock.elapsed(&start);
    let piece = normalized.into_piece();
    log::debug!(
        "analysed piece of {} points in {:.3}ms",
        piece.points.len(),
        duration_ms(total_duration),
    );

    let summary = PieceSummary::of(&piece);
    Ok((
        piece,
        PieceDiagnostics {
            border_tracing,
            hull,
            defects,
            locks,
            normalize,
            total_duration,
            summary,
        },
    ))
}
