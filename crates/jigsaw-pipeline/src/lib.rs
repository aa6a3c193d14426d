//! jigsaw-pipeline: Pure jigsaw piece geometry pipeline (sans-IO).
//!
//! Turns the foreground points of a photographed table of pieces into
//! one [`Piece`] record per piece through:
//! component extraction -> border tracing -> convex hull ->
//! convexity defects -> lock classification -> normalisation.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! point lists and returns structured data. Reading masks from disk
//! lives in `jigsaw-bench`.

mod border;

pub mod components;
pub mod contour;
pub mod defects;
pub mod diagnostics;
pub mod hull;
pub mod locks;
pub mod piece;
pub mod pipeline;
pub mod point_set;
pub mod region;
pub mod shape;
pub mod types;

use rayon::prelude::*;

pub use components::PieceCandidate;
pub use contour::{ContourTracer, ContourTracerKind};
pub use defects::ConvexityDefect;
pub use locks::{InnerLock, OuterLock};
pub use piece::Piece;
pub use pipeline::{Pipeline, PipelineStage};
pub use point_set::PointSet;
pub use types::{PipelineConfig, PipelineError, Point};

/// Analyse a single piece candidate.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a bad config, or the
/// geometry error of the first stage that cannot proceed.
pub fn analyze_piece(points: Vec<Point>, config: &PipelineConfig) -> Result<Piece, PipelineError> {
    Pipeline::new(points, config.clone()).complete()
}

/// Analyse a piece with hand-picked hull points added to the computed
/// hull.
///
/// Each extra point is snapped to the nearest border point first, see
/// [`HullBuilt::with_extra_hull_points`](pipeline::HullBuilt::with_extra_hull_points).
///
/// # Errors
///
/// As [`analyze_piece`].
pub fn analyze_piece_with_hull_points(
    points: Vec<Point>,
    extra_hull_points: &[Point],
    config: &PipelineConfig,
) -> Result<Piece, PipelineError> {
    Pipeline::new(points, config.clone())
        .trace_border()?
        .build_hull()
        .with_extra_hull_points(extra_hull_points)
        .complete()
}

/// Split a field of foreground points into pieces and analyse each.
///
/// # Pipeline steps
///
/// 1. 4-connected component extraction
/// 2. Discarding small components (dust, glare) by the largest size gap
/// 3. Per-piece analysis, on the rayon pool when `config.parallel`
///
/// Results are in component order. A failed piece yields an `Err`
/// entry without affecting the others; an invalid config fails every
/// entry.
#[must_use]
pub fn detect_pieces(points: &[Point], config: &PipelineConfig) -> Vec<Result<Piece, PipelineError>> {
    let components = components::extract_components(points);
    let found = components.len();
    let candidates = components::discard_imperfections(components);
    log::debug!(
        "{} of {found} components kept as piece candidates",
        candidates.len(),
    );

    let analyze = |candidate: PieceCandidate| {
        let result = analyze_piece(candidate.into_points(), config);
        if let Err(ref e) = result {
            log::warn!("piece analysis failed: {e}");
        }
        result
    };

    if config.parallel {
        candidates.into_par_iter().map(analyze).collect()
    } else {
        candidates.into_iter().map(analyze).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square_at(x0: i32, y0: i32, side: i32) -> impl Iterator<Item = Point> {
        (y0..y0 + side).flat_map(move |y| (x0..x0 + side).map(move |x| Point::new(x, y)))
    }

    #[test]
    fn empty_field_has_no_pieces() {
        assert!(detect_pieces(&[], &PipelineConfig::default()).is_empty());
    }

    #[test]
    fn invalid_config_fails_every_piece() {
        let points: Vec<Point> = square_at(0, 0, 10).chain(square_at(20, 0, 10)).collect();
        let config = PipelineConfig {
            lock_circularity: 0.0,
            ..PipelineConfig::default()
        };
        let results = detect_pieces(&points, &config);
        assert_eq!(results.len(), 2);
        assert!(
            results
                .iter()
                .all(|r| matches!(r, Err(PipelineError::InvalidConfig(_))))
        );
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let points: Vec<Point> = square_at(0, 0, 30)
            .chain(square_at(40, 0, 30))
            .chain(square_at(0, 40, 30))
            .collect();
        let parallel = detect_pieces(&points, &PipelineConfig::default());
        let sequential = detect_pieces(
            &points,
            &PipelineConfig {
                parallel: false,
                ..PipelineConfig::default()
            },
        );
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.len(), 3);
    }

    #[test]
    fn analyze_piece_without_extras_matches_plain_run() {
        let points: Vec<Point> = square_at(0, 0, 20).collect();
        let config = PipelineConfig::default();
        assert_eq!(
            analyze_piece_with_hull_points(points.clone(), &[], &config).unwrap(),
            analyze_piece(points, &config).unwrap()
        );
    }
}
