//! jigsaw-bench: CLI tool for running the piece pipeline on a mask and
//! collecting diagnostics.
//!
//! Accepts either a binary mask image (any format the `image` crate
//! decodes, luma above 127 is foreground) or a JSON array of
//! `{"x": .., "y": ..}` points. Useful for:
//!
//! - Tuning the defect depth and lock circularity thresholds
//! - Measuring per-stage durations to identify bottlenecks
//! - Checking which pieces are fully detected
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin jigsaw-bench -- [OPTIONS] <INPUT_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use jigsaw_pipeline::diagnostics::{Clock, PieceDiagnostics};
use jigsaw_pipeline::{Piece, PipelineConfig, Point};

/// Jigsaw piece analysis and diagnostics.
///
/// Splits the input into pieces, analyses each one, and prints per-stage
/// timing and count diagnostics.
#[derive(Parser)]
#[command(name = "jigsaw-bench", version)]
struct Cli {
    /// Path to a mask image or a `.json` point list.
    input_path: PathBuf,

    /// Contour tracing algorithm.
    #[arg(long, value_enum, default_value_t = Tracer::Backtracking)]
    tracer: Tracer,

    /// Convexity defects must be deeper than this to count.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_DEFECT_DEPTH)]
    min_defect_depth: f64,

    /// Reference area / perimeter² ratio of a lock.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LOCK_CIRCULARITY)]
    lock_circularity: f64,

    /// Accepted deviation from the reference ratio.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_LOCK_CIRCULARITY_TOLERANCE)]
    lock_circularity_tolerance: f64,

    /// Extra hull point `X,Y`, snapped to the border of every piece.
    /// May be repeated.
    #[arg(long = "hull-point", value_parser = parse_point)]
    hull_points: Vec<Point>,

    /// Write the analysed pieces as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Log pipeline progress to stderr (`RUST_LOG` overrides).
    #[arg(short, long)]
    verbose: bool,
}

/// Contour tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// Depth-first walk with backtracking.
    Backtracking,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        contour_tracer: match cli.tracer {
            Tracer::Backtracking => jigsaw_pipeline::ContourTracerKind::Backtracking,
        },
        min_defect_depth: cli.min_defect_depth,
        lock_circularity: cli.lock_circularity,
        lock_circularity_tolerance: cli.lock_circularity_tolerance,
        ..PipelineConfig::default()
    })
}

/// Read foreground points from a mask image or a JSON point list.
fn load_points(path: &Path) -> Result<Vec<Point>, String> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let bytes =
            std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| format!("Error parsing points from {}: {e}", path.display()));
    }

    let mask = image::open(path)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))?
        .to_luma8();
    let mut points = Vec::new();
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] > 127 {
            let x = i32::try_from(x).map_err(|e| format!("mask too wide: {e}"))?;
            let y = i32::try_from(y).map_err(|e| format!("mask too tall: {e}"))?;
            points.push(Point::new(x, y));
        }
    }
    Ok(points)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let points = match load_points(&cli.input_path) {
        Ok(points) => points,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let components = jigsaw_pipeline::components::extract_components(&points);
    let component_count = components.len();
    let candidates = jigsaw_pipeline::components::discard_imperfections(components);

    eprintln!(
        "Input: {} ({} foreground points)",
        cli.input_path.display(),
        points.len(),
    );
    eprintln!(
        "Pieces: {} of {component_count} components",
        candidates.len()
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();
    log::info!("analysing {} pieces", candidates.len());

    let mut all_diagnostics = Vec::with_capacity(cli.runs * candidates.len());
    let mut pieces: Vec<Piece> = Vec::new();
    let mut failures = 0_usize;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        for (index, candidate) in candidates.iter().enumerate() {
            let result =
                jigsaw_pipeline::diagnostics::analyze_piece_with_hull_points_and_diagnostics(
                    candidate.points().to_vec(),
                    &cli.hull_points,
                    &config,
                    &StdClock,
                );

            match result {
                Ok((piece, diagnostics)) => {
                    if cli.json {
                        match serde_json::to_string_pretty(&diagnostics) {
                            Ok(json) => println!("{json}"),
                            Err(e) => {
                                eprintln!("Error serializing diagnostics: {e}");
                                return ExitCode::FAILURE;
                            }
                        }
                    } else {
                        println!("Piece {index}");
                        println!("{}", diagnostics.report());
                        println!();
                    }
                    if run == 0 {
                        pieces.push(piece);
                    }
                    all_diagnostics.push(diagnostics);
                }
                Err(e) => {
                    eprintln!("Piece {index}: pipeline error: {e}");
                    if run == 0 {
                        failures += 1;
                    }
                }
            }
        }
    }

    if let Some(ref output) = cli.output {
        match serde_json::to_string(&pieces) {
            Ok(json) => match std::fs::write(output, &json) {
                Ok(()) => eprintln!(
                    "{} pieces written to {} ({} bytes)",
                    pieces.len(),
                    output.display(),
                    json.len(),
                ),
                Err(e) => eprintln!("Error writing {}: {e}", output.display()),
            },
            Err(e) => eprintln!("Error serializing pieces: {e}"),
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    let fully = pieces.iter().filter(|p| p.is_fully_detected()).count();
    eprintln!(
        "{} pieces analysed, {fully} fully detected, {failures} failed",
        pieces.len()
    );

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PieceDiagnostics) -> Duration;

/// Print aggregated statistics across all runs and pieces.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PieceDiagnostics]) {
    println!();
    println!(
        "Summary ({} piece runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Border Tracing", |d| d.border_tracing.duration),
        ("Hull", |d| d.hull.duration),
        ("Defects", |d| d.defects.duration),
        ("Locks", |d| d.locks.duration),
        ("Normalize", |d| d.normalize.duration),
    ];

    for (name, extractor) in stage_extractors {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
