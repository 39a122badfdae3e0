//! inkpress: turn photographs into printable stencil pages.
//!
//! Reads one or more images, runs each through the stencil pipeline with
//! the same settings, composes an A4 page per image, and writes it as
//! `<stem>-stencil.png` in the output directory. Images are processed in
//! parallel; results are reported in input order.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin inkpress -- [OPTIONS] --output-dir <DIR> <IMAGES>...
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use inkpress_export::{ExportError, PageLayout};
use inkpress_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use inkpress_pipeline::{PipelineError, Settings, VariantCount};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Turn photographs into printable stencils laid out on A4 pages.
#[derive(Parser)]
#[command(name = "inkpress", version)]
struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Directory that receives `<stem>-stencil.png` pages.
    #[arg(long, short)]
    output_dir: PathBuf,

    /// Processing mode.
    #[arg(long, value_enum, default_value_t = CliMode::Solid)]
    mode: CliMode,

    /// Binarization threshold (0-255); higher means more ink.
    #[arg(long, default_value_t = Settings::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Line thickness: positive dilates, negative erodes (capped at 15 passes).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    thickness: i32,

    /// Detail level: negative sharpens, positive smooths or widens outlines.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    detail_level: i32,

    /// Flip the image horizontally (for transfer printing).
    #[arg(long)]
    mirrored: bool,

    /// Lay out a grid of size variants instead of one fitted image.
    #[arg(long)]
    multi_size: bool,

    /// Number of size variants (3, 6, or 9; anything else means 9).
    #[arg(long, default_value_t = 9)]
    variants: u32,

    /// Smallest variant, longer side in inches.
    #[arg(long, default_value_t = Settings::DEFAULT_MIN_SIZE)]
    min_size: f64,

    /// Largest variant, longer side in inches.
    #[arg(long, default_value_t = Settings::DEFAULT_MAX_SIZE)]
    max_size: f64,

    /// Omit the inch labels under size variants.
    #[arg(long)]
    no_dimensions: bool,

    /// Realism saturation percentage (100 = unchanged).
    #[arg(long, default_value_t = Settings::NEUTRAL_PERCENT)]
    saturation: f32,

    /// Realism contrast percentage (100 = unchanged).
    #[arg(long, default_value_t = Settings::NEUTRAL_PERCENT)]
    contrast: f32,

    /// Realism brightness percentage (100 = unchanged).
    #[arg(long, default_value_t = Settings::NEUTRAL_PERCENT)]
    brightness: f32,

    /// Realism sharpening strength (0 = off).
    #[arg(long, default_value_t = 0.0)]
    sharpness: f32,

    /// Realism brilliance (-100 to 100, 0 = off).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    brilliance: f32,

    /// Settings JSON file; all settings flags are ignored when given.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Settings as an inline JSON string; all settings flags are ignored
    /// when given.
    #[arg(long)]
    config_json: Option<String>,

    /// Print a per-stage diagnostics report for each image.
    #[arg(long)]
    diagnostics: bool,

    /// Print results (and diagnostics) as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// Processing mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    /// Filled shapes via adaptive threshold.
    Solid,
    /// Outlines via difference of Gaussians.
    Hollow,
    /// Tone-mapped full-color output.
    Realism,
}

impl From<CliMode> for inkpress_pipeline::Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Solid => Self::Solid,
            CliMode::Hollow => Self::Hollow,
            CliMode::Realism => Self::Realism,
        }
    }
}

/// Build [`Settings`] from the command line.
///
/// `--config` and `--config-json` replace every individual flag.
fn settings_from_cli(cli: &Cli) -> Result<Settings, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }

    Ok(Settings {
        threshold: cli.threshold,
        thickness: cli.thickness,
        detail_level: cli.detail_level,
        mode: cli.mode.into(),
        mirrored: cli.mirrored,
        multi_size: cli.multi_size,
        variant_count: VariantCount::from_count(cli.variants),
        min_size: cli.min_size,
        max_size: cli.max_size,
        show_dimensions: !cli.no_dimensions,
        saturation: cli.saturation,
        contrast: cli.contrast,
        brightness: cli.brightness,
        sharpness: cli.sharpness,
        brilliance: cli.brilliance,
    })
}

/// Failure while turning one input file into one page.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("cannot read input: {0}")]
    Read(std::io::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A page written for one input.
struct Rendered {
    output: PathBuf,
    diagnostics: Option<PipelineDiagnostics>,
}

/// Output path for `input` inside `dir`.
fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    dir.join(format!("{stem}-stencil.png"))
}

fn run_one(
    input: &Path,
    settings: &Settings,
    output_dir: &Path,
    collect_diagnostics: bool,
) -> Result<Rendered, RunError> {
    let bytes = std::fs::read(input).map_err(RunError::Read)?;
    let source = inkpress_pipeline::decode(&bytes)?;

    let (processed, diagnostics) = if collect_diagnostics {
        let (staged, diagnostics) =
            inkpress_pipeline::process_staged_with_diagnostics(&source, settings, &StdClock)?;
        (staged.output, Some(diagnostics))
    } else {
        (inkpress_pipeline::process_raster(&source, settings)?, None)
    };

    let png = inkpress_export::render_page(&processed, settings, &PageLayout::A4)?;
    let output = output_path(output_dir, input);
    std::fs::write(&output, &png).map_err(|source| RunError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        bytes = png.len(),
        "page written",
    );
    Ok(Rendered {
        output,
        diagnostics,
    })
}

/// One line of `--json` output.
#[derive(Serialize)]
struct JsonReport<'a> {
    image: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a PipelineDiagnostics>,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = settings.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = std::fs::create_dir_all(&cli.output_dir) {
        eprintln!("Error creating {}: {e}", cli.output_dir.display());
        return ExitCode::FAILURE;
    }

    tracing::info!(images = cli.images.len(), mode = ?settings.mode, "processing batch");

    let collect_diagnostics = cli.diagnostics || cli.json;
    let results: Vec<Result<Rendered, RunError>> = cli
        .images
        .par_iter()
        .map(|input| run_one(input, &settings, &cli.output_dir, collect_diagnostics))
        .collect();

    let mut failures = 0usize;
    for (input, result) in cli.images.iter().zip(&results) {
        if result.is_err() {
            failures += 1;
        }
        if cli.json {
            let report = match result {
                Ok(rendered) => JsonReport {
                    image: input,
                    output: Some(&rendered.output),
                    error: None,
                    diagnostics: rendered.diagnostics.as_ref(),
                },
                Err(e) => JsonReport {
                    image: input,
                    output: None,
                    error: Some(e.to_string()),
                    diagnostics: None,
                },
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error serializing report: {e}"),
            }
            continue;
        }
        match result {
            Ok(rendered) => {
                eprintln!("{} -> {}", input.display(), rendered.output.display());
                if let Some(diagnostics) = &rendered.diagnostics {
                    println!("{}", input.display());
                    println!("{}", diagnostics.report());
                }
            }
            Err(e) => eprintln!("{}: {e}", input.display()),
        }
    }

    if failures > 0 {
        eprintln!("{failures} of {} images failed", cli.images.len());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
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
