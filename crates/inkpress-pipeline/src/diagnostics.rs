//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Diagnostics are permanent instrumentation for tuning thresholds and
//! detail levels. [`process_staged_with_diagnostics`] runs the whole
//! pipeline, keeps every intermediate, and times each stage.
//!
//! Time is read through the [`Clock`] trait so this crate stays free of
//! platform timers; callers inject `std::time::Instant` (or a fake in
//! tests).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::binarize::{binarize, ink_count};
use crate::decode::ensure_nonempty;
use crate::detail::{DetailAction, apply_detail, detail_action};
use crate::luma::luma_plane;
use crate::morphology::{adjust_thickness, passes_for};
use crate::prepare::prepare;
use crate::realism::{AppliedSteps, tone_map};
use crate::types::{
    LumaPlane, Mode, PipelineError, RgbaImage, Settings, StagedResult, Treatment, binary_to_rgba,
    plane_to_gray,
};

/// Source of elapsed time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Clock that never advances. Used when only the staged result matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stencil-only stages are `None` on the realism branch and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Downsample and mirror.
    pub prepare: StageDiagnostics,
    /// Luma extraction (stencil only).
    pub luma: Option<StageDiagnostics>,
    /// Detail filter (stencil only).
    pub detail: Option<StageDiagnostics>,
    /// Binarization (stencil only).
    pub binarize: Option<StageDiagnostics>,
    /// Thickness adjustment (stencil only).
    pub morphology: Option<StageDiagnostics>,
    /// Tone mapping (realism only).
    pub realism: Option<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Downsample and mirror metrics.
    Prepare {
        /// Source width in pixels.
        source_width: u32,
        /// Source height in pixels.
        source_height: u32,
        /// Working width in pixels.
        width: u32,
        /// Working height in pixels.
        height: u32,
        /// Whether the working cap forced a downsample.
        downsampled: bool,
        /// Whether the raster was flipped horizontally.
        mirrored: bool,
    },
    /// Luma extraction metrics.
    Luma {
        /// Mean luma over the plane.
        mean: f64,
    },
    /// Detail filter metrics.
    Detail {
        /// Raw detail level from the settings.
        level: i32,
        /// What the level meant in this mode.
        action: DetailAction,
    },
    /// Binarization metrics.
    Binarize {
        /// Algorithm name.
        algorithm: String,
        /// Threshold from the settings.
        threshold: u8,
        /// Ink pixels in the map.
        ink_pixel_count: u64,
        /// Total pixels in the map.
        total_pixel_count: u64,
    },
    /// Morphology metrics.
    Morphology {
        /// Passes actually run (after the cap).
        passes: u32,
        /// `true` for dilation, `false` for erosion.
        dilate: bool,
        /// Ink pixels before adjustment.
        ink_before: u64,
        /// Ink pixels after adjustment.
        ink_after: u64,
    },
    /// Realism tone mapping metrics.
    Realism {
        /// Which steps ran.
        applied: AppliedSteps,
    },
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Processing mode.
    pub mode: Mode,
    /// Working raster width in pixels.
    pub image_width: u32,
    /// Working raster height in pixels.
    pub image_height: u32,
    /// Total working pixel count.
    pub pixel_count: u64,
    /// Ink pixels in the final stencil (`None` for realism).
    pub final_ink_count: Option<u64>,
}

/// Time one stage, returning its output and elapsed time.
fn timed<C: Clock, T>(clock: &C, stage: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let out = stage();
    (out, clock.elapsed(&start))
}

/// Run the pipeline on a decoded raster, keeping every intermediate and
/// timing each stage.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `settings` fails
/// validation, [`PipelineError::ZeroArea`] if `source` has no pixels.
#[allow(clippy::too_many_lines)]
pub fn process_staged_with_diagnostics<C: Clock>(
    source: &RgbaImage,
    settings: &Settings,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    settings.validate()?;
    ensure_nonempty(source)?;

    let total_start = clock.now();

    let (prepared, prepare_duration) = timed(clock, || prepare(source, settings.mirrored));
    let (width, height) = prepared.raster.dimensions();
    let pixel_count = u64::from(width) * u64::from(height);
    tracing::debug!(
        source_width = source.width(),
        source_height = source.height(),
        width,
        height,
        downsampled = prepared.downsampled,
        mirrored = settings.mirrored,
        "prepared working raster",
    );
    let prepare_diag = StageDiagnostics {
        duration: prepare_duration,
        metrics: StageMetrics::Prepare {
            source_width: source.width(),
            source_height: source.height(),
            width,
            height,
            downsampled: prepared.downsampled,
            mirrored: settings.mirrored,
        },
    };

    let (staged, stages, final_ink_count) = match settings.treatment() {
        Treatment::Realism(config) => {
            let mut output = prepared.raster.clone();
            let (applied, duration) = timed(clock, || tone_map(&mut output, &config));
            let applied = applied?;
            let staged = StagedResult {
                prepared: prepared.raster,
                luma: None,
                detail: None,
                binary: None,
                thickened: None,
                output,
            };
            let realism = StageDiagnostics {
                duration,
                metrics: StageMetrics::Realism { applied },
            };
            (staged, BranchStages::realism(realism), None)
        }
        Treatment::Stencil(config) => {
            let (luma, luma_duration) = timed(clock, || luma_plane(&prepared.raster));
            let luma_diag = StageDiagnostics {
                duration: luma_duration,
                metrics: StageMetrics::Luma {
                    mean: plane_mean(&luma),
                },
            };

            let (detail, detail_duration) = timed(clock, || {
                apply_detail(&luma, config.detail_level, config.algorithm)
            });
            let detail_diag = StageDiagnostics {
                duration: detail_duration,
                metrics: StageMetrics::Detail {
                    level: config.detail_level,
                    action: detail_action(config.detail_level, config.algorithm),
                },
            };

            let (binary, binarize_duration) = timed(clock, || {
                binarize(
                    &detail,
                    config.algorithm,
                    config.threshold,
                    config.detail_level,
                )
            });
            let ink_before = ink_count(&binary);
            tracing::debug!(
                algorithm = %config.algorithm,
                threshold = config.threshold,
                ink = ink_before,
                total = pixel_count,
                "binarized",
            );
            let binarize_diag = StageDiagnostics {
                duration: binarize_duration,
                metrics: StageMetrics::Binarize {
                    algorithm: config.algorithm.to_string(),
                    threshold: config.threshold,
                    ink_pixel_count: ink_before,
                    total_pixel_count: pixel_count,
                },
            };

            let (thickened, morphology_duration) =
                timed(clock, || adjust_thickness(&binary, config.thickness));
            let (passes, dilate) = passes_for(config.thickness);
            let ink_after = ink_count(&thickened);
            tracing::debug!(passes, dilate, ink_before, ink_after, "adjusted thickness");
            let morphology_diag = StageDiagnostics {
                duration: morphology_duration,
                metrics: StageMetrics::Morphology {
                    passes,
                    dilate,
                    ink_before,
                    ink_after,
                },
            };

            let output = binary_to_rgba(&thickened);
            let staged = StagedResult {
                prepared: prepared.raster,
                luma: Some(plane_to_gray(&luma)),
                detail: Some(plane_to_gray(&detail)),
                binary: Some(plane_to_gray(&binary)),
                thickened: Some(plane_to_gray(&thickened)),
                output,
            };
            let stages = BranchStages {
                luma: Some(luma_diag),
                detail: Some(detail_diag),
                binarize: Some(binarize_diag),
                morphology: Some(morphology_diag),
                realism: None,
            };
            (staged, stages, Some(ink_after))
        }
    };

    let diagnostics = PipelineDiagnostics {
        prepare: prepare_diag,
        luma: stages.luma,
        detail: stages.detail,
        binarize: stages.binarize,
        morphology: stages.morphology,
        realism: stages.realism,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            mode: settings.mode,
            image_width: width,
            image_height: height,
            pixel_count,
            final_ink_count,
        },
    };

    Ok((staged, diagnostics))
}

/// Branch-dependent stage diagnostics gathered before assembly.
struct BranchStages {
    luma: Option<StageDiagnostics>,
    detail: Option<StageDiagnostics>,
    binarize: Option<StageDiagnostics>,
    morphology: Option<StageDiagnostics>,
    realism: Option<StageDiagnostics>,
}

impl BranchStages {
    const fn realism(realism: StageDiagnostics) -> Self {
        Self {
            luma: None,
            detail: None,
            binarize: None,
            morphology: None,
            realism: Some(realism),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn plane_mean(plane: &LumaPlane) -> f64 {
    let len = plane.as_raw().len();
    if len == 0 {
        return 0.0;
    }
    plane.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / len as f64
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Mode: {:?}  |  Working image: {}x{} ({} pixels)",
            self.summary.mode,
            self.summary.image_width,
            self.summary.image_height,
            self.summary.pixel_count,
        ));
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

        let optional = [
            ("Luma", &self.luma),
            ("Detail", &self.detail),
            ("Binarize", &self.binarize),
            ("Morphology", &self.morphology),
            ("Realism", &self.realism),
        ];
        let stages = std::iter::once(("Prepare", &self.prepare)).chain(
            optional
                .into_iter()
                .filter_map(|(name, diag)| diag.as_ref().map(|d| (name, d))),
        );

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

        if let Some(ink) = self.summary.final_ink_count {
            lines.push(String::new());
            lines.push(format!("Final ink pixels: {ink}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Prepare {
            source_width,
            source_height,
            width,
            height,
            downsampled,
            mirrored,
        } => format!(
            "{source_width}x{source_height} -> {width}x{height} downsampled={downsampled} mirrored={mirrored}"
        ),
        StageMetrics::Luma { mean } => format!("mean={mean:.1}"),
        StageMetrics::Detail { level, action } => format!("level={level} {action:?}"),
        StageMetrics::Binarize {
            algorithm,
            threshold,
            ink_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *ink_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{algorithm} threshold={threshold} ink={ink_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Morphology {
            passes,
            dilate,
            ink_before,
            ink_after,
        } => {
            let op = if *dilate { "dilate" } else { "erode" };
            format!("{op} x{passes} ink {ink_before}->{ink_after}")
        }
        StageMetrics::Realism { applied } => format!(
            "pre_filter={} vibrance={} brilliance={} sharpen={}",
            applied.pre_filter, applied.vibrance, applied.brilliance, applied.sharpen,
        ),
    }
}
