//! Realism tone mapping: the full-color alternative to binarization.
//!
//! Steps, in order, each skipped when its setting is neutral:
//!
//! 1. contrast then brightness pre-filter (percentages, 100 = identity)
//! 2. vibrance: saturation change weighted towards muted colours
//! 3. brilliance: shadow lift and highlight damping on luma, applied
//!    to RGB by ratio so hue is preserved
//! 4. sharpening with a 3x3 Laplacian-style kernel whose weights sum
//!    to one
//!
//! Alpha is never modified. The output is never binary and bypasses the
//! morphology stage.

use crate::convolve::convolve_rgb;
use crate::luma::rec601;
use crate::types::{PipelineError, RealismConfig, RgbaImage};

/// Luma below which the brilliance ratio is not applied.
const BRILLIANCE_MIN_LUMA: f32 = 1e-3;

/// Steps actually applied by one [`tone_map`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppliedSteps {
    /// Contrast/brightness pre-filter ran.
    pub pre_filter: bool,
    /// Vibrance ran.
    pub vibrance: bool,
    /// Brilliance curve ran.
    pub brilliance: bool,
    /// Sharpening convolution ran.
    pub sharpen: bool,
}

/// Tone-map `raster` in place.
///
/// # Errors
///
/// Propagates [`PipelineError::InvalidKernel`] from the sharpening
/// convolution (not reachable with the built-in 3x3 kernel).
pub fn tone_map(
    raster: &mut RgbaImage,
    config: &RealismConfig,
) -> Result<AppliedSteps, PipelineError> {
    let mut applied = AppliedSteps::default();

    if !is_neutral_percent(config.contrast) || !is_neutral_percent(config.brightness) {
        pre_filter(raster, config.contrast, config.brightness);
        applied.pre_filter = true;
    }
    if !is_neutral_percent(config.saturation) {
        vibrance(raster, config.saturation);
        applied.vibrance = true;
    }
    if config.brilliance != 0.0 {
        brilliance(raster, config.brilliance);
        applied.brilliance = true;
    }
    if config.sharpness > 0.0 {
        convolve_rgb(raster, &sharpen_kernel(config.sharpness))?;
        applied.sharpen = true;
    }

    tracing::debug!(?applied, "realism tone mapping applied");
    Ok(applied)
}

fn is_neutral_percent(value: f32) -> bool {
    (value - 100.0).abs() < f32::EPSILON
}

/// Contrast about mid-gray, then brightness as a multiplier.
pub fn pre_filter(raster: &mut RgbaImage, contrast: f32, brightness: f32) {
    let contrast = contrast / 100.0;
    let brightness = brightness / 100.0;
    map_rgb(raster, |rgb| {
        rgb.map(|v| {
            let v = (v - 128.0).mul_add(contrast, 128.0).clamp(0.0, 255.0);
            (v * brightness).clamp(0.0, 255.0)
        })
    });
}

/// Saturation change that favours muted colours when boosting.
///
/// `strength = (saturation - 100) / 100`. Positive strength scales each
/// pixel's boost by `1 - sat^2` and adds a small contrast pop; negative
/// strength desaturates linearly.
pub fn vibrance(raster: &mut RgbaImage, saturation: f32) {
    let strength = (saturation - 100.0) / 100.0;
    let pop = 0.02f32.mul_add(strength, 1.05);
    map_rgb(raster, |[r, g, b]| {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let sat = if max == 0.0 { 0.0 } else { (max - min) / max };
        let boost = if strength >= 0.0 {
            strength * sat.mul_add(-sat, 1.0)
        } else {
            strength
        };
        let gray = rec601(r, g, b);
        [r, g, b].map(|c| {
            let mut v = (c - gray).mul_add(1.0 + boost, gray);
            if strength > 0.0 {
                v = (v - 128.0).mul_add(pop, 128.0);
            }
            v.clamp(0.0, 255.0)
        })
    });
}

/// Map one normalized luma through the brilliance curve.
#[must_use]
pub fn brilliance_curve(y: f32, strength: f32) -> f32 {
    if strength > 0.0 {
        let shadow_lift = (1.0 - y).powi(5) * strength;
        let highlight_damp = y.powi(4) * 0.4 * strength;
        let lifted = y + shadow_lift - highlight_damp;
        (lifted - 0.5)
            .mul_add(0.5f32.mul_add(strength, 1.0), 0.5)
            .clamp(0.0, 1.0)
    } else {
        y * strength.mul_add(0.5, 1.0)
    }
}

/// Apply [`brilliance_curve`] to each pixel's luma and rescale RGB by
/// the same ratio.
pub fn brilliance(raster: &mut RgbaImage, brilliance: f32) {
    let strength = brilliance / 100.0;
    map_rgb(raster, |rgb @ [r, g, b]| {
        let y = rec601(r, g, b) / 255.0;
        if y < BRILLIANCE_MIN_LUMA {
            return rgb;
        }
        let ratio = brilliance_curve(y, strength) / y;
        rgb.map(|c| (c * ratio).clamp(0.0, 255.0))
    });
}

/// `[0, -s, 0, -s, 4s + 1, -s, 0, -s, 0]`: weights sum to one.
#[must_use]
pub fn sharpen_kernel(sharpness: f32) -> [f32; 9] {
    let s = sharpness;
    [0.0, -s, 0.0, -s, 4.0f32.mul_add(s, 1.0), -s, 0.0, -s, 0.0]
}

/// Apply `f` to the RGB channels of every pixel, rounding back to bytes.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn map_rgb(raster: &mut RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) {
    for pixel in raster.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let mapped = f([f32::from(r), f32::from(g), f32::from(b)]);
        for (channel, value) in mapped.into_iter().enumerate() {
            pixel.0[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
}
