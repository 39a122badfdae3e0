//! Detail filtering ahead of binarization.
//!
//! One settings field, `detail_level`, drives two different mechanisms:
//!
//! - negative values sharpen with an unsharp mask in every stencil mode;
//! - positive values pre-blur the luma in solid mode
//!   ([`smoothing_radius`]), but in hollow mode they are left for the
//!   difference-of-Gaussians stage, which widens its radii instead
//!   ([`dog_radii`]).
//!
//! The split is kept in two interpretation functions so each mode's
//! reading of the control stays in one place.

use crate::blur::box_blur;
use crate::types::{LumaPlane, StencilAlgorithm};

/// Radius of the blur subtracted by the unsharp mask.
const SHARPEN_BLUR_RADIUS: u32 = 1;

/// Unsharp-mask gain per step of negative detail level.
const SHARPEN_GAIN_PER_LEVEL: f32 = 0.5;

/// How the detail filter treats a given level in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DetailAction {
    /// No change.
    Passthrough,
    /// Unsharp mask with this gain.
    Sharpen {
        /// Multiplier applied to `luma - blur(luma)`.
        strength: f32,
    },
    /// Box blur with this radius.
    Smooth {
        /// Blur radius in pixels.
        radius: u32,
    },
}

/// Decide what the detail filter does for `detail_level` in `algorithm`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detail_action(detail_level: i32, algorithm: StencilAlgorithm) -> DetailAction {
    if detail_level < 0 {
        return DetailAction::Sharpen {
            strength: detail_level.unsigned_abs() as f32 * SHARPEN_GAIN_PER_LEVEL,
        };
    }
    smoothing_radius(detail_level, algorithm)
        .map_or(DetailAction::Passthrough, |radius| DetailAction::Smooth {
            radius,
        })
}

/// Solid-mode reading of a positive detail level: a pre-blur radius.
///
/// Hollow mode never pre-blurs, so this returns `None` for it.
#[must_use]
pub fn smoothing_radius(detail_level: i32, algorithm: StencilAlgorithm) -> Option<u32> {
    match algorithm {
        StencilAlgorithm::Solid if detail_level > 0 => Some(detail_level.unsigned_abs()),
        StencilAlgorithm::Solid | StencilAlgorithm::Hollow => None,
    }
}

/// Hollow-mode reading of the detail level: the inner and outer
/// difference-of-Gaussians radii, before rounding up.
///
/// `r1 = max(0.5, max(0, level) * 0.8)` and `r2 = 2.5 * r1`. Negative
/// levels (which sharpen) leave the radii at their minimum.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dog_radii(detail_level: i32) -> (f32, f32) {
    let effective = detail_level.max(0) as f32;
    let inner = (effective * 0.8).max(0.5);
    (inner, inner * 2.5)
}

/// Apply the detail filter to a raw luma plane.
#[must_use = "returns the filtered plane"]
pub fn apply_detail(luma: &LumaPlane, detail_level: i32, algorithm: StencilAlgorithm) -> LumaPlane {
    match detail_action(detail_level, algorithm) {
        DetailAction::Passthrough => luma.clone(),
        DetailAction::Smooth { radius } => box_blur(luma, radius),
        DetailAction::Sharpen { strength } => unsharp_mask(luma, strength),
    }
}

/// `clamp(l + (l - blur(l, 1)) * strength, 0, 255)`.
fn unsharp_mask(luma: &LumaPlane, strength: f32) -> LumaPlane {
    let blurred = box_blur(luma, SHARPEN_BLUR_RADIUS);
    let mut out = luma.clone();
    for (o, b) in out.pixels_mut().zip(blurred.pixels()) {
        let l = o.0[0];
        o.0[0] = (l - b.0[0]).mul_add(strength, l).clamp(0.0, 255.0);
    }
    out
}
