//! Shared prefix of both processing branches: downsample, then mirror.
//!
//! The longest axis is capped at [`MAX_WORKING_DIMENSION`] before any
//! per-pixel work so the cost of every later stage is bounded. The cap is
//! fixed; it is not part of [`Settings`](crate::Settings). Images are
//! never upscaled here; scaling up to print resolution happens only in
//! the page composer.
//!
//! Mirroring is applied once, to the working raster, so every downstream
//! stage sees the flipped image.

use image::imageops::{self, FilterType};

use crate::types::RgbaImage;

/// Longest allowed edge of the working raster, in pixels.
pub const MAX_WORKING_DIMENSION: u32 = 2500;

/// Resampling filter used when the source exceeds the working cap.
const DOWNSAMPLE_FILTER: FilterType = FilterType::Triangle;

/// Output of the prepare stage.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Working raster, downsampled and mirrored as requested.
    pub raster: RgbaImage,
    /// Whether the source exceeded the working cap.
    pub downsampled: bool,
}

/// Downsample `source` so its longest axis is at most
/// [`MAX_WORKING_DIMENSION`], then flip it horizontally when `mirrored`.
#[must_use]
pub fn prepare(source: &RgbaImage, mirrored: bool) -> Prepared {
    let (raster, downsampled) = downsample(source, MAX_WORKING_DIMENSION);
    let raster = if mirrored {
        imageops::flip_horizontal(&raster)
    } else {
        raster
    };
    Prepared {
        raster,
        downsampled,
    }
}

/// Downsample `image` so the longest axis is at most `max_dimension`
/// pixels, preserving aspect ratio.
///
/// Returns the (possibly unchanged) image and whether downsampling was
/// actually applied.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn downsample(image: &RgbaImage, max_dimension: u32) -> (RgbaImage, bool) {
    let (w, h) = (image.width(), image.height());
    let long_axis = w.max(h);

    if long_axis <= max_dimension {
        return (image.clone(), false);
    }

    let scale = f64::from(max_dimension) / f64::from(long_axis);
    let new_w = ((f64::from(w) * scale).round() as u32).max(1);
    let new_h = ((f64::from(h) * scale).round() as u32).max(1);
    (imageops::resize(image, new_w, new_h, DOWNSAMPLE_FILTER), true)
}
