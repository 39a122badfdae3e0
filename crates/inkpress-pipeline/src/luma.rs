//! RGB to luma projection.
//!
//! Produces a floating-point [`LumaPlane`] using the Rec.601 weights
//! `0.299*R + 0.587*G + 0.114*B`. Alpha is ignored.

use crate::types::{LumaPlane, RgbaImage};

/// Rec.601 luma of one RGB triple, in `[0, 255]`.
#[must_use]
pub fn rec601(r: f32, g: f32, b: f32) -> f32 {
    0.114f32.mul_add(b, 0.299f32.mul_add(r, 0.587 * g))
}

/// Project an RGBA raster onto a single-channel luma plane.
#[must_use = "returns the luma plane"]
pub fn luma_plane(raster: &RgbaImage) -> LumaPlane {
    LumaPlane::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, _] = raster.get_pixel(x, y).0;
        image::Luma([rec601(f32::from(r), f32::from(g), f32::from(b))])
    })
}
