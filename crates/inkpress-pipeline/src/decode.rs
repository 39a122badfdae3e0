//! Raster input: decoding encoded bytes or wrapping a raw RGBA buffer.
//!
//! Both paths produce an [`RgbaImage`] with at least one pixel. Anything
//! else is rejected before processing starts so no partial output is ever
//! produced.

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes into an RGBA raster.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// can decode with the enabled features).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`PipelineError::ZeroArea`] if the decoded image has no pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let raster = image::load_from_memory(bytes)?.to_rgba8();
    ensure_nonempty(&raster)?;
    Ok(raster)
}

/// Wrap a raw row-major RGBA8 buffer supplied by the caller.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if either dimension is zero.
/// Returns [`PipelineError::BufferSize`] if `bytes` does not hold exactly
/// `width * height * 4` bytes.
pub fn raster_from_rgba8(
    width: u32,
    height: u32,
    bytes: Vec<u8>,
) -> Result<RgbaImage, PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::ZeroArea { width, height });
    }

    let expected = (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4);
    let actual = bytes.len();
    RgbaImage::from_raw(width, height, bytes)
        .filter(|raster| raster.as_raw().len() == expected)
        .ok_or(PipelineError::BufferSize { expected, actual })
}

/// Reject rasters with no pixels.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if either dimension is zero.
pub fn ensure_nonempty(raster: &RgbaImage) -> Result<(), PipelineError> {
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(PipelineError::ZeroArea { width, height });
    }
    Ok(())
}
