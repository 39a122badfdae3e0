//! Lossless PNG encoding of composed pages.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use inkpress_pipeline::Settings;

use crate::ExportError;
use crate::page::{PageLayout, compose};

/// Encode `page` as an RGBA PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_png(page: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        page.as_raw(),
        page.width(),
        page.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Compose the page for `settings` and encode it.
///
/// # Errors
///
/// As [`compose`] and [`encode_png`].
pub fn render_page(
    processed: &RgbaImage,
    settings: &Settings,
    layout: &PageLayout,
) -> Result<Vec<u8>, ExportError> {
    let page = compose(processed, settings, layout)?;
    let png = encode_png(&page)?;
    tracing::debug!(bytes = png.len(), "encoded page");
    Ok(png)
}
