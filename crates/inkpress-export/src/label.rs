//! Dimension labels drawn onto the page with an embedded font.

use ab_glyph::{FontRef, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::ExportError;

// Redistributed under the DejaVu Fonts License, see assets/LICENSE-DejaVu.txt.
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

/// Label ink colour.
pub const LABEL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// The embedded bold sans-serif used for size labels.
#[derive(Debug, Clone)]
pub struct LabelFont {
    font: FontRef<'static>,
}

impl LabelFont {
    /// Parse the embedded font.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Font`] if the font data cannot be parsed.
    pub fn load() -> Result<Self, ExportError> {
        let font = FontRef::try_from_slice(FONT_DATA).map_err(|_| ExportError::Font)?;
        Ok(Self { font })
    }

    /// Rendered `(width, height)` of `text` at `px` pixels.
    #[must_use]
    pub fn measure(&self, text: &str, px: u32) -> (u32, u32) {
        text_size(scale(px), &self.font, text)
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Glyphs beyond
    /// the canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, px: u32) {
        draw_text_mut(canvas, LABEL_COLOR, x, y, scale(px), &self.font, text);
    }
}

#[allow(clippy::cast_precision_loss)]
fn scale(px: u32) -> PxScale {
    PxScale::from(px as f32)
}

/// Label text for a physical size in inches, e.g. `2.5"`.
#[must_use]
pub fn size_label(inches: f64) -> String {
    format!("{inches:.1}\"")
}
