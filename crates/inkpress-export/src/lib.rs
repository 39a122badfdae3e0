//! inkpress-export: Page composition and encoding (sans-IO)
//!
//! Places a processed raster on a physical page, either once or as a
//! grid of size variants with inch labels, and encodes the page as PNG.
//! Page geometry comes from [`PageLayout`] rather than constants so
//! non-A4 pages can be composed in tests.

pub mod label;
pub mod page;
pub mod png;

pub use label::LabelFont;
pub use page::{PageLayout, compose, compose_multi, compose_single, grid_shape, variant_sizes};
pub use png::{encode_png, render_page};

/// Errors from page composition and encoding.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The page canvas could not be allocated.
    #[error("cannot allocate a {width}x{height} page canvas")]
    Allocation {
        /// Requested canvas width in pixels.
        width: u32,
        /// Requested canvas height in pixels.
        height: u32,
    },

    /// The layout or size range cannot produce a page.
    #[error("invalid page layout: {0}")]
    InvalidLayout(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// The embedded label font could not be parsed.
    #[error("embedded label font is invalid")]
    Font,
}
