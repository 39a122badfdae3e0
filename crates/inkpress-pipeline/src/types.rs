//! Shared types for the inkpress processing pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate stage previews without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// working raster without depending on `image` directly.
pub use image::RgbaImage;

/// Single-channel floating-point plane.
///
/// Used for luma, detail-filtered luma, and binary maps. Binary maps
/// hold exactly two values: [`INK`] and [`BLANK`].
pub type LumaPlane = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// Binary map value for an ink pixel.
pub const INK: f32 = 0.0;

/// Binary map value for a blank pixel.
pub const BLANK: f32 = 255.0;

/// Rendering mode selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Filled stencil via adaptive thresholding.
    #[default]
    Solid,
    /// Outline stencil via difference of Gaussians.
    Hollow,
    /// Full-color tone mapping, no binarization.
    Realism,
}

/// Number of size variants laid out in multi-size mode.
///
/// Only three layouts exist. Any other count normalizes to
/// [`VariantCount::Nine`] rather than failing, including negative,
/// fractional and non-numeric JSON values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub enum VariantCount {
    /// One column, three rows.
    Three,
    /// Two columns, three rows.
    Six,
    /// Three columns, three rows.
    #[default]
    Nine,
}

impl VariantCount {
    /// Normalize an arbitrary count to one of the supported layouts.
    #[must_use]
    pub const fn from_count(count: u32) -> Self {
        match count {
            3 => Self::Three,
            6 => Self::Six,
            _ => Self::Nine,
        }
    }

    /// Number of cells in the layout.
    #[must_use]
    pub const fn count(self) -> u32 {
        match self {
            Self::Three => 3,
            Self::Six => 6,
            Self::Nine => 9,
        }
    }
}

impl From<u32> for VariantCount {
    fn from(count: u32) -> Self {
        Self::from_count(count)
    }
}

/// Any JSON value a producer might send for `variantCount`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVariantCount {
    Integer(i64),
    Float(f64),
    Other(#[allow(dead_code)] serde::de::IgnoredAny),
}

impl<'de> Deserialize<'de> for VariantCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let count = match RawVariantCount::deserialize(deserializer)? {
            RawVariantCount::Integer(n) => u32::try_from(n).map_or(Self::Nine, Self::from_count),
            RawVariantCount::Float(x) if (x - 3.0).abs() < f64::EPSILON => Self::Three,
            RawVariantCount::Float(x) if (x - 6.0).abs() < f64::EPSILON => Self::Six,
            RawVariantCount::Float(_) | RawVariantCount::Other(_) => Self::Nine,
        };
        Ok(count)
    }
}

impl From<VariantCount> for u32 {
    fn from(variants: VariantCount) -> Self {
        variants.count()
    }
}

/// Complete settings record for one pipeline invocation.
///
/// The core never fills in missing values: every field must be present
/// when deserializing, except `brilliance`, which some producers omit and
/// which defaults to neutral (0), and `variantCount`, which falls back
/// to nine.
///
/// `detail_level` is interpreted differently per mode: in solid mode a
/// positive value is a pre-blur radius, in hollow mode it scales the two
/// difference-of-Gaussians radii. See [`crate::detail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Binarization threshold. Higher values produce more ink.
    pub threshold: u8,

    /// Line thickness adjustment: negative erodes, positive dilates.
    pub thickness: i32,

    /// Negative values sharpen, positive values smooth (solid) or widen
    /// the edge detector (hollow).
    pub detail_level: i32,

    /// Which processing branch to run.
    pub mode: Mode,

    /// Flip the source horizontally before any other processing.
    pub mirrored: bool,

    /// Lay the result out as a grid of size variants.
    pub multi_size: bool,

    /// Number of variants in multi-size mode. Absent means nine.
    #[serde(default)]
    pub variant_count: VariantCount,

    /// Smallest variant, in inches (longer image side).
    pub min_size: f64,

    /// Largest variant, in inches (longer image side).
    pub max_size: f64,

    /// Draw an inch label under each variant.
    pub show_dimensions: bool,

    /// Realism saturation percentage (100 = neutral).
    pub saturation: f32,

    /// Realism contrast percentage (100 = neutral).
    pub contrast: f32,

    /// Realism brightness percentage (100 = neutral).
    pub brightness: f32,

    /// Realism sharpening strength (0 = off).
    pub sharpness: f32,

    /// Realism brilliance curve strength in `[-100, 100]` (0 = off).
    #[serde(default)]
    pub brilliance: f32,
}

impl Settings {
    /// Default binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 128;
    /// Default smallest variant in inches.
    pub const DEFAULT_MIN_SIZE: f64 = 2.0;
    /// Default largest variant in inches.
    pub const DEFAULT_MAX_SIZE: f64 = 6.0;
    /// Neutral percentage for saturation, contrast and brightness.
    pub const NEUTRAL_PERCENT: f32 = 100.0;
    /// Smallest accepted variant size in inches.
    pub const MIN_VARIANT_SIZE: f64 = 0.5;
    /// Largest accepted variant size in inches.
    pub const MAX_VARIANT_SIZE: f64 = 9.0;
    /// Accepted range for `detail_level`.
    pub const DETAIL_LEVEL_RANGE: std::ops::RangeInclusive<i32> = -4..=5;

    /// Split the flat settings record into the branch-specific
    /// configuration the pipeline dispatches on.
    #[must_use]
    pub const fn treatment(&self) -> Treatment {
        match self.mode {
            Mode::Solid => Treatment::Stencil(self.stencil_config(StencilAlgorithm::Solid)),
            Mode::Hollow => Treatment::Stencil(self.stencil_config(StencilAlgorithm::Hollow)),
            Mode::Realism => Treatment::Realism(RealismConfig {
                saturation: self.saturation,
                contrast: self.contrast,
                brightness: self.brightness,
                sharpness: self.sharpness,
                brilliance: self.brilliance,
            }),
        }
    }

    const fn stencil_config(&self, algorithm: StencilAlgorithm) -> StencilConfig {
        StencilConfig {
            algorithm,
            threshold: self.threshold,
            thickness: self.thickness,
            detail_level: self.detail_level,
        }
    }

    /// Check invariants that cannot be normalized silently.
    ///
    /// `detail_level` must lie in [`Self::DETAIL_LEVEL_RANGE`] in every
    /// mode. In multi-size mode the size range must also be finite,
    /// within `[MIN_VARIANT_SIZE, MAX_VARIANT_SIZE]`, and ascending. A
    /// reversed range is reported to the caller instead of being swapped
    /// or clamped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !Self::DETAIL_LEVEL_RANGE.contains(&self.detail_level) {
            return Err(PipelineError::InvalidConfig(format!(
                "detail level {} outside {}..={}",
                self.detail_level,
                Self::DETAIL_LEVEL_RANGE.start(),
                Self::DETAIL_LEVEL_RANGE.end(),
            )));
        }
        if !self.multi_size {
            return Ok(());
        }
        if !self.min_size.is_finite() || !self.max_size.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "variant sizes must be finite, got {}..{}",
                self.min_size, self.max_size,
            )));
        }
        if self.min_size < Self::MIN_VARIANT_SIZE {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum variant size {} is below {} inches",
                self.min_size,
                Self::MIN_VARIANT_SIZE,
            )));
        }
        if self.max_size > Self::MAX_VARIANT_SIZE {
            return Err(PipelineError::InvalidConfig(format!(
                "maximum variant size {} exceeds {} inches",
                self.max_size,
                Self::MAX_VARIANT_SIZE,
            )));
        }
        if self.min_size > self.max_size {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum variant size {} exceeds maximum {}",
                self.min_size, self.max_size,
            )));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            thickness: 0,
            detail_level: 0,
            mode: Mode::default(),
            mirrored: false,
            multi_size: false,
            variant_count: VariantCount::default(),
            min_size: Self::DEFAULT_MIN_SIZE,
            max_size: Self::DEFAULT_MAX_SIZE,
            show_dimensions: true,
            saturation: Self::NEUTRAL_PERCENT,
            contrast: Self::NEUTRAL_PERCENT,
            brightness: Self::NEUTRAL_PERCENT,
            sharpness: 0.0,
            brilliance: 0.0,
        }
    }
}

/// Binarization algorithm for the stencil branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StencilAlgorithm {
    /// Adaptive local threshold: solid fills.
    Solid,
    /// Difference of Gaussians: outlines.
    Hollow,
}

impl std::fmt::Display for StencilAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solid => f.write_str("AdaptiveThreshold"),
            Self::Hollow => f.write_str("DifferenceOfGaussians"),
        }
    }
}

/// Parameters for the stencil (binarizing) branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilConfig {
    /// Which binarization algorithm to run.
    pub algorithm: StencilAlgorithm,
    /// Binarization threshold.
    pub threshold: u8,
    /// Morphology passes (sign selects dilate/erode).
    pub thickness: i32,
    /// Shared detail control, interpreted per algorithm.
    pub detail_level: i32,
}

/// Parameters for the realism (tone mapping) branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealismConfig {
    /// Saturation percentage (100 = neutral).
    pub saturation: f32,
    /// Contrast percentage (100 = neutral).
    pub contrast: f32,
    /// Brightness percentage (100 = neutral).
    pub brightness: f32,
    /// Sharpening strength (0 = off).
    pub sharpness: f32,
    /// Brilliance strength in `[-100, 100]` (0 = off).
    pub brilliance: f32,
}

/// The two mutually exclusive processing branches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Treatment {
    /// Binarize, then adjust line thickness.
    Stencil(StencilConfig),
    /// Tone-map the full-color raster.
    Realism(RealismConfig),
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Stencil-only stages are `None` for the realism branch. Planes are
/// stored as 8-bit previews.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Downsampled and (optionally) mirrored source.
    pub prepared: RgbaImage,
    /// Luma extraction.
    pub luma: Option<GrayImage>,
    /// Detail-filtered luma.
    pub detail: Option<GrayImage>,
    /// Binarized map before thickness adjustment.
    pub binary: Option<GrayImage>,
    /// Binarized map after thickness adjustment.
    pub thickened: Option<GrayImage>,
    /// Final processed raster handed to the page composer.
    pub output: RgbaImage,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has no pixels.
    #[error("image has zero area ({width}x{height})")]
    ZeroArea {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// A raw RGBA buffer does not match its stated dimensions.
    #[error("raw RGBA buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Byte count implied by the dimensions.
        expected: usize,
        /// Byte count supplied.
        actual: usize,
    },

    /// Settings violate an invariant that is not silently normalized.
    #[error("invalid settings: {0}")]
    InvalidConfig(String),

    /// A convolution kernel is not an odd square.
    #[error("convolution kernel of length {0} is not an odd square")]
    InvalidKernel(usize),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    ZeroArea { width: u32, height: u32 },
    BufferSize { expected: usize, actual: usize },
    InvalidConfig(String),
    InvalidKernel(usize),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::ZeroArea { width, height } => PipelineErrorProxy::ZeroArea {
                width: *width,
                height: *height,
            },
            Self::BufferSize { expected, actual } => PipelineErrorProxy::BufferSize {
                expected: *expected,
                actual: *actual,
            },
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::InvalidKernel(len) => PipelineErrorProxy::InvalidKernel(*len),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::ZeroArea { width, height } => Self::ZeroArea { width, height },
            PipelineErrorProxy::BufferSize { expected, actual } => {
                Self::BufferSize { expected, actual }
            }
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::InvalidKernel(len) => Self::InvalidKernel(len),
        })
    }
}

/// Convert a floating-point plane to an 8-bit preview, rounding and
/// clamping each sample.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn plane_to_gray(plane: &LumaPlane) -> GrayImage {
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        image::Luma([plane.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Expand a binary map into an opaque grayscale RGBA raster.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn binary_to_rgba(map: &LumaPlane) -> RgbaImage {
    RgbaImage::from_fn(map.width(), map.height(), |x, y| {
        let v = map.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8;
        image::Rgba([v, v, v, 255])
    })
}
