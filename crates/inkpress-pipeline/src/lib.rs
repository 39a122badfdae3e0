//! inkpress-pipeline: Pure stencil image processing pipeline (sans-IO).
//!
//! Converts a photograph into a printable stencil through:
//! downsample + mirror -> luma -> detail filter -> binarize ->
//! thickness adjustment, or, in realism mode, through a full-color
//! tone mapper instead of the binarizing stages.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and returns rasters. Page layout and encoding live in
//! `inkpress-export`; filesystem access lives in the `inkpress` binary.
//!
//! Every call is a pure function of (source pixels, settings); nothing
//! is cached between calls, so independent images can be processed on
//! separate threads.

pub mod binarize;
pub mod blur;
pub mod convolve;
pub mod decode;
pub mod detail;
pub mod diagnostics;
pub mod luma;
pub mod morphology;
pub mod prepare;
pub mod realism;
pub mod types;

pub use decode::{decode, raster_from_rgba8};
pub use diagnostics::{Clock, PipelineDiagnostics, process_staged_with_diagnostics};
pub use prepare::MAX_WORKING_DIMENSION;
pub use types::{
    BLANK, GrayImage, INK, LumaPlane, Mode, PipelineError, RealismConfig, RgbaImage, Settings,
    StagedResult, StencilAlgorithm, StencilConfig, Treatment, VariantCount,
};

/// Run the full pipeline on encoded image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Otherwise as [`process_raster`].
pub fn process(image_bytes: &[u8], settings: &Settings) -> Result<RgbaImage, PipelineError> {
    let source = decode::decode(image_bytes)?;
    process_raster(&source, settings)
}

/// Run the full pipeline on a decoded raster.
///
/// # Pipeline steps
///
/// 1. Validate settings (detail level range, variant size range)
/// 2. Downsample to the working cap, then mirror if requested
/// 3. Stencil branch: luma, detail filter, binarize, thickness
///    adjustment, expanded back to opaque RGBA
/// 4. Realism branch: tone mapping on the full-color raster
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `settings` fails
/// validation. Returns [`PipelineError::ZeroArea`] if `source` has no
/// pixels.
pub fn process_raster(source: &RgbaImage, settings: &Settings) -> Result<RgbaImage, PipelineError> {
    settings.validate()?;
    decode::ensure_nonempty(source)?;

    let prepared = prepare::prepare(source, settings.mirrored);

    match settings.treatment() {
        Treatment::Realism(config) => {
            let mut raster = prepared.raster;
            realism::tone_map(&mut raster, &config)?;
            Ok(raster)
        }
        Treatment::Stencil(config) => {
            let map = stencil_map(&prepared.raster, &config);
            Ok(types::binary_to_rgba(&map))
        }
    }
}

/// Run the stencil stages on a prepared raster and return the final
/// binary map.
#[must_use]
pub fn stencil_map(raster: &RgbaImage, config: &StencilConfig) -> LumaPlane {
    let luma = luma::luma_plane(raster);
    let detail = detail::apply_detail(&luma, config.detail_level, config.algorithm);
    let binary = binarize::binarize(
        &detail,
        config.algorithm,
        config.threshold,
        config.detail_level,
    );
    tracing::debug!(
        algorithm = %config.algorithm,
        ink = binarize::ink_count(&binary),
        "binarized",
    );
    morphology::adjust_thickness(&binary, config.thickness)
}

/// Run the pipeline and keep every intermediate stage output.
///
/// # Errors
///
/// As [`process_raster`].
pub fn process_staged(
    source: &RgbaImage,
    settings: &Settings,
) -> Result<StagedResult, PipelineError> {
    process_staged_with_diagnostics(source, settings, &diagnostics::NullClock)
        .map(|(staged, _)| staged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    /// Left half dark, right half light.
    fn sharp_edge(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([20, 20, 20, 255])
            } else {
                image::Rgba([235, 235, 235, 255])
            }
        })
    }

    fn mid_gray(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, image::Rgba([128, 128, 128, 255]))
    }

    fn is_all_blank(raster: &RgbaImage) -> bool {
        raster.pixels().all(|p| p.0 == [255, 255, 255, 255])
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &Settings::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &Settings::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_zero_area_raster() {
        let result = process_raster(&RgbaImage::new(0, 5), &Settings::default());
        assert!(matches!(result, Err(PipelineError::ZeroArea { .. })));
    }

    #[test]
    fn solid_mid_gray_is_all_blank() {
        let settings = Settings {
            mode: Mode::Solid,
            threshold: 223,
            thickness: 0,
            detail_level: 0,
            ..Settings::default()
        };
        let staged = process_staged(&mid_gray(100), &settings).unwrap();
        let binary = staged.binary.unwrap();
        assert_eq!(binary.dimensions(), (100, 100));
        assert!(binary.pixels().all(|p| p.0[0] == 255));
        assert!(is_all_blank(&staged.output));
    }

    #[test]
    fn hollow_flat_image_is_all_blank() {
        for threshold in [0, 90, 200, 255] {
            let settings = Settings {
                mode: Mode::Hollow,
                threshold,
                ..Settings::default()
            };
            let flat = RgbaImage::from_pixel(40, 30, image::Rgba([30, 160, 90, 255]));
            let out = process_raster(&flat, &settings).unwrap();
            assert!(is_all_blank(&out), "threshold {threshold}");
        }
    }

    #[test]
    fn realism_neutral_is_identical() {
        let settings = Settings {
            mode: Mode::Realism,
            saturation: 100.0,
            contrast: 100.0,
            brightness: 100.0,
            sharpness: 0.0,
            brilliance: 0.0,
            ..Settings::default()
        };
        let source = RgbaImage::from_fn(20, 10, |x, y| {
            image::Rgba([
                u8::try_from(x * 12).unwrap(),
                u8::try_from(y * 25).unwrap(),
                77,
                u8::try_from(100 + x).unwrap(),
            ])
        });
        assert_eq!(process_raster(&source, &settings).unwrap(), source);

        let mirrored = Settings {
            mirrored: true,
            ..settings
        };
        assert_eq!(
            process_raster(&source, &mirrored).unwrap(),
            image::imageops::flip_horizontal(&source)
        );
    }

    #[test]
    fn sharp_edge_produces_ink_on_dark_side() {
        let out = process_raster(&sharp_edge(60, 40), &Settings::default()).unwrap();
        assert_eq!(out.dimensions(), (60, 40));
        // Just left of the boundary is darker than its local mean.
        assert_eq!(out.get_pixel(29, 20).0, [0, 0, 0, 255]);
        // Far right is light and blank.
        assert_eq!(out.get_pixel(59, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn mirroring_flips_stencil() {
        let settings = Settings {
            mirrored: true,
            ..Settings::default()
        };
        let plain = process_raster(&sharp_edge(60, 40), &Settings::default()).unwrap();
        let flipped = process_raster(&sharp_edge(60, 40), &settings).unwrap();
        assert_eq!(flipped, image::imageops::flip_horizontal(&plain));
    }

    #[test]
    fn lean_and_staged_paths_agree() {
        let settings = Settings {
            thickness: -1,
            detail_level: -2,
            ..Settings::default()
        };
        let source = sharp_edge(50, 30);
        let lean = process_raster(&source, &settings).unwrap();
        let staged = process_staged(&source, &settings).unwrap();
        assert_eq!(lean, staged.output);
    }

    #[test]
    fn process_decodes_png() {
        let png = encode_png(&sharp_edge(30, 30));
        let out = process(&png, &Settings::default()).unwrap();
        assert_eq!(out.dimensions(), (30, 30));
    }

    #[test]
    fn reversed_size_range_is_rejected() {
        let settings = Settings {
            multi_size: true,
            min_size: 3.0,
            max_size: 1.0,
            ..Settings::default()
        };
        let result = process_raster(&mid_gray(10), &settings);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn extreme_detail_level_is_rejected() {
        for mode in [Mode::Solid, Mode::Hollow] {
            let settings = Settings {
                mode,
                detail_level: 500_000_000,
                ..Settings::default()
            };
            let result = process_raster(&mid_gray(4), &settings);
            assert!(matches!(result, Err(PipelineError::InvalidConfig(_))), "{mode:?}");
        }
    }

    #[test]
    fn oversized_variant_range_is_rejected() {
        let settings = Settings {
            multi_size: true,
            min_size: 1.0,
            max_size: 1.0e7,
            ..Settings::default()
        };
        let result = process_raster(&mid_gray(10), &settings);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let settings = Settings {
            mode: Mode::Hollow,
            detail_level: 2,
            thickness: 1,
            ..Settings::default()
        };
        let source = sharp_edge(40, 40);
        let first = process_raster(&source, &settings).unwrap();
        let second = process_raster(&source, &settings).unwrap();
        assert_eq!(first, second);
    }
}
