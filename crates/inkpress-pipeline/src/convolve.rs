//! Square-kernel convolution over the RGB channels of a raster.
//!
//! Unlike [`crate::blur`], taps that fall outside the raster are skipped
//! (they contribute nothing) rather than clamped to the edge. Near the
//! border a kernel therefore sees fewer taps and its weights no longer
//! sum to the interior total.

use crate::types::{PipelineError, RgbaImage};

/// Side length of a square kernel stored row-major in `kernel`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernel`] unless `kernel.len()` is the
/// square of an odd number.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn kernel_side(kernel: &[f32]) -> Result<usize, PipelineError> {
    let side = (kernel.len() as f64).sqrt().round() as usize;
    if side == 0 || side * side != kernel.len() || side % 2 == 0 {
        return Err(PipelineError::InvalidKernel(kernel.len()));
    }
    Ok(side)
}

/// Convolve the R, G and B channels of `raster` with `kernel`, in place.
///
/// Every output sample is computed from the pre-convolution state. Each
/// channel is rounded and clamped to `[0, 255]` independently; alpha is
/// left untouched.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernel`] if `kernel` is not an odd
/// square.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
pub fn convolve_rgb(raster: &mut RgbaImage, kernel: &[f32]) -> Result<(), PipelineError> {
    let side = kernel_side(kernel)?;
    let half = (side / 2) as i64;
    let source = raster.clone();
    let (w, h) = (i64::from(source.width()), i64::from(source.height()));

    for (x, y, pixel) in raster.enumerate_pixels_mut() {
        let mut acc = [0.0f32; 3];
        for (k, weight) in kernel.iter().enumerate() {
            let sx = i64::from(x) + (k % side) as i64 - half;
            let sy = i64::from(y) + (k / side) as i64 - half;
            if sx < 0 || sy < 0 || sx >= w || sy >= h {
                continue;
            }
            let tap = source.get_pixel(sx as u32, sy as u32).0;
            for (channel, sum) in acc.iter_mut().enumerate() {
                *sum = weight.mul_add(f32::from(tap[channel]), *sum);
            }
        }
        for (channel, sum) in acc.into_iter().enumerate() {
            pixel.0[channel] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const IDENTITY: [f32; 9] = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([
                u8::try_from(x * 20).unwrap(),
                u8::try_from(y * 30).unwrap(),
                u8::try_from((x + y) * 10).unwrap(),
                200,
            ])
        })
    }

    #[test]
    fn kernel_side_accepts_odd_squares() {
        assert_eq!(kernel_side(&[1.0]).unwrap(), 1);
        assert_eq!(kernel_side(&IDENTITY).unwrap(), 3);
        assert_eq!(kernel_side(&[0.0; 25]).unwrap(), 5);
    }

    #[test]
    fn kernel_side_rejects_even_or_non_square() {
        assert!(matches!(
            kernel_side(&[0.0; 4]),
            Err(PipelineError::InvalidKernel(4))
        ));
        assert!(matches!(
            kernel_side(&[0.0; 8]),
            Err(PipelineError::InvalidKernel(8))
        ));
        assert!(matches!(
            kernel_side(&[]),
            Err(PipelineError::InvalidKernel(0))
        ));
    }

    #[test]
    fn identity_kernel_is_noop() {
        let original = gradient(6, 5);
        let mut raster = original.clone();
        convolve_rgb(&mut raster, &IDENTITY).unwrap();
        assert_eq!(raster, original);
    }

    #[test]
    fn alpha_is_untouched() {
        let mut raster = gradient(4, 4);
        convolve_rgb(&mut raster, &[0.0; 9]).unwrap();
        for p in raster.pixels() {
            assert_eq!(p.0, [0, 0, 0, 200]);
        }
    }

    #[test]
    fn out_of_bounds_taps_contribute_nothing() {
        // An all-ones kernel sums the taps that exist: 4 at a corner,
        // 9 in the interior.
        let mut raster = RgbaImage::from_pixel(3, 3, image::Rgba([10, 10, 10, 255]));
        convolve_rgb(&mut raster, &[1.0; 9]).unwrap();
        assert_eq!(raster.get_pixel(0, 0).0[0], 40);
        assert_eq!(raster.get_pixel(1, 0).0[0], 60);
        assert_eq!(raster.get_pixel(1, 1).0[0], 90);
    }

    #[test]
    fn reads_pre_convolution_state() {
        // Shift-right kernel: output(x) = input(x - 1). Reading the
        // in-progress buffer would smear the first column across the row.
        let mut raster = RgbaImage::from_fn(4, 1, |x, _| {
            image::Rgba([u8::try_from(x * 50).unwrap(), 0, 0, 255])
        });
        let shift = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        convolve_rgb(&mut raster, &shift).unwrap();
        let reds: Vec<u8> = raster.pixels().map(|p| p.0[0]).collect();
        assert_eq!(reds, vec![0, 0, 50, 100]);
    }

    #[test]
    fn results_are_clamped() {
        let mut raster = RgbaImage::from_pixel(3, 3, image::Rgba([200, 5, 100, 255]));
        let kernel = [0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0];
        convolve_rgb(&mut raster, &kernel).unwrap();
        assert_eq!(raster.get_pixel(1, 1).0[..3], [0, 0, 0]);

        let mut raster = RgbaImage::from_pixel(3, 3, image::Rgba([200, 5, 100, 255]));
        let kernel = [0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0];
        convolve_rgb(&mut raster, &kernel).unwrap();
        assert_eq!(raster.get_pixel(1, 1).0[..3], [255, 15, 255]);
    }
}
