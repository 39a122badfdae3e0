//! Binarization: turning a detail-filtered luma plane into ink and blank.
//!
//! Two algorithms share this stage:
//!
//! - [`adaptive_threshold`] compares each pixel with the mean of a wide
//!   neighbourhood, so uneven lighting does not swallow whole regions.
//!   Produces solid fills.
//! - [`difference_of_gaussians`] subtracts a wide blur from a narrow one
//!   and marks strongly negative responses (the dark side of an edge).
//!   Produces outlines.
//!
//! Both return a binary map holding only [`INK`] and [`BLANK`]. In both,
//! a higher `threshold` produces more ink.

use crate::blur::box_blur;
use crate::detail::dog_radii;
use crate::types::{BLANK, INK, LumaPlane, StencilAlgorithm};

/// Radius of the local-mean window used by the adaptive threshold.
pub const LOCAL_MEAN_RADIUS: u32 = 16;

/// Binarize `detail` with the algorithm selected for this run.
///
/// `detail_level` is only read by the difference-of-Gaussians path.
#[must_use = "returns the binary map"]
pub fn binarize(
    detail: &LumaPlane,
    algorithm: StencilAlgorithm,
    threshold: u8,
    detail_level: i32,
) -> LumaPlane {
    match algorithm {
        StencilAlgorithm::Solid => adaptive_threshold(detail, threshold),
        StencilAlgorithm::Hollow => difference_of_gaussians(detail, threshold, detail_level),
    }
}

/// Bias subtracted from the local mean: `(255 - threshold) / 5`.
#[must_use]
pub fn adaptive_bias(threshold: u8) -> f32 {
    f32::from(255 - threshold) / 5.0
}

/// Ink where a pixel is strictly darker than its local mean minus
/// [`adaptive_bias`].
#[must_use = "returns the binary map"]
pub fn adaptive_threshold(detail: &LumaPlane, threshold: u8) -> LumaPlane {
    let local_mean = box_blur(detail, LOCAL_MEAN_RADIUS);
    let bias = adaptive_bias(threshold);
    let mut map = detail.clone();
    for (p, mean) in map.pixels_mut().zip(local_mean.pixels()) {
        p.0[0] = if p.0[0] < mean.0[0] - bias { INK } else { BLANK };
    }
    map
}

/// Response cutoff for the difference of Gaussians:
/// `2 + 10 * (255 - threshold) / 255`.
#[must_use]
pub fn dog_cutoff(threshold: u8) -> f32 {
    let sensitivity = f32::from(255 - threshold) / 255.0;
    sensitivity.mul_add(10.0, 2.0)
}

/// Ink where the narrow blur falls more than [`dog_cutoff`] below the
/// wide blur.
#[must_use = "returns the binary map"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn difference_of_gaussians(detail: &LumaPlane, threshold: u8, detail_level: i32) -> LumaPlane {
    let (inner, outer) = dog_radii(detail_level);
    let narrow = box_blur(detail, inner.ceil() as u32);
    let wide = box_blur(detail, outer.ceil() as u32);
    let cutoff = dog_cutoff(threshold);

    let mut map = narrow;
    for (p, w) in map.pixels_mut().zip(wide.pixels()) {
        p.0[0] = if p.0[0] - w.0[0] < -cutoff { INK } else { BLANK };
    }
    map
}

/// Number of ink pixels in a binary map.
#[must_use]
pub fn ink_count(map: &LumaPlane) -> u64 {
    map.pixels().map(|p| u64::from(p.0[0] == INK)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, value: f32) -> LumaPlane {
        LumaPlane::from_pixel(w, h, image::Luma([value]))
    }

    /// Light background with a dark square in the middle.
    fn dark_square() -> LumaPlane {
        LumaPlane::from_fn(40, 40, |x, y| {
            let inside = (14..26).contains(&x) && (14..26).contains(&y);
            image::Luma([if inside { 30.0 } else { 220.0 }])
        })
    }

    fn is_binary(map: &LumaPlane) -> bool {
        map.pixels().all(|p| p.0[0] == INK || p.0[0] == BLANK)
    }

    #[test]
    fn adaptive_uniform_plane_has_no_ink() {
        for value in [0.0, 37.0, 128.0, 255.0] {
            for threshold in [0, 128, 223, 255] {
                let map = adaptive_threshold(&flat(30, 20, value), threshold);
                assert_eq!(ink_count(&map), 0, "value {value} threshold {threshold}");
            }
        }
    }

    #[test]
    fn adaptive_comparison_is_strict() {
        // threshold 255 gives zero bias; equal to the mean is not ink.
        assert!(adaptive_bias(255).abs() < f32::EPSILON);
        let map = adaptive_threshold(&flat(5, 5, 90.0), 255);
        assert_eq!(ink_count(&map), 0);
    }

    #[test]
    fn adaptive_bias_shrinks_as_threshold_rises() {
        assert!((adaptive_bias(0) - 51.0).abs() < 1e-6);
        assert!((adaptive_bias(223) - 6.4).abs() < 1e-5);
        assert!(adaptive_bias(200) < adaptive_bias(100));
    }

    #[test]
    fn adaptive_marks_dark_square() {
        let map = adaptive_threshold(&dark_square(), 200);
        assert!(is_binary(&map));
        assert_eq!(map.get_pixel(20, 20).0[0], INK);
        assert_eq!(map.get_pixel(2, 2).0[0], BLANK);
    }

    #[test]
    fn higher_threshold_means_more_ink() {
        let plane = LumaPlane::from_fn(40, 40, |x, y| {
            image::Luma([f32::from(u8::try_from((x * 13 + y * 7) % 200).unwrap_or(0))])
        });
        let light = ink_count(&adaptive_threshold(&plane, 50));
        let dark = ink_count(&adaptive_threshold(&plane, 250));
        assert!(dark >= light, "dark={dark} light={light}");
        assert!(dark > 0);
    }

    #[test]
    fn dog_flat_plane_is_blank_for_any_threshold() {
        for threshold in [0, 64, 128, 255] {
            for level in [-4, 0, 5] {
                let map = difference_of_gaussians(&flat(25, 25, 140.0), threshold, level);
                assert_eq!(ink_count(&map), 0, "threshold {threshold} level {level}");
                assert!(is_binary(&map));
            }
        }
    }

    #[test]
    fn dog_cutoff_range() {
        assert!((dog_cutoff(255) - 2.0).abs() < 1e-6);
        assert!((dog_cutoff(0) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn dog_outlines_dark_square() {
        let map = difference_of_gaussians(&dark_square(), 128, 0);
        assert!(is_binary(&map));
        // Ink on the dark side of the boundary, none deep inside or far out.
        assert_eq!(map.get_pixel(14, 20).0[0], INK);
        assert_eq!(map.get_pixel(2, 2).0[0], BLANK);
        assert_eq!(map.get_pixel(20, 20).0[0], BLANK);
    }

    #[test]
    fn binarize_dispatches_on_algorithm() {
        let plane = dark_square();
        assert_eq!(
            binarize(&plane, StencilAlgorithm::Solid, 180, 3),
            adaptive_threshold(&plane, 180)
        );
        assert_eq!(
            binarize(&plane, StencilAlgorithm::Hollow, 180, 3),
            difference_of_gaussians(&plane, 180, 3)
        );
    }
}
