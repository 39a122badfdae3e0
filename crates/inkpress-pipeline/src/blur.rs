//! Sliding-window box blur.
//!
//! A separable mean filter: one horizontal pass, then one vertical pass,
//! each maintaining a running sum so the cost per pixel is constant
//! regardless of radius.
//!
//! Samples outside the plane take the value of the nearest edge sample
//! (clamp-to-edge). This matters at the borders: a zero-padded blur would
//! darken them and the adaptive threshold would then mistake the border
//! for ink.
//!
//! The running sum is kept in `f64`; for integer-valued inputs every
//! add/subtract is exact, so a flat plane stays exactly flat.

use crate::types::LumaPlane;

/// Blur `source` with a `(2 * radius + 1)` square box.
///
/// A radius of zero returns an unchanged copy.
#[must_use = "returns the blurred plane"]
pub fn box_blur(source: &LumaPlane, radius: u32) -> LumaPlane {
    if radius < 1 || source.width() == 0 || source.height() == 0 {
        return source.clone();
    }

    let (w, h) = source.dimensions();
    let (w, h) = (w as usize, h as usize);
    let radius = radius as usize;

    let mut horizontal = vec![0.0f32; w * h];
    for (src_row, dst_row) in source
        .as_raw()
        .chunks_exact(w)
        .zip(horizontal.chunks_exact_mut(w))
    {
        blur_line(|i| src_row[i], w, radius, |i, v| dst_row[i] = v);
    }

    let mut output = vec![0.0f32; w * h];
    for x in 0..w {
        blur_line(
            |i| horizontal[i * w + x],
            h,
            radius,
            |i, v| output[i * w + x] = v,
        );
    }

    // Dimensions are unchanged so the buffer length always matches.
    LumaPlane::from_raw(source.width(), source.height(), output)
        .unwrap_or_else(|| source.clone())
}

/// Blur one line of `len` samples.
///
/// `read(i)` fetches sample `i`; `write(i, v)` stores output `i`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn blur_line(
    read: impl Fn(usize) -> f32,
    len: usize,
    radius: usize,
    mut write: impl FnMut(usize, f32),
) {
    let last = len - 1;
    let sample = |i: isize| -> f64 {
        let clamped = i.clamp(0, last as isize) as usize;
        f64::from(read(clamped))
    };
    let window = (2 * radius + 1) as f64;
    let r = radius as isize;

    // Seed the first window in closed form: `radius` repeats of the
    // left edge, the in-range samples, then any right-edge repeats.
    let first = f64::from(read(0));
    let end = f64::from(read(last));
    let mut sum = radius as f64 * first
        + (0..=radius.min(last)).map(|i| f64::from(read(i))).sum::<f64>()
        + radius.saturating_sub(last) as f64 * end;
    for i in 0..len {
        write(i, (sum / window) as f32);
        let pos = i as isize;
        sum += sample(pos + r + 1) - sample(pos - r);
    }
}
