//! Line thickness adjustment by iterated 4-neighbour dilation or erosion.
//!
//! Positive thickness grows the ink set, negative thickness shrinks it,
//! one pixel per pass. Two owned buffers are swapped after every pass;
//! the input is copied once on entry and never aliased.
//!
//! The two operations treat pixels beyond the border differently:
//! dilation sees them as blank and erosion sees them as ink. Neither
//! therefore advances from the image frame itself, only from real edges
//! in the map. As a consequence dilating then eroding by the same amount
//! does not in general restore the original map.

use crate::types::{BLANK, INK, LumaPlane};

/// Upper bound on the number of passes, whatever the requested
/// thickness.
pub const MAX_PASSES: u32 = 15;

/// Number of passes and direction for a thickness value.
///
/// Returns `(passes, dilate)`; `passes` is zero for thickness zero.
#[must_use]
pub fn passes_for(thickness: i32) -> (u32, bool) {
    (thickness.unsigned_abs().min(MAX_PASSES), thickness > 0)
}

/// Dilate (`thickness > 0`) or erode (`thickness < 0`) a binary map.
#[must_use = "returns the adjusted map"]
pub fn adjust_thickness(map: &LumaPlane, thickness: i32) -> LumaPlane {
    let (passes, dilate) = passes_for(thickness);
    if passes == 0 {
        return map.clone();
    }

    let (w, h) = (map.width() as usize, map.height() as usize);
    let mut current = map.as_raw().clone();
    let mut next = vec![BLANK; current.len()];

    for _ in 0..passes {
        if dilate {
            dilate_pass(&current, &mut next, w, h);
        } else {
            erode_pass(&current, &mut next, w, h);
        }
        std::mem::swap(&mut current, &mut next);
    }

    LumaPlane::from_raw(map.width(), map.height(), current).unwrap_or_else(|| map.clone())
}

/// The four neighbours of `(x, y)`; `None` for positions off the map.
fn neighbours(
    src: &[f32],
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> [Option<f32>; 4] {
    let at = |nx: usize, ny: usize| src[ny * w + nx];
    [
        x.checked_sub(1).map(|nx| at(nx, y)),
        (x + 1 < w).then(|| at(x + 1, y)),
        y.checked_sub(1).map(|ny| at(x, ny)),
        (y + 1 < h).then(|| at(x, y + 1)),
    ]
}

/// Ink if the pixel or any neighbour is ink; off-map counts as blank.
fn dilate_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let touches_ink = neighbours(src, x, y, w, h)
                .iter()
                .any(|n| n.unwrap_or(BLANK) == INK);
            dst[i] = if src[i] == INK || touches_ink { INK } else { BLANK };
        }
    }
}

/// Ink only if the pixel and all neighbours are ink; off-map counts as
/// ink.
fn erode_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize) {
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let surrounded = neighbours(src, x, y, w, h)
                .iter()
                .all(|n| n.unwrap_or(INK) == INK);
            dst[i] = if src[i] == INK && surrounded { INK } else { BLANK };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::ink_count;

    /// Build a map from rows of `#` (ink) and `.` (blank).
    fn map_from(rows: &[&str]) -> LumaPlane {
        let h = u32::try_from(rows.len()).unwrap_or(0);
        let w = u32::try_from(rows.first().map_or(0, |r| r.len())).unwrap_or(0);
        LumaPlane::from_fn(w, h, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            image::Luma([if c == b'#' { INK } else { BLANK }])
        })
    }

    fn render(map: &LumaPlane) -> Vec<String> {
        (0..map.height())
            .map(|y| {
                (0..map.width())
                    .map(|x| if map.get_pixel(x, y).0[0] == INK { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn zero_thickness_is_identity() {
        let map = map_from(&[".#.", "##.", "..."]);
        assert_eq!(adjust_thickness(&map, 0), map);
    }

    #[test]
    fn dilation_grows_a_cross() {
        let map = map_from(&[".....", ".....", "..#..", ".....", "....."]);
        let grown = adjust_thickness(&map, 1);
        assert_eq!(
            render(&grown),
            vec![".....", "..#..", ".###.", "..#..", "....."]
        );
    }

    #[test]
    fn erosion_shrinks_a_block() {
        let map = map_from(&[".....", ".###.", ".###.", ".###.", "....."]);
        let shrunk = adjust_thickness(&map, -1);
        assert_eq!(
            render(&shrunk),
            vec![".....", ".....", "..#..", ".....", "....."]
        );
    }

    #[test]
    fn erosion_treats_border_as_ink() {
        // A fully inked map survives erosion because off-map is ink.
        let map = map_from(&["###", "###"]);
        assert_eq!(adjust_thickness(&map, -3), map);
    }

    #[test]
    fn dilation_treats_border_as_blank() {
        let map = map_from(&["...", "...", "..."]);
        assert_eq!(ink_count(&adjust_thickness(&map, 4)), 0);
    }

    #[test]
    fn blank_map_stays_blank_either_way() {
        let map = LumaPlane::from_pixel(9, 6, image::Luma([BLANK]));
        for thickness in [-15, -5, -1, 1, 5, 10, 15] {
            let out = adjust_thickness(&map, thickness);
            assert_eq!(ink_count(&out), 0, "thickness {thickness}");
        }
    }

    #[test]
    fn dilate_then_erode_is_not_inverse() {
        // In a one-pixel-high strip the off-map ink seen by erosion keeps
        // the gap filled by dilation.
        let map = map_from(&[".#.#."]);
        let closed = adjust_thickness(&adjust_thickness(&map, 1), -1);
        assert_eq!(render(&closed), vec!["#####"]);
        assert_ne!(closed, map);
    }

    #[test]
    fn thickness_is_capped_at_fifteen_passes() {
        let mut rows = vec![".".repeat(41); 41];
        rows[20] = format!("{}#{}", ".".repeat(20), ".".repeat(20));
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let map = map_from(&refs);

        assert_eq!(passes_for(20), (15, true));
        assert_eq!(passes_for(-99), (15, false));
        assert_eq!(adjust_thickness(&map, 20), adjust_thickness(&map, 15));
        assert_ne!(adjust_thickness(&map, 15), adjust_thickness(&map, 14));
    }

    #[test]
    fn output_stays_binary() {
        let map = map_from(&["#..#", ".##.", "#..#"]);
        for thickness in [-2, 2] {
            let out = adjust_thickness(&map, thickness);
            assert!(out.pixels().all(|p| p.0[0] == INK || p.0[0] == BLANK));
        }
    }
}
