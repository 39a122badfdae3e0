//! Integration test: run a synthetic photograph through the full pipeline
//! and render A4 pages in memory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{Rgba, RgbaImage};
use inkpress_export::{PageLayout, encode_png, render_page};
use inkpress_pipeline::{Mode, Settings, VariantCount};

/// Light sky over a dark hill with a mid-tone sun.
fn landscape() -> RgbaImage {
    RgbaImage::from_fn(320, 200, |x, y| {
        let hill = 120 + (i64::from(x) - 160).abs() / 4;
        let sun = (i64::from(x) - 240).pow(2) + (i64::from(y) - 50).pow(2) < 30 * 30;
        if i64::from(y) > hill {
            Rgba([40, 60, 30, 255])
        } else if sun {
            Rgba([230, 180, 60, 255])
        } else {
            Rgba([170, 200, 235, 255])
        }
    })
}

fn decode_page(png: &[u8]) -> RgbaImage {
    image::load_from_memory(png).unwrap().to_rgba8()
}

fn black_pixels(page: &RgbaImage) -> usize {
    page.pixels().filter(|p| p.0[0] < 64).count()
}

#[test]
fn solid_stencil_single_page() {
    let source = encode_png(&landscape()).unwrap();
    let settings = Settings::default();

    let processed = inkpress_pipeline::process(&source, &settings).expect("pipeline should succeed");
    assert_eq!(processed.dimensions(), (320, 200));

    let page = decode_page(&render_page(&processed, &settings, &PageLayout::A4).unwrap());
    assert_eq!(page.dimensions(), (2480, 3508));
    assert!(black_pixels(&page) > 0, "expected ink on the page");
    // Padding stays blank.
    assert_eq!(page.get_pixel(50, 50).0, [255, 255, 255, 255]);
    assert_eq!(page.get_pixel(2430, 3458).0, [255, 255, 255, 255]);
}

#[test]
fn hollow_stencil_size_grid() {
    let source = encode_png(&landscape()).unwrap();
    let settings = Settings {
        mode: Mode::Hollow,
        multi_size: true,
        variant_count: VariantCount::Six,
        min_size: 1.0,
        max_size: 2.5,
        thickness: 1,
        ..Settings::default()
    };

    let processed = inkpress_pipeline::process(&source, &settings).unwrap();
    let page = decode_page(&render_page(&processed, &settings, &PageLayout::A4).unwrap());
    assert_eq!(page.dimensions(), (2480, 3508));
    assert!(black_pixels(&page) > 0);
}

#[test]
fn realism_keeps_color() {
    let source = encode_png(&landscape()).unwrap();
    let settings = Settings {
        mode: Mode::Realism,
        saturation: 130.0,
        sharpness: 0.5,
        brilliance: 20.0,
        ..Settings::default()
    };

    let processed = inkpress_pipeline::process(&source, &settings).unwrap();
    let page = decode_page(&render_page(&processed, &settings, &PageLayout::A4).unwrap());
    let colored = page
        .pixels()
        .filter(|p| p.0[0] != p.0[1] || p.0[1] != p.0[2])
        .count();
    assert!(colored > 0, "realism output should not be grayscale");
}

#[test]
fn reversed_range_fails_before_composition() {
    let source = encode_png(&landscape()).unwrap();
    let settings = Settings {
        multi_size: true,
        min_size: 5.0,
        max_size: 1.0,
        ..Settings::default()
    };
    assert!(inkpress_pipeline::process(&source, &settings).is_err());
}
