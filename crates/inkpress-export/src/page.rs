//! Page composition: placing a processed raster on a physical page.
//!
//! Two layouts:
//!
//! - **single**: the raster is scaled to fit the padded page area,
//!   aspect preserved, and centred.
//! - **multi**: the padded area is split into a grid of equal cells and
//!   the raster is drawn once per cell at a physical size interpolated
//!   between the minimum and maximum, optionally with an inch label
//!   under each copy.
//!
//! Variants keep their physical size even when it exceeds the cell;
//! copies drawn later in row-major order cover earlier ones and the page
//! edge clips them. Labels are drawn after every copy is placed.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use inkpress_pipeline::{Settings, VariantCount};

use crate::ExportError;
use crate::label::{LabelFont, size_label};

/// Filter used when scaling the processed raster onto the page.
const PAGE_FILTER: FilterType = FilterType::Triangle;

/// Physical page geometry, in pixels at `dpi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
    /// Pixels per inch; converts variant sizes to pixels.
    pub dpi: u32,
    /// Blank margin on every side.
    pub padding: u32,
    /// Label glyph height in pixels.
    pub label_px: u32,
    /// Space between an image and its label, and between an overlaid
    /// label and the cell bottom.
    pub label_gap: u32,
}

impl PageLayout {
    /// A4 portrait at 300 DPI.
    pub const A4: Self = Self {
        width: 2480,
        height: 3508,
        dpi: 300,
        padding: 100,
        label_px: 48,
        label_gap: 12,
    };

    fn validate(&self) -> Result<(), ExportError> {
        if self.dpi == 0 {
            return Err(ExportError::InvalidLayout("dpi must be positive".to_owned()));
        }
        let margins = u64::from(self.padding) * 2;
        if margins >= u64::from(self.width) || margins >= u64::from(self.height) {
            return Err(ExportError::InvalidLayout(format!(
                "padding {} leaves no room on a {}x{} page",
                self.padding, self.width, self.height,
            )));
        }
        Ok(())
    }

    /// Width of the padded content area.
    #[must_use]
    pub const fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.padding.saturating_mul(2))
    }

    /// Height of the padded content area.
    #[must_use]
    pub const fn content_height(&self) -> u32 {
        self.height.saturating_sub(self.padding.saturating_mul(2))
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::A4
    }
}

/// Grid of `(columns, rows)` for a variant count.
#[must_use]
pub const fn grid_shape(count: VariantCount) -> (u32, u32) {
    match count {
        VariantCount::Three => (1, 3),
        VariantCount::Six => (2, 3),
        VariantCount::Nine => (3, 3),
    }
}

/// Physical sizes in inches, one per cell in row-major order, spaced
/// evenly from `min_size` to `max_size` inclusive.
///
/// # Errors
///
/// Returns [`ExportError::InvalidLayout`] if the range is reversed, not
/// finite, or starts at or below zero.
pub fn variant_sizes(
    count: VariantCount,
    min_size: f64,
    max_size: f64,
) -> Result<Vec<f64>, ExportError> {
    if !min_size.is_finite() || !max_size.is_finite() || min_size <= 0.0 {
        return Err(ExportError::InvalidLayout(format!(
            "variant size range {min_size}..{max_size} is not a positive finite range"
        )));
    }
    if min_size > max_size {
        return Err(ExportError::InvalidLayout(format!(
            "minimum size {min_size} exceeds maximum size {max_size}"
        )));
    }
    let last = f64::from(count.count() - 1);
    Ok((0..count.count())
        .map(|i| (max_size - min_size).mul_add(f64::from(i) / last, min_size))
        .collect())
}

/// Allocate an opaque white canvas, failing instead of aborting when
/// the buffer cannot be reserved.
///
/// # Errors
///
/// Returns [`ExportError::Allocation`] if the byte length overflows or
/// the reservation fails.
pub fn blank_canvas(width: u32, height: u32) -> Result<RgbaImage, ExportError> {
    let allocation = || ExportError::Allocation { width, height };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(allocation)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| allocation())?;
    buf.resize(len, u8::MAX);
    RgbaImage::from_raw(width, height, buf).ok_or_else(allocation)
}

/// Largest size with the same aspect ratio as `(width, height)` that
/// fits inside `(max_width, max_height)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let scale = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Scale `(width, height)` so that the longer side is `target` pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scale_longer_side(width: u32, height: u32, target: u32) -> (u32, u32) {
    let longer = width.max(height);
    let scale = f64::from(target) / f64::from(longer);
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

fn check_raster(processed: &RgbaImage) -> Result<(), ExportError> {
    if processed.width() == 0 || processed.height() == 0 {
        return Err(ExportError::InvalidLayout(format!(
            "cannot place a {}x{} raster",
            processed.width(),
            processed.height(),
        )));
    }
    Ok(())
}

/// Compose one copy of `processed`, fitted into the padded page and
/// centred.
///
/// # Errors
///
/// Returns [`ExportError::InvalidLayout`] for an empty raster or a
/// layout with no content area, and [`ExportError::Allocation`] if the
/// page cannot be allocated.
pub fn compose_single(processed: &RgbaImage, layout: &PageLayout) -> Result<RgbaImage, ExportError> {
    layout.validate()?;
    check_raster(processed)?;

    let mut page = blank_canvas(layout.width, layout.height)?;
    let (w, h) = fit_within(
        processed.width(),
        processed.height(),
        layout.content_width(),
        layout.content_height(),
    );
    let scaled = imageops::resize(processed, w, h, PAGE_FILTER);
    let x = i64::from((layout.width - w) / 2);
    let y = i64::from((layout.height - h) / 2);
    imageops::overlay(&mut page, &scaled, x, y);

    tracing::info!(width = w, height = h, x, y, "composed single page");
    Ok(page)
}

/// One placed variant.
struct Placement {
    size: f64,
    cell_center_x: f64,
    cell_bottom: f64,
    image_bottom: i64,
}

/// Compose a grid of size variants of `processed`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidLayout`] for an empty raster, an
/// unusable layout, a bad size range, or a variant longer than the
/// page itself; [`ExportError::Allocation`] if
/// the page cannot be allocated; [`ExportError::Font`] if labels are
/// requested and the font fails to load.
#[allow(clippy::cast_possible_truncation)]
pub fn compose_multi(
    processed: &RgbaImage,
    count: VariantCount,
    min_size: f64,
    max_size: f64,
    show_dimensions: bool,
    layout: &PageLayout,
) -> Result<RgbaImage, ExportError> {
    layout.validate()?;
    check_raster(processed)?;
    let sizes = variant_sizes(count, min_size, max_size)?;

    let mut page = blank_canvas(layout.width, layout.height)?;
    let (columns, rows) = grid_shape(count);
    let cell_w = f64::from(layout.content_width()) / f64::from(columns);
    let cell_h = f64::from(layout.content_height()) / f64::from(rows);
    let padding = f64::from(layout.padding);

    let mut placements = Vec::with_capacity(sizes.len());
    for (index, &size) in (0u32..).zip(&sizes) {
        let left = f64::from(index % columns).mul_add(cell_w, padding);
        let top = f64::from(index / columns).mul_add(cell_h, padding);

        let target = pixels_for_inches(size, layout.dpi);
        if target > layout.width.max(layout.height) {
            return Err(ExportError::InvalidLayout(format!(
                "a {size} inch variant needs {target} px, larger than the {}x{} page",
                layout.width, layout.height,
            )));
        }
        let (w, h) = scale_longer_side(processed.width(), processed.height(), target);
        let scaled = imageops::resize(processed, w, h, PAGE_FILTER);

        let x = (left + (cell_w - f64::from(w)) / 2.0).round() as i64;
        let y = (top + (cell_h - f64::from(h)) / 2.0).round() as i64;
        imageops::overlay(&mut page, &scaled, x, y);
        tracing::debug!(index, size, width = w, height = h, x, y, "placed variant");

        placements.push(Placement {
            size,
            cell_center_x: left + cell_w / 2.0,
            cell_bottom: top + cell_h,
            image_bottom: y + i64::from(h),
        });
    }

    if show_dimensions {
        let font = LabelFont::load()?;
        for placement in &placements {
            draw_label(&mut page, &font, placement, layout);
        }
    }

    tracing::info!(
        variants = sizes.len(),
        columns,
        rows,
        labels = show_dimensions,
        "composed size grid",
    );
    Ok(page)
}

/// Centre the label under its image, or overlay it just above the cell
/// bottom when there is no room beneath.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_label(page: &mut RgbaImage, font: &LabelFont, placement: &Placement, layout: &PageLayout) {
    let text = size_label(placement.size);
    let (text_w, text_h) = font.measure(&text, layout.label_px);
    let gap = i64::from(layout.label_gap);
    let cell_bottom = placement.cell_bottom.floor() as i64;

    let below = placement.image_bottom + gap;
    let y = if below + i64::from(text_h) > cell_bottom {
        cell_bottom - i64::from(text_h) - gap
    } else {
        below
    };
    let x = (placement.cell_center_x - f64::from(text_w) / 2.0).round() as i64;

    let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    font.draw(page, &text, clamp(x), clamp(y), layout.label_px);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixels_for_inches(inches: f64, dpi: u32) -> u32 {
    (inches * f64::from(dpi)).round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Compose the page selected by `settings`.
///
/// # Errors
///
/// As [`compose_single`] or [`compose_multi`].
pub fn compose(
    processed: &RgbaImage,
    settings: &Settings,
    layout: &PageLayout,
) -> Result<RgbaImage, ExportError> {
    if settings.multi_size {
        compose_multi(
            processed,
            settings.variant_count,
            settings.min_size,
            settings.max_size,
            settings.show_dimensions,
            layout,
        )
    } else {
        compose_single(processed, layout)
    }
}
