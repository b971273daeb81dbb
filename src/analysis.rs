//! Alpha bounds analysis of cutouts
//!
//! Scans a cutout once and measures two bounding boxes: the *soft* box of
//! every pixel with alpha above [`SOFT_ALPHA`] (subject plus shadow) and the
//! *solid* box of pixels above [`SOLID_ALPHA`] (vehicle body only), together
//! with the coverage ratios the classifier relies on.
//!
//! The analyzer never fails. Unreadable input degrades to
//! [`SubjectAnalysis::fallback`] so later stages always see well-formed data.

use crate::types::{Bounds, SubjectAnalysis};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

/// Alpha above which a pixel belongs to the soft box
pub const SOFT_ALPHA: u8 = 20;
/// Alpha above which a pixel belongs to the solid box
pub const SOLID_ALPHA: u8 = 200;
/// Alpha above which a pixel counts as fully opaque
pub const OPAQUE_ALPHA: u8 = 250;
/// Height share of the bottom band used for floor-contact detection
pub const BOTTOM_BAND_FRACTION: f64 = 0.02;

/// Running min/max accumulator for one bounding box
#[derive(Debug, Clone, Copy)]
struct BoundsAccumulator {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    pixels: u64,
}

impl BoundsAccumulator {
    fn new() -> Self {
        Self {
            min_x: u32::MAX,
            max_x: 0,
            min_y: u32::MAX,
            max_y: 0,
            pixels: 0,
        }
    }

    #[inline]
    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.pixels += 1;
    }

    fn finish(self, width: u32, height: u32) -> Bounds {
        if self.pixels == 0 {
            return Bounds::full_frame(width, height);
        }
        Bounds {
            min_x: self.min_x,
            max_x: self.max_x,
            min_y: self.min_y,
            max_y: self.max_y,
            valid: true,
        }
    }
}

/// First row of the bottom band (always at least one row tall)
fn bottom_band_start(height: u32) -> u32 {
    let band = ((f64::from(height) * BOTTOM_BAND_FRACTION).ceil() as u32).max(1);
    height.saturating_sub(band)
}

/// Analyze a decoded image, taking `has_alpha` from its color type
#[must_use]
pub fn analyze(image: &DynamicImage) -> SubjectAnalysis {
    let has_alpha = image.color().has_alpha();
    analyze_rgba(&image.to_rgba8(), has_alpha)
}

/// Analyze encoded image bytes
///
/// Decode failures yield the conservative fallback analysis.
#[must_use]
pub fn analyze_bytes(bytes: &[u8]) -> SubjectAnalysis {
    match image::load_from_memory(bytes) {
        Ok(image) => analyze(&image),
        Err(e) => {
            warn!("Cutout could not be decoded ({}); using fallback analysis", e);
            SubjectAnalysis::fallback(1, 1)
        },
    }
}

/// Analyze an RGBA buffer
///
/// `has_alpha` records whether the source actually carried an alpha channel;
/// an RGB image promoted to RGBA is fully opaque and must not be mistaken for
/// a cutout.
#[must_use]
pub fn analyze_rgba(image: &RgbaImage, has_alpha: bool) -> SubjectAnalysis {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        warn!("Empty cutout buffer; using fallback analysis");
        return SubjectAnalysis::fallback(width, height);
    }

    let band_start = bottom_band_start(height);
    let mut soft = BoundsAccumulator::new();
    let mut solid = BoundsAccumulator::new();
    let mut opaque_pixels: u64 = 0;
    let mut bottom_touch = vec![false; width as usize];

    for (y, row) in image.rows().enumerate() {
        let y = y as u32;
        let in_band = y >= band_start;
        for (x, pixel) in row.enumerate() {
            let alpha = pixel.0[3];
            if alpha <= SOFT_ALPHA {
                continue;
            }
            let x = x as u32;
            soft.include(x, y);
            if in_band {
                if let Some(touched) = bottom_touch.get_mut(x as usize) {
                    *touched = true;
                }
            }
            if alpha > SOLID_ALPHA {
                solid.include(x, y);
                if alpha > OPAQUE_ALPHA {
                    opaque_pixels += 1;
                }
            }
        }
    }

    let total = u64::from(width) * u64::from(height);
    let total_f = total as f64;
    let soft_pixels = soft.pixels;
    let solid_pixels = solid.pixels;
    let soft_bounds = soft.finish(width, height);
    let solid_bounds = solid.finish(width, height);
    let touched_columns = bottom_touch.iter().filter(|&&t| t).count();

    let analysis = SubjectAnalysis {
        soft: soft_bounds,
        solid: solid_bounds,
        soft_coverage: soft_pixels as f64 / total_f,
        solid_coverage: solid_pixels as f64 / total_f,
        soft_width_pct: f64::from(soft_bounds.width()) / f64::from(width),
        soft_height_pct: f64::from(soft_bounds.height()) / f64::from(height),
        opaque_ratio: opaque_pixels as f64 / total_f,
        bottom_touch_ratio: touched_columns as f64 / f64::from(width),
        has_alpha,
        image_width: width,
        image_height: height,
    };

    debug!(
        width,
        height,
        soft_valid = analysis.soft.valid,
        solid_valid = analysis.solid.valid,
        soft_coverage = analysis.soft_coverage,
        opaque_ratio = analysis.opaque_ratio,
        bottom_touch_ratio = analysis.bottom_touch_ratio,
        "Alpha bounds analyzed"
    );

    analysis
}
