//! Shadow conditioning around the background-removal call
//!
//! The removal service renders a ground shadow under the vehicle, but only
//! inside the frame it is given. The conditioner therefore
//!
//! 1. pads the photo with neutral gray before the call ([`pre_pad`]),
//! 2. crops the returned cutout back while keeping part of that padding so
//!    shadow bleed survives ([`post_crop`]),
//! 3. optionally dampens the shadow ([`adjust_intensity`]),
//! 4. smooths the hard cutoff lines the service leaves behind
//!    ([`soften_edges`]), and
//! 5. wraps the trimmed subject in transparent margins for placement
//!    ([`trim_to_subject`], [`pad_for_placement`]).
//!
//! Every function returns a new buffer and leaves its input untouched.

use crate::{
    analysis::SOFT_ALPHA,
    config::ShadowConfig,
    error::{CompositeError, Result},
    types::{Padding, SubjectAnalysis},
};
use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::debug;

/// Alpha at or above which a pixel is vehicle body for intensity adjustment
pub const BODY_ALPHA: u8 = 240;
/// Alpha at or above which the bottom-up edge scan stops
const EDGE_STOP_ALPHA: u8 = 230;
/// Exclusive alpha range of a shadow edge pixel
const EDGE_MIN_ALPHA: u8 = 5;
const EDGE_MAX_ALPHA: u8 = 200;

fn fraction_of(length: u32, fraction: f64) -> u32 {
    if !fraction.is_finite() || fraction <= 0.0 {
        return 0;
    }
    (f64::from(length) * fraction).round() as u32
}

/// Whether an alpha value lies in the band the blur may touch
#[inline]
fn is_shadow_alpha(alpha: u8) -> bool {
    alpha > EDGE_MIN_ALPHA && alpha < EDGE_STOP_ALPHA
}

/// Extend the source photo with gray fill before the removal call
///
/// Top and bottom padding are measured on the height, left and right on the
/// width. Returns the padded RGB buffer and the exact insets added.
#[must_use]
pub fn pre_pad(image: &DynamicImage, config: &ShadowConfig) -> (RgbImage, Padding) {
    let source = image.to_rgb8();
    let (width, height) = source.dimensions();
    let padding = Padding {
        top: fraction_of(height, config.pre_pad_side),
        bottom: fraction_of(height, config.pre_pad_bottom),
        left: fraction_of(width, config.pre_pad_side),
        right: fraction_of(width, config.pre_pad_side),
    };

    let mut padded = RgbImage::from_pixel(
        width + padding.horizontal(),
        height + padding.vertical(),
        Rgb(config.pre_pad_color),
    );
    imageops::replace(
        &mut padded,
        &source,
        i64::from(padding.left),
        i64::from(padding.top),
    );

    debug!(
        width,
        height,
        top = padding.top,
        bottom = padding.bottom,
        side = padding.left,
        "Pre-padded source for removal"
    );
    (padded, padding)
}

/// Extent of the original photo in the pixels of the returned cutout
///
/// Equal to `original` when the service answers at the resolution it was
/// sent; scaled along each axis otherwise.
#[must_use]
pub fn inner_extent(cutout: (u32, u32), original: (u32, u32), padding: Padding) -> (u32, u32) {
    let (sx, sy) = response_scale(cutout, original, padding);
    (fraction_of(original.0, sx), fraction_of(original.1, sy))
}

fn response_scale(cutout: (u32, u32), original: (u32, u32), padding: Padding) -> (f64, f64) {
    let sent_w = (original.0 + padding.horizontal()).max(1);
    let sent_h = (original.1 + padding.vertical()).max(1);
    (
        f64::from(cutout.0) / f64::from(sent_w),
        f64::from(cutout.1) / f64::from(sent_h),
    )
}

/// Crop the service cutout back toward the original extent
///
/// A share of each padding edge is retained so shadow pixels that bled into
/// the padding survive. If the service answered at a different resolution
/// than it was sent, the padding is rescaled to the returned size first.
///
/// # Errors
/// Returns `CompositeError::Removal` for an empty cutout.
pub fn post_crop(
    cutout: &RgbaImage,
    original: (u32, u32),
    padding: Padding,
    config: &ShadowConfig,
) -> Result<RgbaImage> {
    let (cut_w, cut_h) = cutout.dimensions();
    if cut_w == 0 || cut_h == 0 {
        return Err(CompositeError::removal("service returned an empty cutout"));
    }

    let (sx, sy) = response_scale((cut_w, cut_h), original, padding);
    let (inner_w, inner_h) = inner_extent((cut_w, cut_h), original, padding);
    let padding = Padding {
        top: fraction_of(padding.top, sy),
        bottom: fraction_of(padding.bottom, sy),
        left: fraction_of(padding.left, sx),
        right: fraction_of(padding.right, sx),
    };

    let keep = Padding {
        top: fraction_of(padding.top, config.retain_side),
        bottom: fraction_of(padding.bottom, config.retain_bottom),
        left: fraction_of(padding.left, config.retain_side),
        right: fraction_of(padding.right, config.retain_side),
    };

    let x = padding.left.saturating_sub(keep.left).min(cut_w - 1);
    let y = padding.top.saturating_sub(keep.top).min(cut_h - 1);
    let w = (inner_w + keep.left + keep.right).clamp(1, cut_w - x);
    let h = (inner_h + keep.top + keep.bottom).clamp(1, cut_h - y);

    debug!(x, y, w, h, "Cropping cutout with retained shadow margin");
    Ok(imageops::crop_imm(cutout, x, y, w, h).to_image())
}

/// Scale shadow alpha by `intensity` percent
///
/// Pixels with `0 < alpha < 240` are shadow; body pixels and fully
/// transparent pixels are left alone. 100 returns an identical copy.
#[must_use]
pub fn adjust_intensity(image: &RgbaImage, intensity: u8) -> RgbaImage {
    let mut out = image.clone();
    let intensity = intensity.min(100);
    if intensity == 100 {
        return out;
    }

    let factor = f64::from(intensity) / 100.0;
    for pixel in out.pixels_mut() {
        let alpha = pixel.0[3];
        if alpha > 0 && alpha < BODY_ALPHA {
            pixel.0[3] = (f64::from(alpha) * factor).round() as u8;
        }
    }
    out
}

/// Full edge-softening pass: fade extension, band blur, border feather
#[must_use]
pub fn soften_edges(image: &RgbaImage, config: &ShadowConfig) -> RgbaImage {
    let faded = extend_shadow_fade(image, config.fade_distance, config.fade_strength);
    let blurred = blur_shadow_band(&faded, config.blur_radius);
    feather_border(&blurred, config.feather_px)
}

/// Extend each column's lowest shadow edge downward with an ease-out fade
///
/// For every column the scan runs bottom-up and stops at the first body pixel
/// (alpha >= 230). The first pixel with `5 < alpha < 200` is the edge; below
/// it the edge color is written with
/// `alpha = edge_alpha * (1 - progress^2) * strength`, but only into pixels
/// that are more transparent than that value.
#[must_use]
pub fn extend_shadow_fade(image: &RgbaImage, fade_distance: u32, strength: f64) -> RgbaImage {
    let mut out = image.clone();
    let (width, height) = image.dimensions();
    if fade_distance == 0 || height == 0 {
        return out;
    }
    let strength = if strength.is_finite() {
        strength.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut extended_columns = 0u32;
    for x in 0..width {
        let mut edge: Option<(u32, Rgba<u8>)> = None;
        for y in (0..height).rev() {
            let pixel = *image.get_pixel(x, y);
            let alpha = pixel.0[3];
            if alpha >= EDGE_STOP_ALPHA {
                break;
            }
            if alpha > EDGE_MIN_ALPHA && alpha < EDGE_MAX_ALPHA {
                edge = Some((y, pixel));
                break;
            }
        }

        let Some((edge_y, edge_pixel)) = edge else {
            continue;
        };
        extended_columns += 1;

        let edge_alpha = f64::from(edge_pixel.0[3]);
        for distance in 1..=fade_distance {
            let y = edge_y + distance;
            if y >= height {
                break;
            }
            let progress = f64::from(distance) / f64::from(fade_distance);
            let faded = (edge_alpha * (1.0 - progress * progress) * strength).round() as u8;
            let target = out.get_pixel_mut(x, y);
            if target.0[3] < faded {
                *target = Rgba([edge_pixel.0[0], edge_pixel.0[1], edge_pixel.0[2], faded]);
            }
        }
    }

    debug!(extended_columns, fade_distance, "Shadow edges extended");
    out
}

/// Horizontal box blur restricted to shadow-range pixels
///
/// Only pixels whose alpha lies strictly between 5 and 230 are rewritten;
/// body and fully transparent pixels keep their values. Color is averaged
/// with alpha weighting so transparent neighbours do not darken the shadow.
#[must_use]
pub fn blur_shadow_band(image: &RgbaImage, radius: u32) -> RgbaImage {
    let mut out = image.clone();
    if radius == 0 {
        return out;
    }
    let (width, height) = image.dimensions();

    for y in 0..height {
        for x in 0..width {
            if !is_shadow_alpha(image.get_pixel(x, y).0[3]) {
                continue;
            }

            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(width - 1);
            let mut alpha_sum = 0u32;
            let mut rgb_sum = [0u32; 3];
            for nx in x0..=x1 {
                let p = image.get_pixel(nx, y).0;
                let a = u32::from(p[3]);
                alpha_sum += a;
                rgb_sum[0] += u32::from(p[0]) * a;
                rgb_sum[1] += u32::from(p[1]) * a;
                rgb_sum[2] += u32::from(p[2]) * a;
            }

            let count = x1 - x0 + 1;
            let avg_alpha = ((f64::from(alpha_sum) / f64::from(count)).round() as u32).min(255);
            let target = out.get_pixel_mut(x, y);
            if alpha_sum > 0 {
                for (channel, sum) in target.0.iter_mut().zip(rgb_sum) {
                    *channel = ((sum + alpha_sum / 2) / alpha_sum).min(255) as u8;
                }
            }
            target.0[3] = avg_alpha as u8;
        }
    }
    out
}

/// Fade alpha linearly to zero toward every image border
#[must_use]
pub fn feather_border(image: &RgbaImage, feather_px: u32) -> RgbaImage {
    let mut out = image.clone();
    if feather_px == 0 {
        return out;
    }
    let (width, height) = image.dimensions();

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let alpha = pixel.0[3];
        if alpha == 0 {
            continue;
        }
        let distance = x
            .min(y)
            .min(width - 1 - x)
            .min(height - 1 - y);
        if distance < feather_px {
            let factor = f64::from(distance) / f64::from(feather_px);
            pixel.0[3] = (f64::from(alpha) * factor).round() as u8;
        }
    }
    out
}

/// Crop a cutout to its soft bounds
///
/// Returns the trimmed buffer and the analysis rebased into its coordinates.
/// A cutout without a valid soft box is returned unchanged.
#[must_use]
pub fn trim_to_subject(
    image: &RgbaImage,
    analysis: &SubjectAnalysis,
) -> (RgbaImage, SubjectAnalysis) {
    let soft = analysis.soft;
    let (width, height) = image.dimensions();
    if !soft.valid || soft.right() > width || soft.bottom() > height {
        return (image.clone(), *analysis);
    }

    let trimmed = imageops::crop_imm(image, soft.min_x, soft.min_y, soft.width(), soft.height())
        .to_image();
    debug!(
        from_width = width,
        from_height = height,
        width = trimmed.width(),
        height = trimmed.height(),
        "Trimmed cutout to soft bounds"
    );
    (trimmed, analysis.rebase(soft.min_x, soft.min_y))
}

/// Wrap a cutout in transparent margins that leave room for the ground shadow
///
/// Returns the padded buffer and the insets; translate bounds measured on the
/// unpadded buffer with [`SubjectAnalysis::offset_by`].
#[must_use]
pub fn pad_for_placement(image: &RgbaImage, config: &ShadowConfig) -> (RgbaImage, Padding) {
    let (width, height) = image.dimensions();
    let padding = Padding {
        top: fraction_of(height, config.placement_pad_side),
        bottom: fraction_of(height, config.placement_pad_bottom),
        left: fraction_of(width, config.placement_pad_side),
        right: fraction_of(width, config.placement_pad_side),
    };

    let mut padded = RgbaImage::from_pixel(
        width + padding.horizontal(),
        height + padding.vertical(),
        Rgba([0, 0, 0, 0]),
    );
    imageops::replace(
        &mut padded,
        image,
        i64::from(padding.left),
        i64::from(padding.top),
    );
    (padded, padding)
}

/// Count of pixels that the analyzer would place inside the soft box
#[must_use]
pub fn soft_pixel_count(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| p.0[3] > SOFT_ALPHA).count()
}
