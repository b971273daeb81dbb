//! Scale and placement solver
//!
//! Turns bounding-box measurements of the padded subject buffer into a
//! [`CompositePlan`]: canvas size, subject scale and top-left offset.
//!
//! Exterior shots follow the showroom metaphor. The solid box is centered,
//! its bottom rests on the floor line and it keeps a minimum distance to
//! both side walls. Interior shots are simply centered on their soft box.

use crate::{
    config::LayoutConfig,
    types::{CompositePlan, PhotoMode, SubjectAnalysis},
};
use tracing::debug;

/// Fallback when a caller hands in a non-finite or non-positive target
const DEFAULT_TARGET: f64 = 0.82;
const MIN_TARGET: f64 = 0.10;
const MAX_TARGET: f64 = 0.98;

/// Canvas height for a 16:9 canvas of the given width
#[must_use]
pub fn canvas_height_for(width: u32) -> u32 {
    (f64::from(width) * 9.0 / 16.0).round().max(1.0) as u32
}

/// Clamp a target width fraction into a range the solver can work with
#[must_use]
pub fn sanitize_target(target: f64) -> f64 {
    if target.is_finite() && target > 0.0 {
        target.clamp(MIN_TARGET, MAX_TARGET)
    } else {
        DEFAULT_TARGET
    }
}

/// Canvas size derived from the solid width and target fraction
///
/// Normal runs never go below the export width; reprocessed runs skip that
/// floor so an already-correct composite is not forced larger.
#[must_use]
pub fn canvas_size(
    solid_width: u32,
    target: f64,
    reprocessed: bool,
    layout: &LayoutConfig,
) -> (u32, u32) {
    let target = sanitize_target(target);
    let fitted = (f64::from(solid_width.max(1)) / target).round().max(1.0) as u32;
    let width = if reprocessed {
        fitted
    } else {
        fitted.max(layout.export_dimensions().0)
    };
    (width, canvas_height_for(width))
}

/// Target fraction recovered from a prior composite
///
/// The solid width is measured against the width the original upload spans
/// in the same pixels as `analysis`, and clamped so repeated runs neither
/// shrink nor inflate the vehicle.
#[must_use]
pub fn reprocess_target(
    analysis: &SubjectAnalysis,
    reference_width: u32,
    layout: &LayoutConfig,
) -> f64 {
    let fraction = f64::from(analysis.solid.width()) / f64::from(reference_width.max(1));
    let (lo, hi) = (
        layout.reprocess_target_min.min(layout.reprocess_target_max),
        layout.reprocess_target_max.max(layout.reprocess_target_min),
    );
    fraction.clamp(lo, hi)
}

/// Offset clamped so a `size`-long span stays inside `[0, canvas]`
fn clamp_offset(offset: f64, canvas: u32, size: u32) -> u32 {
    let max = f64::from(canvas.saturating_sub(size));
    if offset.is_finite() {
        offset.clamp(0.0, max).round() as u32
    } else {
        0
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Solve placement for either photo mode
///
/// `analysis` must already be expressed in the coordinates of the padded
/// subject buffer of size `padded`.
#[must_use]
pub fn solve(
    mode: PhotoMode,
    analysis: &SubjectAnalysis,
    padded: (u32, u32),
    target: f64,
    reprocessed: bool,
    layout: &LayoutConfig,
) -> CompositePlan {
    let plan = match mode {
        PhotoMode::Exterior => solve_exterior(analysis, padded, target, reprocessed, layout),
        PhotoMode::Interior => solve_interior(analysis, padded, target, reprocessed, layout),
    };
    debug!(
        %mode,
        canvas_width = plan.canvas_width,
        canvas_height = plan.canvas_height,
        scale = plan.scale,
        left = plan.left,
        top = plan.top,
        reprocessed,
        "Placement solved"
    );
    plan
}

/// Showroom placement: floor line, centered solid box, side margins
#[must_use]
pub fn solve_exterior(
    analysis: &SubjectAnalysis,
    padded: (u32, u32),
    target: f64,
    reprocessed: bool,
    layout: &LayoutConfig,
) -> CompositePlan {
    let target = sanitize_target(target);
    let solid = analysis.solid;
    let (canvas_w, canvas_h) = canvas_size(solid.width(), target, reprocessed, layout);
    let (cw, ch) = (f64::from(canvas_w), f64::from(canvas_h));
    let (pw, ph) = (f64::from(padded.0.max(1)), f64::from(padded.1.max(1)));
    let solid_w = f64::from(solid.width());
    let solid_bottom = f64::from(solid.bottom());

    let min_pct = (target - layout.min_width_spread).max(layout.min_width_floor);
    let max_pct = if reprocessed {
        layout.reprocessed_max_width
    } else {
        (target + layout.max_width_spread).min(layout.max_width_ceiling)
    };

    let width_pct = solid_w / cw;
    let mut scale = if width_pct < min_pct {
        min_pct / width_pct
    } else if width_pct > max_pct {
        max_pct / width_pct
    } else {
        1.0
    };

    let floor_fraction = layout.floor_fraction.clamp(0.0, 1.0);
    let floor_y = (ch * floor_fraction).round();
    let margin = (cw * layout.side_margin_fraction.clamp(0.0, 0.5)).round();

    // Fit the canvas and keep the lowest solid pixel on or above the floor
    scale = scale.min(cw / pw).min(ch / ph).min(floor_y / solid_bottom);
    // Leave room for both side margins
    let usable = cw - 2.0 * margin;
    if usable > 0.0 {
        scale = scale.min(usable / solid_w);
    }
    let scale = positive_or(scale, 1.0);

    let scaled_w = (pw * scale).round().max(1.0) as u32;
    let scaled_h = (ph * scale).round().max(1.0) as u32;

    let mut left = (cw / 2.0 - solid.center_x() * scale).round();
    let top = floor_y - (solid_bottom * scale).round();

    let solid_left = left + f64::from(solid.min_x) * scale;
    let solid_right = left + f64::from(solid.right()) * scale;
    if solid_left < margin {
        left += (margin - solid_left).ceil();
    } else if solid_right > cw - margin {
        left -= (solid_right - (cw - margin)).ceil();
    }

    CompositePlan {
        canvas_width: canvas_w,
        canvas_height: canvas_h,
        scale,
        left: clamp_offset(left, canvas_w, scaled_w),
        top: clamp_offset(top, canvas_h, scaled_h),
        scaled_width: scaled_w,
        scaled_height: scaled_h,
        floor_y: Some(floor_y as u32),
    }
}

/// Cabin placement: soft box centered, fitted into most of the canvas
#[must_use]
pub fn solve_interior(
    analysis: &SubjectAnalysis,
    padded: (u32, u32),
    target: f64,
    reprocessed: bool,
    layout: &LayoutConfig,
) -> CompositePlan {
    let soft = analysis.soft;
    let (canvas_w, canvas_h) =
        canvas_size(analysis.solid.width(), target, reprocessed, layout);
    let (cw, ch) = (f64::from(canvas_w), f64::from(canvas_h));
    let (pw, ph) = (f64::from(padded.0.max(1)), f64::from(padded.1.max(1)));
    let fill = layout.interior_fill_fraction.clamp(0.0, 1.0);

    let scale = (fill * cw / f64::from(soft.width()))
        .min(fill * ch / f64::from(soft.height()))
        .min(cw / pw)
        .min(ch / ph);
    let (min_scale, max_scale) = (
        layout.interior_min_scale.min(layout.interior_max_scale),
        layout.interior_max_scale.max(layout.interior_min_scale),
    );
    let scale = positive_or(scale, 1.0).clamp(min_scale, max_scale);

    let scaled_w = (pw * scale).round().max(1.0) as u32;
    let scaled_h = (ph * scale).round().max(1.0) as u32;
    let left = cw / 2.0 - soft.center_x() * scale;
    let top = ch / 2.0 - soft.center_y() * scale;

    CompositePlan {
        canvas_width: canvas_w,
        canvas_height: canvas_h,
        scale,
        left: clamp_offset(left, canvas_w, scaled_w),
        top: clamp_offset(top, canvas_h, scaled_h),
        scaled_width: scaled_w,
        scaled_height: scaled_h,
        floor_y: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bounds, Padding};

    /// Analysis of a trimmed subject wrapped in placement padding
    fn padded_subject(solid_w: u32, solid_h: u32, shadow_rows: u32) -> (SubjectAnalysis, (u32, u32)) {
        let trimmed = (solid_w, solid_h + shadow_rows);
        let padding = Padding {
            top: (f64::from(trimmed.1) * 0.03).round() as u32,
            bottom: (f64::from(trimmed.1) * 0.10).round() as u32,
            left: (f64::from(trimmed.0) * 0.03).round() as u32,
            right: (f64::from(trimmed.0) * 0.03).round() as u32,
        };
        let soft = Bounds {
            min_x: 0,
            max_x: solid_w - 1,
            min_y: 0,
            max_y: trimmed.1 - 1,
            valid: true,
        };
        let solid = Bounds {
            max_y: solid_h - 1,
            ..soft
        };
        let analysis = SubjectAnalysis {
            soft,
            solid,
            soft_coverage: 0.4,
            solid_coverage: 0.3,
            soft_width_pct: 1.0,
            soft_height_pct: 1.0,
            opaque_ratio: 0.3,
            bottom_touch_ratio: 0.5,
            has_alpha: true,
            image_width: trimmed.0,
            image_height: trimmed.1,
        }
        .offset_by(&padding);
        (
            analysis,
            (trimmed.0 + padding.horizontal(), trimmed.1 + padding.vertical()),
        )
    }

    #[test]
    fn test_canvas_size_floors_at_export_width() {
        let layout = LayoutConfig::default();
        assert_eq!(canvas_size(800, 0.82, false, &layout), (1920, 1080));
        assert_eq!(canvas_size(3280, 0.82, false, &layout), (4000, 2250));
        // Reprocessed runs may go below the export width
        assert_eq!(canvas_size(1200, 0.75, true, &layout), (1600, 900));
    }

    #[test]
    fn test_canvas_height_is_sixteen_by_nine() {
        for width in [1, 7, 1000, 1919, 1920, 2001, 4321] {
            let height = canvas_height_for(width);
            assert_eq!(height, (f64::from(width) * 9.0 / 16.0).round().max(1.0) as u32);
        }
    }

    #[test]
    fn test_sanitize_target() {
        assert!((sanitize_target(0.82) - 0.82).abs() < f64::EPSILON);
        assert!((sanitize_target(f64::NAN) - 0.82).abs() < f64::EPSILON);
        assert!((sanitize_target(-1.0) - 0.82).abs() < f64::EPSILON);
        assert!((sanitize_target(5.0) - 0.98).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exterior_rests_on_floor_line() {
        let layout = LayoutConfig::default();
        let (analysis, padded) = padded_subject(1640, 600, 40);
        let plan = solve_exterior(&analysis, padded, 0.82, false, &layout);

        assert_eq!((plan.canvas_width, plan.canvas_height), (2000, 1125));
        assert!((plan.scale - 1.0).abs() < 1e-9);
        let floor = (1125.0_f64 * 0.84).round();
        let bottom = f64::from(plan.top) + f64::from(analysis.solid.bottom()) * plan.scale;
        assert!((bottom - floor).abs() <= 1.0, "bottom {} floor {}", bottom, floor);
        assert_eq!(plan.floor_y, Some(floor as u32));

        // Horizontally centered
        let center = f64::from(plan.left) + analysis.solid.center_x() * plan.scale;
        assert!((center - 1000.0).abs() <= 1.0);
    }

    #[test]
    fn test_small_subject_is_scaled_up_to_min_width() {
        let layout = LayoutConfig::default();
        // 600px on a 1920 canvas is ~31%, below the 70% minimum
        let (analysis, padded) = padded_subject(600, 250, 20);
        let plan = solve_exterior(&analysis, padded, 0.82, false, &layout);
        assert_eq!(plan.canvas_width, 1920);
        let width_pct = 600.0 * plan.scale / 1920.0;
        assert!((width_pct - 0.70).abs() < 1e-6, "{}", width_pct);
    }

    #[test]
    fn test_tall_subject_is_limited_by_floor() {
        let layout = LayoutConfig::default();
        let (analysis, padded) = padded_subject(1000, 1400, 10);
        let plan = solve_exterior(&analysis, padded, 0.82, false, &layout);
        let floor = (f64::from(plan.canvas_height) * 0.84).round();
        let bottom = f64::from(plan.top) + f64::from(analysis.solid.bottom()) * plan.scale;
        assert!(bottom <= floor + 1.0);
        assert!(plan.scaled_height <= plan.canvas_height);
    }

    #[test]
    fn test_exterior_keeps_side_margins() {
        let layout = LayoutConfig::default();
        for target in [0.60, 0.75, 0.82, 0.90, 0.95] {
            for reprocessed in [false, true] {
                let (analysis, padded) = padded_subject(1800, 700, 30);
                let plan = solve_exterior(&analysis, padded, target, reprocessed, &layout);
                let margin = (f64::from(plan.canvas_width) * 0.05).round();
                let left = f64::from(plan.left) + f64::from(analysis.solid.min_x) * plan.scale;
                let right =
                    f64::from(plan.left) + f64::from(analysis.solid.right()) * plan.scale;
                assert!(left >= margin - 1.0, "target {} left {}", target, left);
                assert!(
                    right <= f64::from(plan.canvas_width) - margin + 1.0,
                    "target {} right {}",
                    target,
                    right
                );
            }
        }
    }

    #[test]
    fn test_reprocessed_run_is_stable() {
        let layout = LayoutConfig::default();
        // A prior 1920x1080 composite whose vehicle spans 75% of the frame
        let (analysis, padded) = padded_subject(1440, 540, 20);
        let target = {
            let mut measured = analysis;
            measured.solid.min_x = 0;
            measured.solid.max_x = 1439;
            reprocess_target(&measured, 1920, &layout)
        };
        assert!((target - 0.75).abs() < 1e-9);

        let plan = solve_exterior(&analysis, padded, target, true, &layout);
        assert_eq!((plan.canvas_width, plan.canvas_height), (1920, 1080));
        assert!((plan.scale - 1.0).abs() < 1e-9);
        let solid_left = f64::from(plan.left) + f64::from(analysis.solid.min_x) * plan.scale;
        assert!((solid_left - 240.0).abs() <= 1.0);
    }

    #[test]
    fn test_reprocess_target_clamps() {
        let layout = LayoutConfig::default();
        let (mut analysis, _) = padded_subject(100, 50, 5);
        analysis.solid.min_x = 0;
        analysis.solid.max_x = 99;
        assert!((reprocess_target(&analysis, 1920, &layout) - 0.60).abs() < 1e-9);
        analysis.solid.max_x = 1919;
        assert!((reprocess_target(&analysis, 1920, &layout) - 0.95).abs() < 1e-9);
        assert!((reprocess_target(&analysis, 0, &layout) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_interior_centers_soft_box() {
        let layout = LayoutConfig::default();
        let bounds = Bounds::full_frame(3000, 2000);
        let analysis = SubjectAnalysis {
            soft: bounds,
            solid: bounds,
            ..SubjectAnalysis::fallback(3000, 2000)
        };
        let plan = solve_interior(&analysis, (3000, 2000), 0.82, false, &layout);

        assert_eq!(plan.canvas_height, canvas_height_for(plan.canvas_width));
        assert!(plan.floor_y.is_none());
        assert!(plan.scale >= 0.1 && plan.scale <= 2.0);
        assert!(plan.scaled_width <= plan.canvas_width);
        assert!(plan.scaled_height <= plan.canvas_height);
        let cx = f64::from(plan.left) + f64::from(plan.scaled_width) / 2.0;
        let cy = f64::from(plan.top) + f64::from(plan.scaled_height) / 2.0;
        assert!((cx - f64::from(plan.canvas_width) / 2.0).abs() <= 1.0);
        assert!((cy - f64::from(plan.canvas_height) / 2.0).abs() <= 1.0);
        // Height bound binds at 90% of the canvas
        assert!(
            (f64::from(plan.scaled_height) - 0.9 * f64::from(plan.canvas_height)).abs() <= 1.0
        );
    }

    #[test]
    fn test_interior_scale_is_clamped() {
        let layout = LayoutConfig::default();
        let tiny = Bounds {
            min_x: 0,
            max_x: 9,
            min_y: 0,
            max_y: 9,
            valid: true,
        };
        let analysis = SubjectAnalysis {
            soft: tiny,
            solid: tiny,
            ..SubjectAnalysis::fallback(10, 10)
        };
        let plan = solve_interior(&analysis, (10, 10), 0.82, false, &layout);
        assert!((plan.scale - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_every_plan_is_sixteen_by_nine() {
        let layout = LayoutConfig::default();
        for (w, h) in [(300, 200), (1200, 500), (2600, 900), (5000, 2400)] {
            let (analysis, padded) = padded_subject(w, h, 15);
            for mode in [PhotoMode::Exterior, PhotoMode::Interior] {
                for reprocessed in [false, true] {
                    let plan = solve(mode, &analysis, padded, 0.82, reprocessed, &layout);
                    assert_eq!(
                        plan.canvas_height,
                        (f64::from(plan.canvas_width) * 9.0 / 16.0).round() as u32
                    );
                    assert!(plan.left + plan.scaled_width <= plan.canvas_width.max(plan.scaled_width));
                }
            }
        }
    }
}
