//! Measurement overlay for inspecting placement decisions
//!
//! Draws the soft and solid subject boxes and the floor line onto the
//! canvas. Enabled with the `debug-overlay` feature.

use crate::{
    compositor::{CompositeDecorator, DecorationContext},
    types::Bounds,
};
use image::{Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};

const SOFT_COLOR: Rgba<u8> = Rgba([0, 160, 255, 255]);
const SOLID_COLOR: Rgba<u8> = Rgba([255, 64, 64, 255]);
const FLOOR_COLOR: Rgba<u8> = Rgba([0, 200, 80, 255]);

/// Decorator outlining the measured boxes and floor line
#[derive(Debug, Clone, Copy)]
pub struct MeasurementOverlay {
    /// Stroke width in canvas pixels
    pub thickness: u32,
}

impl Default for MeasurementOverlay {
    fn default() -> Self {
        Self { thickness: 2 }
    }
}

impl MeasurementOverlay {
    fn canvas_rect(context: &DecorationContext<'_>, bounds: &Bounds) -> Option<Rect> {
        let (left, top) = context.to_canvas(bounds.min_x, bounds.min_y);
        let (right, bottom) = context.to_canvas(bounds.right(), bounds.bottom());
        let width = (right - left).round() as u32;
        let height = (bottom - top).round() as u32;
        (width > 0 && height > 0)
            .then(|| Rect::at(left.round() as i32, top.round() as i32).of_size(width, height))
    }

    fn stroke(&self, canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
        for inset in 0..self.thickness.max(1) {
            let width = rect.width().saturating_sub(2 * inset);
            let height = rect.height().saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let offset = inset as i32;
            let inner = Rect::at(rect.left() + offset, rect.top() + offset).of_size(width, height);
            draw_hollow_rect_mut(canvas, inner, color);
        }
    }
}

impl CompositeDecorator for MeasurementOverlay {
    fn name(&self) -> &'static str {
        "measurement-overlay"
    }

    fn decorate(&self, canvas: &mut RgbaImage, context: &DecorationContext<'_>) {
        if let Some(rect) = Self::canvas_rect(context, &context.analysis.soft) {
            self.stroke(canvas, rect, SOFT_COLOR);
        }
        if let Some(rect) = Self::canvas_rect(context, &context.analysis.solid) {
            self.stroke(canvas, rect, SOLID_COLOR);
        }
        if let Some(floor_y) = context.plan.floor_y {
            let y = floor_y as f32;
            let right = canvas.width().saturating_sub(1) as f32;
            for t in 0..self.thickness.max(1) {
                let y = y + t as f32;
                draw_line_segment_mut(canvas, (0.0, y), (right, y), FLOOR_COLOR);
            }
        }
    }
}
