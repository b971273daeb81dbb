//! Final composite rendering and export
//!
//! Layers, in order: background (template or generated fallback), the scaled
//! subject at the planned offset, the optional logo, and any injected
//! [`CompositeDecorator`]s. The canvas is then cover-fitted to the export
//! resolution and encoded as JPEG.

use crate::{
    config::BackgroundId,
    error::{CompositeError, Result},
    types::{CompositePlan, PhotoMode, SubjectAnalysis},
};
use image::{
    codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage,
    RgbImage,
};
use tracing::{debug, warn};

/// Plain fill behind interior shots
pub const INTERIOR_FILL: [u8; 3] = [24, 24, 26];
/// Gap between the logo and the canvas edges, as a fraction of canvas width
pub const LOGO_PADDING_FRACTION: f64 = 0.02;

/// Everything a decorator may look at while drawing on the canvas
#[derive(Debug, Clone, Copy)]
pub struct DecorationContext<'a> {
    pub mode: PhotoMode,
    pub plan: &'a CompositePlan,
    /// Analysis in padded-subject coordinates
    pub analysis: &'a SubjectAnalysis,
}

impl DecorationContext<'_> {
    /// Map a padded-subject coordinate onto the canvas
    #[must_use]
    pub fn to_canvas(&self, x: u32, y: u32) -> (f64, f64) {
        (
            f64::from(self.plan.left) + f64::from(x) * self.plan.scale,
            f64::from(self.plan.top) + f64::from(y) * self.plan.scale,
        )
    }
}

/// Drawing pass applied to the finished canvas before export
pub trait CompositeDecorator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Draw onto the canvas
    fn decorate(&self, canvas: &mut RgbaImage, context: &DecorationContext<'_>);
}

/// Inputs for one composite
pub struct CompositeRequest<'a> {
    pub mode: PhotoMode,
    pub plan: &'a CompositePlan,
    pub analysis: &'a SubjectAnalysis,
    /// Padded subject buffer the plan was solved for
    pub subject: &'a RgbaImage,
    pub background_id: BackgroundId,
    /// Decoded template for `background_id`, if the asset layer found one
    pub background: Option<&'a DynamicImage>,
    pub logo: Option<&'a RgbaImage>,
    pub logo_fraction: f64,
}

/// Renders and encodes composites
pub struct Compositor {
    export: (u32, u32),
    jpeg_quality: u8,
    decorators: Vec<Box<dyn CompositeDecorator>>,
}

impl Compositor {
    #[must_use]
    pub fn new(export: (u32, u32), jpeg_quality: u8) -> Self {
        Self {
            export: (export.0.max(1), export.1.max(1)),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            decorators: Vec::new(),
        }
    }

    /// Add a drawing pass that runs after the logo and before export
    #[must_use]
    pub fn with_decorator(mut self, decorator: Box<dyn CompositeDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    #[must_use]
    pub fn decorator_count(&self) -> usize {
        self.decorators.len()
    }

    /// Render the full-size canvas without exporting it
    #[must_use]
    pub fn render(&self, request: &CompositeRequest<'_>) -> RgbaImage {
        let mut canvas = render_background(
            request.mode,
            request.plan,
            request.background_id,
            request.background,
        );
        place_subject(&mut canvas, request.subject, request.plan);

        if let Some(logo) = request.logo {
            if let Err(e) = apply_logo(&mut canvas, logo, request.logo_fraction) {
                warn!("Logo skipped: {}", e);
            }
        }

        let context = DecorationContext {
            mode: request.mode,
            plan: request.plan,
            analysis: request.analysis,
        };
        for decorator in &self.decorators {
            debug!(decorator = decorator.name(), "Applying composite decorator");
            decorator.decorate(&mut canvas, &context);
        }
        canvas
    }

    /// Render, cover-fit to the export resolution and encode
    ///
    /// # Errors
    /// Returns `CompositeError::Image` if JPEG encoding fails.
    pub fn compose(&self, request: &CompositeRequest<'_>) -> Result<Vec<u8>> {
        self.export(&self.render(request))
    }

    /// Cover-fit a rendered canvas to the export resolution and encode it
    ///
    /// # Errors
    /// Returns `CompositeError::Image` if JPEG encoding fails.
    pub fn export(&self, canvas: &RgbaImage) -> Result<Vec<u8>> {
        encode_jpeg(&cover_fit(canvas, self.export), self.jpeg_quality)
    }
}

/// Background layer at canvas size
///
/// A template is resized with Lanczos3. Without one, exterior shots get a
/// generated showroom (wall above the floor line, floor below) and interior
/// shots a plain dark fill.
#[must_use]
pub fn render_background(
    mode: PhotoMode,
    plan: &CompositePlan,
    background_id: BackgroundId,
    template: Option<&DynamicImage>,
) -> RgbaImage {
    let (width, height) = (plan.canvas_width.max(1), plan.canvas_height.max(1));

    if mode == PhotoMode::Interior {
        let [r, g, b] = INTERIOR_FILL;
        return RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    }

    if let Some(template) = template.filter(|t| t.width() > 0 && t.height() > 0) {
        let mut canvas = template
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8();
        // Templates are opaque; drop any stray transparency
        for pixel in canvas.pixels_mut() {
            pixel.0[3] = 255;
        }
        return canvas;
    }

    debug!(background = %background_id, "No template available; generating showroom");
    let (wall, floor) = background_id.fallback_colors();
    let floor_y = plan
        .floor_y
        .unwrap_or_else(|| (f64::from(height) * 0.84).round() as u32);
    RgbaImage::from_fn(width, height, |_, y| {
        let [r, g, b] = if y < floor_y { wall } else { floor };
        Rgba([r, g, b, 255])
    })
}

/// Scale the padded subject and alpha-blend it onto the canvas
pub fn place_subject(canvas: &mut RgbaImage, subject: &RgbaImage, plan: &CompositePlan) {
    if subject.width() == 0 || subject.height() == 0 {
        warn!("Empty subject buffer; nothing to place");
        return;
    }
    let scaled = if subject.dimensions() == (plan.scaled_width, plan.scaled_height) {
        subject.clone()
    } else {
        imageops::resize(
            subject,
            plan.scaled_width.max(1),
            plan.scaled_height.max(1),
            FilterType::Lanczos3,
        )
    };
    imageops::overlay(canvas, &scaled, i64::from(plan.left), i64::from(plan.top));
}

/// Scale the logo to `fraction` of canvas width and anchor it top-right
///
/// # Errors
/// Returns `CompositeError::Processing` for logos that cannot be placed;
/// callers log and continue.
pub fn apply_logo(canvas: &mut RgbaImage, logo: &RgbaImage, fraction: f64) -> Result<()> {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (logo_w, logo_h) = logo.dimensions();
    if logo_w == 0 || logo_h == 0 {
        return Err(CompositeError::processing("logo has zero size"));
    }
    if !fraction.is_finite() || fraction <= 0.0 {
        return Err(CompositeError::processing(format!(
            "invalid logo width fraction {}",
            fraction
        )));
    }

    let padding = (f64::from(canvas_w) * LOGO_PADDING_FRACTION).round() as u32;
    let target_w = ((f64::from(canvas_w) * fraction).round() as u32)
        .min(canvas_w.saturating_sub(2 * padding));
    let target_h = (f64::from(logo_h) * f64::from(target_w) / f64::from(logo_w)).round() as u32;
    if target_w == 0 || target_h == 0 || target_h + 2 * padding > canvas_h {
        return Err(CompositeError::processing(format!(
            "logo {}x{} does not fit a {}x{} canvas",
            logo_w, logo_h, canvas_w, canvas_h
        )));
    }

    let scaled = imageops::resize(logo, target_w, target_h, FilterType::Lanczos3);
    let x = canvas_w - padding - target_w;
    imageops::overlay(canvas, &scaled, i64::from(x), i64::from(padding));
    debug!(x, y = padding, width = target_w, height = target_h, "Logo applied");
    Ok(())
}

/// Aspect-preserving cover fit: scale to fill, then crop centered
#[must_use]
pub fn cover_fit(canvas: &RgbaImage, export: (u32, u32)) -> RgbImage {
    let (ew, eh) = (export.0.max(1), export.1.max(1));
    let (cw, ch) = (canvas.width().max(1), canvas.height().max(1));

    let resized = if (cw, ch) == (ew, eh) {
        canvas.clone()
    } else {
        let scale = (f64::from(ew) / f64::from(cw)).max(f64::from(eh) / f64::from(ch));
        let rw = ((f64::from(cw) * scale).ceil() as u32).max(ew);
        let rh = ((f64::from(ch) * scale).ceil() as u32).max(eh);
        let resized = imageops::resize(canvas, rw, rh, FilterType::Lanczos3);
        let x = (rw - ew) / 2;
        let y = (rh - eh) / 2;
        imageops::crop_imm(&resized, x, y, ew, eh).to_image()
    };

    DynamicImage::ImageRgba8(resized).to_rgb8()
}

/// Encode RGB pixels as JPEG
///
/// The `image` crate's baseline encoder writes every component at 1x1
/// sampling, so chroma is stored at full resolution (4:4:4).
///
/// # Errors
/// Returns `CompositeError::Image` if the encoder rejects the buffer.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder.encode_image(image)?;
    Ok(buffer)
}

/// Decode a logo asset, degrading to `None` on any failure
#[must_use]
pub fn decode_logo(bytes: &[u8]) -> Option<RgbaImage> {
    match image::load_from_memory(bytes) {
        Ok(image) => Some(image.to_rgba8()),
        Err(e) => {
            warn!("Logo could not be decoded ({}); continuing without it", e);
            None
        },
    }
}
