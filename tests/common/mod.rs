//! Synthetic cutout fixtures shared by the integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use showroom_compose::{CompositeError, Result};

/// Route `log` records to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const BODY: Rgba<u8> = Rgba([40, 44, 52, 255]);
pub const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Fill the half-open rectangle `[x0, x1) x [y0, y1)` with `pixel`
pub fn fill(image: &mut RgbaImage, (x0, y0): (u32, u32), (x1, y1): (u32, u32), pixel: Rgba<u8>) {
    for y in y0..y1.min(image.height()) {
        for x in x0..x1.min(image.width()) {
            image.put_pixel(x, y, pixel);
        }
    }
}

pub fn shadow(alpha: u8) -> Rgba<u8> {
    Rgba([10, 10, 10, alpha])
}

/// Vehicle with a shadow strip running to the bottom edge
///
/// 1000x500 cutout: body 40% of the width, shadow across 70% of the columns
/// in the bottom rows.
pub fn exterior_cutout() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(1000, 500, CLEAR);
    fill(&mut image, (150, 470), (850, 500), shadow(120));
    fill(&mut image, (300, 300), (700, 470), BODY);
    image
}

/// A prior 1920x1080 composite cut out again: body 75% of the width
/// resting on the floor line at row 907
pub fn prior_composite_cutout() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(1920, 1080, CLEAR);
    fill(&mut image, (200, 907), (1720, 930), shadow(100));
    fill(&mut image, (240, 500), (1680, 907), BODY);
    image
}

/// Opaque RGB photo, as if the service returned no alpha at all
pub fn opaque_photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([70, 60, 50])))
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("PNG encoding");
    bytes
}

/// Stand-in for the removal service: a wide body across the middle of the
/// padded frame with a soft shadow strip below it
pub fn mock_remover(encoded: &[u8]) -> Result<Vec<u8>> {
    let photo = image::load_from_memory(encoded)
        .map_err(|e| CompositeError::removal(format!("mock could not decode request: {}", e)))?;
    let (w, h) = (photo.width(), photo.height());
    let mut cutout = RgbaImage::from_pixel(w, h, CLEAR);
    fill(&mut cutout, (w / 20, h * 3 / 4), (w * 19 / 20, h * 4 / 5), shadow(110));
    fill(&mut cutout, (w / 10, h / 3), (w * 9 / 10, h * 3 / 4), BODY);
    Ok(png_bytes(&cutout))
}

/// Deterministic pseudo-random alpha noise for property-style tests
pub fn noise_cutout(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    RgbaImage::from_fn(width, height, |_, _| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let bits = (state >> 33) as u32;
        // Mostly transparent with scattered shadow and body pixels
        let alpha = match bits % 10 {
            0..=5 => 0,
            6 | 7 => (bits >> 8) as u8 % 200,
            _ => 200 + (bits >> 8) as u8 % 56,
        };
        Rgba([(bits >> 4) as u8, (bits >> 12) as u8, (bits >> 20) as u8, alpha])
    })
}

/// Scaled bottom edge of the solid box on the canvas
pub fn scaled_solid_bottom(result: &showroom_compose::CompositeResult) -> f64 {
    f64::from(result.plan.top) + f64::from(result.analysis.solid.bottom()) * result.plan.scale
}

/// Scaled horizontal extent of the solid box on the canvas
pub fn scaled_solid_span(result: &showroom_compose::CompositeResult) -> (f64, f64) {
    let left = f64::from(result.plan.left);
    let scale = result.plan.scale;
    (
        left + f64::from(result.analysis.solid.min_x) * scale,
        left + f64::from(result.analysis.solid.right()) * scale,
    )
}
