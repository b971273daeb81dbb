//! End-to-end compositing scenarios on synthetic cutouts

mod common;

use common::*;
use image::{DynamicImage, Rgba, RgbaImage};
use showroom_compose::{
    analysis::analyze_rgba,
    classifier::classify,
    shadow::adjust_intensity,
    BackgroundId, CompositeConfig, PhotoMode, ReprocessHint, ShowroomProcessor,
};

fn export_size(jpeg: &[u8]) -> (u32, u32) {
    let decoded = image::load_from_memory(jpeg).unwrap();
    (decoded.width(), decoded.height())
}

#[test]
fn scenario_opaque_buffer_without_alpha_is_interior() {
    let photo = opaque_photo(1200, 800);
    let analysis = showroom_compose::analyze(&photo);
    assert!(!analysis.has_alpha);
    assert_eq!(classify(&analysis).mode, PhotoMode::Interior);

    let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
    let result = processor.compose_cutout(&photo, (1200, 800)).unwrap();
    assert_eq!(result.classification.mode, PhotoMode::Interior);
    assert!(!result.classification.interior_hint);
    assert!(result.plan.floor_y.is_none());
    assert_eq!(export_size(&result.jpeg), (1920, 1080));
}

#[test]
fn scenario_grounded_car_is_exterior_on_the_floor_line() {
    let cutout = exterior_cutout();

    let raw = analyze_rgba(&cutout, true);
    assert_eq!(raw.solid.width(), 400);
    assert!(raw.bottom_touch_ratio >= 0.69);
    let classification = classify(&raw);
    assert_eq!(classification.mode, PhotoMode::Exterior);
    assert!(!classification.interior_hint);

    let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
    let result = processor
        .compose_cutout(&DynamicImage::ImageRgba8(cutout), (1000, 500))
        .unwrap();
    assert_eq!(result.classification.mode, PhotoMode::Exterior);
    assert!(!result.reprocessed);

    let floor = (f64::from(result.plan.canvas_height) * 0.84).round();
    assert_eq!(result.plan.floor_y, Some(floor as u32));
    let bottom = scaled_solid_bottom(&result);
    assert!(
        (bottom - floor).abs() <= 1.0,
        "solid bottom {} vs floor {}",
        bottom,
        floor
    );

    let margin = (f64::from(result.plan.canvas_width) * 0.05).round();
    let (left, right) = scaled_solid_span(&result);
    assert!(left >= margin - 1.0);
    assert!(right <= f64::from(result.plan.canvas_width) - margin + 1.0);
}

#[test]
fn scenario_reprocessing_prior_output_is_idempotent() {
    let cutout = prior_composite_cutout();
    let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
    let result = processor
        .compose_cutout(&DynamicImage::ImageRgba8(cutout), (1920, 1080))
        .unwrap();

    assert!(result.reprocessed);
    assert!((result.target_fraction - 0.75).abs() < 1e-9);
    assert_eq!(result.plan.canvas_width, 1920);
    assert_eq!(result.plan.canvas_height, 1080);
    assert!((result.plan.scale - 1.0).abs() < 1e-9);

    // Body lands where the previous run put it
    let (left, right) = scaled_solid_span(&result);
    assert!((left - 240.0).abs() <= 2.0, "left edge at {}", left);
    assert!((right - 1680.0).abs() <= 2.0, "right edge at {}", right);
    assert!((scaled_solid_bottom(&result) - 907.0).abs() <= 1.0);
}

#[test]
fn scenario_reprocessing_survives_half_resolution_service() {
    // The 1920x1080 upload is sent as 1996x1188 with the photo at (38, 22);
    // the service answers at half size with the body spanning 75% of the photo
    let half_size = |encoded: &[u8]| -> showroom_compose::Result<Vec<u8>> {
        let request = image::load_from_memory(encoded).unwrap();
        assert_eq!((request.width(), request.height()), (1996, 1188));
        let mut cutout = RgbaImage::from_pixel(998, 594, CLEAR);
        fill(&mut cutout, (120, 464), (880, 476), shadow(100));
        fill(&mut cutout, (139, 261), (859, 464), BODY);
        Ok(png_bytes(&cutout))
    };
    let processor =
        ShowroomProcessor::with_remover(CompositeConfig::default(), Box::new(half_size)).unwrap();
    let result = processor.process_image(&opaque_photo(1920, 1080)).unwrap();

    assert!(result.reprocessed);
    assert_eq!(result.classification.mode, PhotoMode::Exterior);
    assert!(
        (result.target_fraction - 0.75).abs() < 1e-9,
        "recovered target {}",
        result.target_fraction
    );
    assert_eq!(export_size(&result.jpeg), (1920, 1080));
}

#[test]
fn scenario_frame_filling_opaque_cutout_is_interior() {
    let cabin = RgbaImage::from_pixel(1600, 1200, BODY);
    let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
    let result = processor
        .compose_cutout(&DynamicImage::ImageRgba8(cabin), (1600, 1200))
        .unwrap();
    assert_eq!(result.classification.mode, PhotoMode::Interior);
    assert!(!result.classification.interior_hint);
    assert!(result.plan.floor_y.is_none());

    // Same outcome when the service hands back an all-opaque frame
    let opaque_service = |encoded: &[u8]| -> showroom_compose::Result<Vec<u8>> {
        let request = image::load_from_memory(encoded).unwrap();
        Ok(png_bytes(&RgbaImage::from_pixel(
            request.width(),
            request.height(),
            BODY,
        )))
    };
    let processor =
        ShowroomProcessor::with_remover(CompositeConfig::default(), Box::new(opaque_service))
            .unwrap();
    let result = processor.process_image(&opaque_photo(1600, 1200)).unwrap();
    assert_eq!(result.classification.mode, PhotoMode::Interior);
    assert_eq!(export_size(&result.jpeg), (1920, 1080));
}

#[test]
fn scenario_explicit_marker_overrides_dimension_sniffing() {
    let config = CompositeConfig::builder()
        .reprocess(ReprocessHint::Force(false))
        .build()
        .unwrap();
    let processor = ShowroomProcessor::new(config).unwrap();
    let result = processor
        .compose_cutout(
            &DynamicImage::ImageRgba8(prior_composite_cutout()),
            (1920, 1080),
        )
        .unwrap();
    assert!(!result.reprocessed);
    assert!((result.target_fraction - 0.82).abs() < 1e-9);
}

#[test]
fn scenario_half_intensity_halves_shadow_only() {
    let mut cutout = RgbaImage::from_pixel(4, 1, Rgba([0, 0, 0, 0]));
    cutout.put_pixel(0, 0, shadow(180));
    cutout.put_pixel(1, 0, BODY);
    cutout.put_pixel(2, 0, shadow(240));

    let adjusted = adjust_intensity(&cutout, 50);
    assert_eq!(adjusted.get_pixel(0, 0).0[3], 90);
    assert_eq!(adjusted.get_pixel(1, 0).0[3], 255);
    assert_eq!(adjusted.get_pixel(2, 0).0[3], 240);
    assert_eq!(adjusted.get_pixel(3, 0).0[3], 0);
}

#[test]
fn full_pipeline_with_removal_service() {
    init_logging();
    let processor =
        ShowroomProcessor::with_remover(CompositeConfig::default(), Box::new(mock_remover))
            .unwrap();
    let result = processor.process_image(&opaque_photo(800, 500)).unwrap();

    assert_eq!(result.classification.mode, PhotoMode::Exterior);
    assert_eq!(result.original_dimensions, (800, 500));
    assert_eq!(export_size(&result.jpeg), (1920, 1080));
    assert!(
        (scaled_solid_bottom(&result) - f64::from(result.plan.floor_y.unwrap())).abs() <= 1.0
    );

    // The solid box reaches the configured minimum share of the canvas
    let (left, right) = scaled_solid_span(&result);
    let share = (right - left) / f64::from(result.plan.canvas_width);
    assert!((share - 0.70).abs() < 0.01, "solid share {}", share);
}

#[test]
fn full_pipeline_from_encoded_bytes_with_dark_background() {
    let config = CompositeConfig::builder()
        .background(BackgroundId::StudioDark)
        .shadow_intensity(40)
        .build()
        .unwrap();
    let processor = ShowroomProcessor::with_remover(config, Box::new(mock_remover)).unwrap();

    let mut photo = Vec::new();
    opaque_photo(640, 400)
        .write_to(&mut std::io::Cursor::new(&mut photo), image::ImageFormat::Jpeg)
        .unwrap();
    let result = processor.process_bytes(&photo).unwrap();
    assert_eq!(result.original_dimensions, (640, 400));
    assert_eq!(image::guess_format(&result.jpeg).unwrap(), image::ImageFormat::Jpeg);
}

#[test]
fn one_processor_serves_parallel_requests() {
    let processor = std::sync::Arc::new(
        ShowroomProcessor::with_remover(CompositeConfig::default(), Box::new(mock_remover))
            .unwrap(),
    );

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let processor = std::sync::Arc::clone(&processor);
            std::thread::spawn(move || processor.process_image(&opaque_photo(300 + i * 40, 200)))
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.classification.mode, PhotoMode::Exterior);
    }
}
