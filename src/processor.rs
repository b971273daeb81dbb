//! Studio compositing processor
//!
//! `ShowroomProcessor` runs the full pipeline for one photo:
//! pre-pad → removal call → post-crop → intensity → edge softening →
//! analysis → classification → placement → composite → export.
//! It holds no per-request state, so one instance can serve many requests
//! from several threads at once.

use crate::{
    analysis, classifier,
    compositor::{CompositeDecorator, CompositeRequest, Compositor},
    config::CompositeConfig,
    error::{CompositeError, Result},
    placement,
    removal::{self, BackgroundRemover},
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressTracker},
    shadow,
    types::{CompositeResult, PhotoMode, ProcessingTimings},
};
use chrono::Utc;
use image::{DynamicImage, RgbaImage};
use instant::Instant;
use log::{debug, info};
use std::sync::Arc;
use tracing::{info as trace_info, instrument, span, warn, Level};

/// Studio compositing processor
pub struct ShowroomProcessor {
    config: CompositeConfig,
    remover: Option<Box<dyn BackgroundRemover>>,
    background: Option<DynamicImage>,
    logo: Option<RgbaImage>,
    compositor: Compositor,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl ShowroomProcessor {
    /// Create a processor without a removal service
    ///
    /// Such a processor can only run [`ShowroomProcessor::compose_cutout`];
    /// attach a service with [`ShowroomProcessor::with_remover`].
    ///
    /// # Errors
    /// Returns `CompositeError::InvalidConfig` if the configuration does not
    /// validate.
    pub fn new(config: CompositeConfig) -> Result<Self> {
        config.validate()?;
        let compositor = Compositor::new(config.layout.export_dimensions(), config.jpeg_quality);
        Ok(Self {
            config,
            remover: None,
            background: None,
            logo: None,
            compositor,
            reporter: None,
        })
    }

    /// Create a processor that calls `remover` for every photo
    ///
    /// # Errors
    /// Returns `CompositeError::InvalidConfig` if the configuration does not
    /// validate.
    pub fn with_remover(
        config: CompositeConfig,
        remover: Box<dyn BackgroundRemover>,
    ) -> Result<Self> {
        let mut processor = Self::new(config)?;
        processor.remover = Some(remover);
        Ok(processor)
    }

    /// Use `template` as the background of exterior composites
    #[must_use]
    pub fn background_template(mut self, template: DynamicImage) -> Self {
        self.background = Some(template);
        self
    }

    /// Stamp `logo` onto every composite
    #[must_use]
    pub fn logo(mut self, logo: RgbaImage) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Add a drawing pass applied before export
    #[must_use]
    pub fn decorator(mut self, decorator: Box<dyn CompositeDecorator>) -> Self {
        self.compositor = self.compositor.with_decorator(decorator);
        self
    }

    /// Report stage transitions to `reporter`
    #[must_use]
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    #[must_use]
    pub fn has_remover(&self) -> bool {
        self.remover.is_some()
    }

    fn tracker(&self) -> Option<ProgressTracker> {
        self.reporter
            .clone()
            .map(|reporter| ProgressTracker::new(Box::new(reporter)))
    }

    /// Composite a decoded photo, calling the removal service
    ///
    /// # Errors
    /// - `CompositeError::Removal` when no service is configured, the service
    ///   fails or its response is malformed
    /// - `CompositeError::Processing` for an empty input image
    /// - `CompositeError::Image` if encoding fails
    pub fn process_image(&self, image: &DynamicImage) -> Result<CompositeResult> {
        self.process_decoded(image, 0, self.tracker())
    }

    /// Composite an encoded photo (JPEG, PNG, WebP, TIFF)
    ///
    /// # Errors
    /// Same as [`ShowroomProcessor::process_image`], plus
    /// `CompositeError::Processing` when the bytes cannot be decoded.
    pub fn process_bytes(&self, image_bytes: &[u8]) -> Result<CompositeResult> {
        let mut tracker = self.tracker();
        report(&mut tracker, ProcessingStage::ImageLoading);
        let decode_start = Instant::now();
        let image = ImageIOService::load_from_bytes(image_bytes).map_err(|e| {
            if let Some(tracker) = &tracker {
                tracker.report_error(&e.to_string());
            }
            e
        })?;
        self.process_decoded(&image, decode_start.elapsed().as_millis() as u64, tracker)
    }

    /// Composite a photo read from an async stream
    ///
    /// # Examples
    /// ```rust,no_run
    /// use showroom_compose::{CompositeConfig, ShowroomProcessor, Result};
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let remover = |photo: &[u8]| -> Result<Vec<u8>> { call_service(photo) };
    /// let processor = ShowroomProcessor::with_remover(CompositeConfig::default(), Box::new(remover))?;
    ///
    /// let file = File::open("car.jpg").await?;
    /// let result = processor.process_reader(file).await?;
    /// result.save("car_studio.jpg")?;
    /// # Ok(())
    /// # }
    /// # fn call_service(_: &[u8]) -> Result<Vec<u8>> { unimplemented!() }
    /// ```
    ///
    /// # Errors
    /// Same as [`ShowroomProcessor::process_bytes`], plus `CompositeError::Io`
    /// when the stream fails.
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &self,
        reader: R,
    ) -> Result<CompositeResult> {
        let bytes = ImageIOService::read_from_reader(reader).await?;
        self.process_bytes(&bytes)
    }

    #[instrument(
        skip(self, image, tracker),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            background = %self.config.background
        )
    )]
    fn process_decoded(
        &self,
        image: &DynamicImage,
        decode_ms: u64,
        mut tracker: Option<ProgressTracker>,
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings {
            image_decode_ms: decode_ms,
            ..ProcessingTimings::default()
        };

        let original = (image.width(), image.height());
        if original.0 == 0 || original.1 == 0 {
            return Err(CompositeError::processing("input image has zero size"));
        }
        let remover = self
            .remover
            .as_deref()
            .ok_or_else(|| CompositeError::removal("no background remover configured"))?;
        let reprocessed = self
            .config
            .reprocess
            .resolve(original, self.config.layout.export_dimensions());

        trace_info!(
            width = original.0,
            height = original.1,
            reprocessed,
            "🚗 Starting studio composite"
        );

        // Pre-pad so the service has room to render the ground shadow
        let pre_pad_start = Instant::now();
        let (padded, padding) = {
            let _span = span!(Level::DEBUG, "pre_pad").entered();
            report(&mut tracker, ProcessingStage::ShadowPrePadding);
            shadow::pre_pad(image, &self.config.shadow)
        };
        let encoded = removal::encode_for_removal(&padded)?;
        timings.conditioning_ms += pre_pad_start.elapsed().as_millis() as u64;

        let removal_start = Instant::now();
        let cutout = {
            let _span = span!(
                Level::INFO,
                "background_removal",
                request_bytes = encoded.len()
            )
            .entered();
            report(&mut tracker, ProcessingStage::BackgroundRemoval);
            let response = remover.remove_background(&encoded).map_err(|e| {
                let e = if e.is_removal_failure() {
                    e
                } else {
                    CompositeError::removal(e.to_string())
                };
                if let Some(tracker) = &tracker {
                    tracker.report_error(&e.to_string());
                }
                e
            })?;
            removal::decode_cutout(&response)?
        };
        timings.removal_ms = removal_start.elapsed().as_millis() as u64;

        let crop_start = Instant::now();
        let has_alpha = cutout.color().has_alpha();
        let cutout = cutout.to_rgba8();
        // Width the original photo occupies in the service's resolution
        let (inner_width, _) = shadow::inner_extent(cutout.dimensions(), original, padding);
        let cropped = shadow::post_crop(&cutout, original, padding, &self.config.shadow)?;
        timings.conditioning_ms += crop_start.elapsed().as_millis() as u64;

        self.finish(
            &cropped,
            has_alpha,
            original,
            inner_width,
            reprocessed,
            timings,
            total_start,
            tracker,
        )
    }

    /// Composite a cutout that is already in hand, skipping the removal call
    ///
    /// `original_dimensions` are those of the photo the cutout was made
    /// from; they drive reprocessing detection. The cutout is taken to span
    /// that photo exactly, so a recovered target is measured on its own width.
    ///
    /// # Errors
    /// - `CompositeError::Processing` for an empty cutout
    /// - `CompositeError::Image` if encoding fails
    #[instrument(
        skip(self, cutout),
        fields(dimensions = %format!("{}x{}", cutout.width(), cutout.height()))
    )]
    pub fn compose_cutout(
        &self,
        cutout: &DynamicImage,
        original_dimensions: (u32, u32),
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        if cutout.width() == 0 || cutout.height() == 0 {
            return Err(CompositeError::processing("cutout has zero size"));
        }
        let reprocessed = self
            .config
            .reprocess
            .resolve(original_dimensions, self.config.layout.export_dimensions());

        self.finish(
            &cutout.to_rgba8(),
            cutout.color().has_alpha(),
            original_dimensions,
            cutout.width(),
            reprocessed,
            ProcessingTimings::default(),
            total_start,
            self.tracker(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        cutout: &RgbaImage,
        has_alpha: bool,
        original: (u32, u32),
        reference_width: u32,
        reprocessed: bool,
        mut timings: ProcessingTimings,
        total_start: Instant,
        mut tracker: Option<ProgressTracker>,
    ) -> Result<CompositeResult> {
        let shadow_config = &self.config.shadow;
        let layout = &self.config.layout;

        let conditioning_start = Instant::now();
        let (adjusted, softened) = {
            let _span = span!(Level::DEBUG, "shadow_conditioning").entered();
            report(&mut tracker, ProcessingStage::ShadowConditioning);
            let adjusted = shadow::adjust_intensity(cutout, self.config.shadow_intensity);
            let softened = shadow::soften_edges(&adjusted, shadow_config);
            debug!(
                "Shadow conditioned: {} soft pixels before, {} after",
                shadow::soft_pixel_count(cutout),
                shadow::soft_pixel_count(&softened)
            );
            (adjusted, softened)
        };
        timings.conditioning_ms += conditioning_start.elapsed().as_millis() as u64;

        let analysis_start = Instant::now();
        let (measured, classification) = {
            let _span = span!(Level::DEBUG, "analysis").entered();
            report(&mut tracker, ProcessingStage::Analysis);
            let measured = analysis::analyze_rgba(&softened, has_alpha);
            report(&mut tracker, ProcessingStage::Classification);
            // The border feather lowers every edge pixel, so frame-filling
            // subjects are judged on the buffer before softening
            let unsoftened = analysis::analyze_rgba(&adjusted, has_alpha);
            (measured, classifier::classify(&unsoftened))
        };
        timings.analysis_ms = analysis_start.elapsed().as_millis() as u64;

        if classification.interior_hint {
            info!("Cabin detail detected behind the glass; keeping exterior treatment");
        }

        let target = if reprocessed {
            let recovered = placement::reprocess_target(&measured, reference_width, layout);
            debug!(
                "Reprocessing prior composite: target {:.3} recovered from solid width {}",
                recovered,
                measured.solid.width()
            );
            recovered
        } else {
            self.config.target_fraction()
        };

        let placement_start = Instant::now();
        let (subject, placed_analysis, plan) = {
            let _span = span!(Level::DEBUG, "placement", mode = %classification.mode).entered();
            report(&mut tracker, ProcessingStage::Placement);
            let (subject, analysis) = match classification.mode {
                PhotoMode::Exterior => {
                    let (trimmed, trimmed_analysis) = shadow::trim_to_subject(&softened, &measured);
                    let (padded, padding) = shadow::pad_for_placement(&trimmed, shadow_config);
                    (padded, trimmed_analysis.offset_by(&padding))
                },
                PhotoMode::Interior => (softened, measured),
            };
            let plan = placement::solve(
                classification.mode,
                &analysis,
                subject.dimensions(),
                target,
                reprocessed,
                layout,
            );
            (subject, analysis, plan)
        };
        timings.placement_ms = placement_start.elapsed().as_millis() as u64;

        let compositing_start = Instant::now();
        let canvas = {
            let _span = span!(
                Level::DEBUG,
                "compositing",
                canvas_width = plan.canvas_width,
                canvas_height = plan.canvas_height
            )
            .entered();
            report(&mut tracker, ProcessingStage::Compositing);
            self.compositor.render(&CompositeRequest {
                mode: classification.mode,
                plan: &plan,
                analysis: &placed_analysis,
                subject: &subject,
                background_id: self.config.background,
                background: self.background.as_ref(),
                logo: self.logo.as_ref(),
                logo_fraction: self.config.logo_fraction(),
            })
        };
        timings.compositing_ms = compositing_start.elapsed().as_millis() as u64;

        let encode_start = Instant::now();
        let jpeg = {
            let _span = span!(Level::DEBUG, "encoding").entered();
            report(&mut tracker, ProcessingStage::Encoding);
            self.compositor.export(&canvas).map_err(|e| {
                warn!("JPEG export failed: {}", e);
                e
            })?
        };
        timings.encode_ms = encode_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64 + timings.image_decode_ms;

        if let Some(tracker) = tracker.as_mut() {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(timings.clone());
        }

        let result = CompositeResult {
            jpeg,
            classification,
            plan,
            analysis: placed_analysis,
            target_fraction: target,
            reprocessed,
            original_dimensions: original,
            timings,
            processed_at: Utc::now(),
        };
        trace_info!(summary = %result.summary(), "✅ Studio composite ready");
        Ok(result)
    }
}

fn report(tracker: &mut Option<ProgressTracker>, stage: ProcessingStage) {
    if let Some(tracker) = tracker.as_mut() {
        tracker.report_stage(stage);
    }
}
