#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Showroom Compose
//!
//! Studio compositing for vehicle photos. A photo goes to an external
//! background-removal service; the returned cutout is conditioned, measured,
//! classified and placed onto a 16:9 studio background, then exported as a
//! 1920×1080 JPEG.
//!
//! ## Pipeline
//!
//! 1. **Pre-pad** the photo with neutral gray so the service can render a
//!    ground shadow beyond the original frame.
//! 2. **Remove the background** through a [`BackgroundRemover`].
//! 3. **Post-crop** the cutout back toward the original extent.
//! 4. **Condition the shadow**: intensity scaling, edge fade, band blur and
//!    border feathering.
//! 5. **Analyze** soft and solid alpha bounds and **classify** the photo as
//!    exterior or interior.
//! 6. **Solve placement**: exterior cars stand on a floor line at 84% of the
//!    canvas height; interiors are centered on a dark fill.
//! 7. **Composite** background, subject and optional logo, then **export**.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use showroom_compose::{CompositeConfig, Result, ShowroomProcessor};
//!
//! # fn call_service(_: &[u8]) -> Result<Vec<u8>> { unimplemented!() }
//! # fn example() -> anyhow::Result<()> {
//! let config = CompositeConfig::builder()
//!     .target_width_percent(80)
//!     .shadow_intensity(70)
//!     .build()?;
//!
//! let processor = ShowroomProcessor::with_remover(config, Box::new(call_service))?;
//! let photo = image::open("car.jpg")?;
//! let result = processor.process_image(&photo)?;
//! println!("{}", result.summary());
//! result.save("car_studio.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP input support
//! - `tracing-json`: JSON structured log output for the CLI
//! - `debug-overlay`: measurement overlay decorator (development only)
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! showroom-compose = { version = "0.1", default-features = false }
//! ```

pub mod analysis;
pub mod classifier;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
#[cfg(feature = "debug-overlay")]
pub mod overlay;
pub mod placement;
pub mod processor;
pub mod removal;
pub mod services;
pub mod shadow;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use analysis::{analyze, analyze_bytes, analyze_rgba};
pub use classifier::classify;
pub use compositor::{
    decode_logo, CompositeDecorator, CompositeRequest, Compositor, DecorationContext,
};
pub use config::{
    BackgroundId, CompositeConfig, CompositeConfigBuilder, LayoutConfig, ReprocessHint,
    ShadowConfig, UserSettings,
};
pub use error::{CompositeError, Result};
#[cfg(feature = "debug-overlay")]
pub use overlay::MeasurementOverlay;
pub use processor::ShowroomProcessor;
pub use removal::BackgroundRemover;
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    Bounds, Classification, CompositePlan, CompositeResult, Padding, PhotoMode,
    ProcessingTimings, SubjectAnalysis,
};
pub use utils::NumericValidator;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Composite an already-cut-out vehicle given as encoded bytes
///
/// No removal call is made. `original_dimensions` are those of the photo the
/// cutout was produced from.
///
/// # Examples
///
/// ```rust,no_run
/// use showroom_compose::{composite_cutout_bytes, CompositeConfig};
///
/// # fn example(cutout_png: Vec<u8>) -> anyhow::Result<()> {
/// let result = composite_cutout_bytes(&cutout_png, (4032, 3024), &CompositeConfig::default())?;
/// std::fs::write("car_studio.jpg", &result.jpeg)?;
/// # Ok(())
/// # }
/// ```
pub fn composite_cutout_bytes(
    cutout_bytes: &[u8],
    original_dimensions: (u32, u32),
    config: &CompositeConfig,
) -> Result<CompositeResult> {
    let cutout = ImageIOService::load_from_bytes(cutout_bytes)?;
    ShowroomProcessor::new(config.clone())?.compose_cutout(&cutout, original_dimensions)
}

/// Composite a photo read from an async stream through `remover`
///
/// # Examples
///
/// ```rust,no_run
/// use showroom_compose::{composite_from_reader, CompositeConfig, Result};
/// use tokio::fs::File;
///
/// # fn call_service(_: &[u8]) -> Result<Vec<u8>> { unimplemented!() }
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("car.jpg").await?;
/// let result = composite_from_reader(file, &CompositeConfig::default(), call_service).await?;
/// result.save("car_studio.jpg")?;
/// # Ok(())
/// # }
/// ```
pub async fn composite_from_reader<R, B>(
    reader: R,
    config: &CompositeConfig,
    remover: B,
) -> Result<CompositeResult>
where
    R: AsyncRead + Unpin,
    B: BackgroundRemover + 'static,
{
    let processor = ShowroomProcessor::with_remover(config.clone(), Box::new(remover))?;
    processor.process_reader(reader).await
}
