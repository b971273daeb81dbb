//! Studio compositing CLI tool
//!
//! Composites vehicle photos onto a studio background. Each photo is paired
//! with a cutout: `--cutout` for a single input, otherwise a sibling
//! `<stem>.cutout.png` next to the photo. Photos without a cutout are
//! composited as-is, which gives interior treatment for opaque images.

use super::config::CliConfigBuilder;
use crate::{
    compositor::decode_logo,
    processor::ShowroomProcessor,
    services::{ConsoleProgressReporter, ImageIOService},
    tracing_config::init_cli_tracing,
    types::CompositeResult,
};
use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// Suffix marking a precomputed cutout next to its photo
pub const CUTOUT_SUFFIX: &str = ".cutout.png";
/// Suffix appended to the stem of every composite
pub const OUTPUT_SUFFIX: &str = "_studio.jpg";

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "tiff", "tif"];

/// Studio compositing CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "showroom-compose")]
pub struct Cli {
    /// Input photos or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Precomputed cutout (PNG with alpha) for a single input
    #[arg(long, value_name = "PNG")]
    pub cutout: Option<PathBuf>,

    /// Studio background (studio-white, studio-grey, studio-dark)
    #[arg(short, long)]
    pub background: Option<String>,

    /// Background template image; a generated showroom is used without one
    #[arg(long, value_name = "IMAGE")]
    pub background_image: Option<PathBuf>,

    /// Logo stamped in the top-right corner
    #[arg(long, value_name = "IMAGE")]
    pub logo: Option<PathBuf>,

    /// Target car width as a percentage of canvas width (60-95)
    #[arg(long, value_name = "PERCENT")]
    pub target_width: Option<u8>,

    /// Logo width as a fraction of canvas width (0.05-0.20)
    #[arg(long, value_name = "FRACTION")]
    pub logo_width: Option<f64>,

    /// Shadow intensity (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub shadow_intensity: Option<u8>,

    /// JPEG quality of the composite (0-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// JSON settings file (flags take precedence)
    #[arg(long, value_name = "JSON")]
    pub settings: Option<PathBuf>,

    /// Treat every input as a prior composite
    #[arg(long)]
    pub reprocessed: bool,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern for directory inputs (e.g. "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Number of photos composited concurrently
    #[arg(short, long, default_value_t = 4)]
    pub jobs: usize,

    /// Draw measured boxes and floor line onto the composite
    #[cfg(feature = "debug-overlay")]
    #[arg(long)]
    pub debug_overlay: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Outcome of a batch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let processor = Arc::new(build_processor(&cli)?);

    let span = info_span!("session", session_id = %session_id);
    let summary = process_inputs(&cli, processor).instrument(span).await?;

    if summary.failed > 0 {
        anyhow::bail!(
            "{} of {} file(s) failed",
            summary.failed,
            summary.failed + summary.processed
        );
    }
    Ok(())
}

/// Assemble the processor with template, logo and decorators from the CLI
fn build_processor(cli: &Cli) -> Result<ShowroomProcessor> {
    let config = CliConfigBuilder::from_cli(cli).context("Failed to build configuration")?;
    info!(
        "Background: {}, target width: {}%, shadow intensity: {}",
        config.background, config.target_width_percent, config.shadow_intensity
    );

    let mut processor = ShowroomProcessor::new(config)?
        .progress_reporter(Arc::new(ConsoleProgressReporter::new(cli.verbose > 0)));

    if let Some(path) = &cli.background_image {
        if let Some(template) = ImageIOService::load_asset(path) {
            processor = processor.background_template(template);
        }
    }
    if let Some(path) = &cli.logo {
        match ImageIOService::read_bytes(path) {
            Ok(bytes) => {
                if let Some(logo) = decode_logo(&bytes) {
                    processor = processor.logo(logo);
                }
            },
            Err(e) => warn!("Logo skipped: {}", e),
        }
    }
    #[cfg(feature = "debug-overlay")]
    if cli.debug_overlay {
        processor = processor.decorator(Box::new(crate::overlay::MeasurementOverlay::default()));
    }

    Ok(processor)
}

/// One unit of batch work
#[derive(Debug, Clone)]
struct Job {
    input: PathBuf,
    cutout: Option<PathBuf>,
    output: PathBuf,
}

async fn process_inputs(cli: &Cli, processor: Arc<ShowroomProcessor>) -> Result<BatchSummary> {
    let mut all_files = Vec::new();
    for input in &cli.input {
        let path = PathBuf::from(input);
        if path.is_file() {
            if is_image_file(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    if all_files.is_empty() {
        warn!("No supported photos found in the provided inputs");
        return Ok(BatchSummary::default());
    }
    all_files.sort();
    info!("Found {} photo(s) to composite", all_files.len());

    let output_dir = prepare_output_dir(cli.output.as_deref(), all_files.len())?;
    let jobs: Vec<Job> = all_files
        .into_iter()
        .map(|input| {
            let output = match (&output_dir, &cli.output) {
                (Some(dir), _) => output_path_in_dir(&input, dir),
                (None, Some(file)) => PathBuf::from(file),
                (None, None) => default_output_path(&input),
            };
            let cutout = cli.cutout.clone().or_else(|| sibling_cutout(&input));
            Job {
                input,
                cutout,
                output,
            }
        })
        .collect();

    let progress = (jobs.len() > 1).then(|| {
        let pb = ProgressBar::new(jobs.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    });

    let batch_start = Instant::now();
    let file_count = jobs.len();
    let mut summary = BatchSummary::default();

    let mut results = stream::iter(jobs)
        .map(|job| {
            let processor = Arc::clone(&processor);
            async move {
                let input = job.input.clone();
                let outcome = tokio::task::spawn_blocking(move || compose_job(&processor, &job))
                    .await
                    .map_err(|e| anyhow::anyhow!("worker panicked: {}", e))
                    .and_then(|r| r);
                (input, outcome)
            }
        })
        .buffer_unordered(cli.jobs.max(1));

    while let Some((input, outcome)) = results.next().await {
        match outcome {
            Ok(result) => {
                summary.processed += 1;
                debug!(file = %input.display(), "{}", result.summary());
            },
            Err(e) => {
                summary.failed += 1;
                error!("❌ Failed to composite {}: {:#}", input.display(), e);
            },
        }
        if let Some(pb) = &progress {
            pb.set_message(format!("{}", input.display()));
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            summary.processed, summary.failed
        ));
    }

    if file_count > 1 {
        let total = batch_start.elapsed().as_secs_f64();
        info!("📊 Batch summary:");
        info!("  ├─ Composited: {}", summary.processed);
        info!("  ├─ Failed: {}", summary.failed);
        info!("  ├─ Total time: {:.2}s", total);
        info!(
            "  └─ Average per photo: {:.2}s",
            if summary.processed > 0 {
                total / summary.processed as f64
            } else {
                0.0
            }
        );
    }

    Ok(summary)
}

/// Composite one photo and write the JPEG
fn compose_job(processor: &ShowroomProcessor, job: &Job) -> Result<CompositeResult> {
    let original = image::image_dimensions(&job.input)
        .with_context(|| format!("Failed to read dimensions of {}", job.input.display()))?;

    let cutout = match &job.cutout {
        Some(path) => ImageIOService::load_image(path)
            .with_context(|| format!("Failed to load cutout {}", path.display()))?,
        None => {
            warn!(
                "No cutout for {}; compositing the photo as-is",
                job.input.display()
            );
            ImageIOService::load_image(&job.input)
                .with_context(|| format!("Failed to load {}", job.input.display()))?
        },
    };

    let result = processor
        .compose_cutout(&cutout, original)
        .with_context(|| format!("Failed to composite {}", job.input.display()))?;
    ImageIOService::write_bytes(&job.output, &result.jpeg)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;

    info!(
        "✅ {} -> {} ({}, {}ms)",
        job.input.display(),
        job.output.display(),
        result.classification.mode,
        result.timings.total_ms
    );
    Ok(result)
}

/// Validate and create the batch output directory
fn prepare_output_dir(output: Option<&str>, file_count: usize) -> Result<Option<PathBuf>> {
    let Some(output) = output else {
        return Ok(None);
    };
    let output_path = PathBuf::from(output);
    if file_count == 1 && !output_path.is_dir() {
        return Ok(None);
    }
    if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    std::fs::create_dir_all(&output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    Ok(Some(output_path))
}

/// Find all photos in a directory, skipping cutouts and prior outputs
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut consider = |path: &Path| {
        if is_image_file(path)
            && !is_cutout_file(path)
            && !is_output_file(path)
            && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    };

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                consider(entry.path());
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                consider(&entry.path());
            }
        }
    }

    Ok(files)
}

/// Check if file is an image based on extension
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn file_name_lowercase(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_cutout_file(path: &Path) -> bool {
    file_name_lowercase(path).ends_with(CUTOUT_SUFFIX)
}

fn is_output_file(path: &Path) -> bool {
    file_name_lowercase(path).ends_with(OUTPUT_SUFFIX)
}

/// Check if file matches the given pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

/// `<dir>/<stem>.cutout.png`, if it exists
fn sibling_cutout(input: &Path) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy();
    let candidate = input.with_file_name(format!("{}{}", stem, CUTOUT_SUFFIX));
    candidate.is_file().then_some(candidate)
}

/// `<dir>/<stem>_studio.jpg` next to the input
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    input.with_file_name(format!("{}{}", stem.to_string_lossy(), OUTPUT_SUFFIX))
}

/// `<output_dir>/<stem>_studio.jpg`
fn output_path_in_dir(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    output_dir.join(format!("{}{}", stem.to_string_lossy(), OUTPUT_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositeConfig;
    use crate::types::PhotoMode;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::tempdir;

    fn write_photo(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([120, 120, 130]))
            .save(path)
            .unwrap();
    }

    fn write_cutout(path: &Path, width: u32, height: u32) {
        let cutout = RgbaImage::from_fn(width, height, |x, y| {
            if x > width / 4 && x < 3 * width / 4 && y > height / 3 && y < 3 * height / 4 {
                Rgba([30, 30, 30, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        cutout.save(path).unwrap();
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            default_output_path(Path::new("/photos/car.jpg")),
            PathBuf::from("/photos/car_studio.jpg")
        );
        assert_eq!(
            output_path_in_dir(Path::new("/photos/car.png"), Path::new("/out")),
            PathBuf::from("/out/car_studio.jpg")
        );
    }

    #[test]
    fn test_file_classification() {
        assert!(is_image_file(Path::new("car.JPG")));
        assert!(!is_image_file(Path::new("car.gif")));
        assert!(is_cutout_file(Path::new("car.cutout.png")));
        assert!(!is_cutout_file(Path::new("car.png")));
        assert!(is_output_file(Path::new("car_studio.jpg")));
        assert!(matches_pattern(Path::new("car.jpg"), Some("*.jpg")));
        assert!(!matches_pattern(Path::new("car.png"), Some("*.jpg")));
        assert!(matches_pattern(Path::new("car.png"), None));
    }

    #[test]
    fn test_find_image_files_skips_cutouts_and_outputs() {
        let dir = tempdir().unwrap();
        write_photo(&dir.path().join("a.jpg"), 8, 8);
        write_cutout(&dir.path().join("a.cutout.png"), 8, 8);
        write_photo(&dir.path().join("a_studio.jpg"), 8, 8);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_photo(&nested.join("b.jpg"), 8, 8);

        let flat = find_image_files(dir.path(), false, None).unwrap();
        assert_eq!(flat, vec![dir.path().join("a.jpg")]);

        let mut deep = find_image_files(dir.path(), true, Some("*.jpg")).unwrap();
        deep.sort();
        assert_eq!(deep, vec![dir.path().join("a.jpg"), nested.join("b.jpg")]);
    }

    #[test]
    fn test_sibling_cutout_lookup() {
        let dir = tempdir().unwrap();
        let photo = dir.path().join("car.jpg");
        write_photo(&photo, 8, 8);
        assert!(sibling_cutout(&photo).is_none());

        write_cutout(&dir.path().join("car.cutout.png"), 8, 8);
        assert_eq!(sibling_cutout(&photo), Some(dir.path().join("car.cutout.png")));
    }

    #[test]
    fn test_compose_job_writes_export_jpeg() {
        let dir = tempdir().unwrap();
        let photo = dir.path().join("car.jpg");
        let cutout = dir.path().join("car.cutout.png");
        write_photo(&photo, 400, 300);
        write_cutout(&cutout, 400, 300);

        let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
        let job = Job {
            input: photo.clone(),
            cutout: Some(cutout),
            output: dir.path().join("out").join("car_studio.jpg"),
        };
        let result = compose_job(&processor, &job).unwrap();
        assert_eq!(result.classification.mode, PhotoMode::Exterior);
        assert_eq!(result.original_dimensions, (400, 300));

        let written = image::open(&job.output).unwrap();
        assert_eq!((written.width(), written.height()), (1920, 1080));
    }

    #[test]
    fn test_compose_job_without_cutout_uses_photo() {
        let dir = tempdir().unwrap();
        let photo = dir.path().join("cabin.jpg");
        write_photo(&photo, 300, 200);

        let processor = ShowroomProcessor::new(CompositeConfig::default()).unwrap();
        let job = Job {
            input: photo,
            cutout: None,
            output: dir.path().join("cabin_studio.jpg"),
        };
        let result = compose_job(&processor, &job).unwrap();
        assert_eq!(result.classification.mode, PhotoMode::Interior);
    }

    #[test]
    fn test_prepare_output_dir() {
        let dir = tempdir().unwrap();
        assert!(prepare_output_dir(None, 3).unwrap().is_none());

        let target = dir.path().join("batch");
        let out = prepare_output_dir(Some(target.to_str().unwrap()), 3).unwrap();
        assert_eq!(out, Some(target.clone()));
        assert!(target.is_dir());

        let file = dir.path().join("single.jpg");
        assert!(prepare_output_dir(Some(file.to_str().unwrap()), 1)
            .unwrap()
            .is_none());

        fs::write(&file, "x").unwrap();
        assert!(prepare_output_dir(Some(file.to_str().unwrap()), 2).is_err());
    }
}
