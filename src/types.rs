//! Core types shared by the pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of qualifying alpha pixels, inclusive on all edges
///
/// An invalid box collected no qualifying pixels and spans the full image
/// extent instead of being empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub valid: bool,
}

impl Bounds {
    /// Invalid box covering a whole `width` x `height` image
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            max_x: width.saturating_sub(1),
            min_y: 0,
            max_y: height.saturating_sub(1),
            valid: false,
        }
    }

    /// Horizontal extent in pixels (never below 1)
    #[must_use]
    pub fn width(&self) -> u32 {
        (self.max_x.saturating_sub(self.min_x) + 1).max(1)
    }

    /// Vertical extent in pixels (never below 1)
    #[must_use]
    pub fn height(&self) -> u32 {
        (self.max_y.saturating_sub(self.min_y) + 1).max(1)
    }

    /// Exclusive bottom edge, the row just below the lowest pixel
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.max_y + 1
    }

    /// Exclusive right edge
    #[must_use]
    pub fn right(&self) -> u32 {
        self.max_x + 1
    }

    #[must_use]
    pub fn center_x(&self) -> f64 {
        f64::from(self.min_x) + f64::from(self.width()) / 2.0
    }

    #[must_use]
    pub fn center_y(&self) -> f64 {
        f64::from(self.min_y) + f64::from(self.height()) / 2.0
    }

    /// Whether `other` lies entirely within this box
    #[must_use]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Translate into a buffer padded by `padding`
    #[must_use]
    pub fn offset_by(&self, padding: &Padding) -> Self {
        Self {
            min_x: self.min_x + padding.left,
            max_x: self.max_x + padding.left,
            min_y: self.min_y + padding.top,
            max_y: self.max_y + padding.top,
            valid: self.valid,
        }
    }

    /// Translate into a buffer cropped at `(x, y)`
    #[must_use]
    pub fn rebase(&self, x: u32, y: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(x),
            max_x: self.max_x.saturating_sub(x),
            min_y: self.min_y.saturating_sub(y),
            max_y: self.max_y.saturating_sub(y),
            valid: self.valid,
        }
    }
}

/// Pixel insets added around (or retained from) a buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    #[must_use]
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    #[must_use]
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }
}

/// Alpha statistics of one cutout
///
/// Created once by the analyzer; translated copies are produced with
/// [`SubjectAnalysis::offset_by`] and [`SubjectAnalysis::rebase`] while the
/// coverage ratios keep describing the buffer that was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectAnalysis {
    pub soft: Bounds,
    pub solid: Bounds,
    pub soft_coverage: f64,
    pub solid_coverage: f64,
    pub soft_width_pct: f64,
    pub soft_height_pct: f64,
    pub opaque_ratio: f64,
    pub bottom_touch_ratio: f64,
    pub has_alpha: bool,
    /// Dimensions of the buffer the statistics were measured on
    pub image_width: u32,
    pub image_height: u32,
}

impl SubjectAnalysis {
    /// Conservative analysis used when a cutout cannot be read
    #[must_use]
    pub fn fallback(width: u32, height: u32) -> Self {
        Self {
            soft: Bounds::full_frame(width, height),
            solid: Bounds::full_frame(width, height),
            soft_coverage: 1.0,
            solid_coverage: 1.0,
            soft_width_pct: 1.0,
            soft_height_pct: 1.0,
            opaque_ratio: 1.0,
            bottom_touch_ratio: 1.0,
            has_alpha: false,
            image_width: width,
            image_height: height,
        }
    }

    /// Bounds translated into a padded buffer's coordinates
    #[must_use]
    pub fn offset_by(&self, padding: &Padding) -> Self {
        Self {
            soft: self.soft.offset_by(padding),
            solid: self.solid.offset_by(padding),
            ..*self
        }
    }

    /// Bounds translated into a buffer cropped at `(x, y)`
    #[must_use]
    pub fn rebase(&self, x: u32, y: u32) -> Self {
        Self {
            soft: self.soft.rebase(x, y),
            solid: self.solid.rebase(x, y),
            ..*self
        }
    }
}

/// Treatment applied to a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoMode {
    /// Vehicle placed in a showroom with floor and wall
    Exterior,
    /// Cabin shot centered on a plain dark fill
    Interior,
}

impl std::fmt::Display for PhotoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exterior => write!(f, "exterior"),
            Self::Interior => write!(f, "interior"),
        }
    }
}

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub mode: PhotoMode,
    /// Cabin detail visible through the glass; advisory only
    pub interior_hint: bool,
}

/// Where the scaled subject lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositePlan {
    pub canvas_width: u32,
    /// Always `round(canvas_width * 9 / 16)`
    pub canvas_height: u32,
    pub scale: f64,
    pub left: u32,
    pub top: u32,
    /// Size of the padded subject buffer after scaling
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Floor line in canvas pixels (exterior only)
    pub floor_y: Option<u32>,
}

/// Per-stage timings in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub image_decode_ms: u64,
    pub removal_ms: u64,
    pub conditioning_ms: u64,
    pub analysis_ms: u64,
    pub placement_ms: u64,
    pub compositing_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Share of total time spent in each stage, in percent
    #[must_use]
    pub fn breakdown_percentages(&self) -> Vec<(&'static str, f64)> {
        let total = self.total_ms.max(1) as f64;
        vec![
            ("decode", self.image_decode_ms as f64 / total * 100.0),
            ("removal", self.removal_ms as f64 / total * 100.0),
            ("conditioning", self.conditioning_ms as f64 / total * 100.0),
            ("analysis", self.analysis_ms as f64 / total * 100.0),
            ("placement", self.placement_ms as f64 / total * 100.0),
            ("compositing", self.compositing_ms as f64 / total * 100.0),
            ("encode", self.encode_ms as f64 / total * 100.0),
        ]
    }
}

/// Everything a caller needs after one pipeline run
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Encoded JPEG at the export resolution
    pub jpeg: Vec<u8>,
    pub classification: Classification,
    pub plan: CompositePlan,
    /// Analysis in padded-buffer coordinates, as fed to the solver
    pub analysis: SubjectAnalysis,
    /// Target fraction the solver actually used
    pub target_fraction: f64,
    pub reprocessed: bool,
    pub original_dimensions: (u32, u32),
    pub timings: ProcessingTimings,
    pub processed_at: DateTime<Utc>,
}

impl CompositeResult {
    /// Write the encoded composite to disk
    ///
    /// # Errors
    /// Returns `CompositeError::Io` when the file cannot be written.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> crate::error::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.jpeg)
            .map_err(|e| crate::error::CompositeError::file_io_error("write composite", path, &e))
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {}x{} -> canvas {}x{} scale {:.3} at ({}, {}){} in {}ms",
            self.classification.mode,
            self.original_dimensions.0,
            self.original_dimensions.1,
            self.plan.canvas_width,
            self.plan.canvas_height,
            self.plan.scale,
            self.plan.left,
            self.plan.top,
            if self.reprocessed { " [reprocessed]" } else { "" },
            self.timings.total_ms
        )
    }
}
