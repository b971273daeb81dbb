//! Configuration types for studio compositing

use crate::{
    error::{CompositeError, Result},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed export width of every composite
pub const EXPORT_WIDTH: u32 = 1920;
/// Fixed export height of every composite
pub const EXPORT_HEIGHT: u32 = 1080;

/// Canonical target car width, as a whole-number percentage of canvas width
pub const DEFAULT_TARGET_WIDTH_PERCENT: u8 = 82;
pub const MIN_TARGET_WIDTH_PERCENT: u8 = 60;
pub const MAX_TARGET_WIDTH_PERCENT: u8 = 95;

pub const DEFAULT_LOGO_WIDTH_FRACTION: f64 = 0.12;
pub const MIN_LOGO_WIDTH_FRACTION: f64 = 0.05;
pub const MAX_LOGO_WIDTH_FRACTION: f64 = 0.20;

pub const DEFAULT_SHADOW_INTENSITY: u8 = 100;
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Studio background template identifiers
///
/// Each identifier resolves to a bundled JPEG loaded by the caller. When the
/// asset is unavailable the compositor paints the generated fallback colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundId {
    StudioWhite,
    StudioGrey,
    StudioDark,
}

impl Default for BackgroundId {
    fn default() -> Self {
        Self::StudioWhite
    }
}

impl BackgroundId {
    /// All known template identifiers
    #[must_use]
    pub fn all() -> &'static [BackgroundId] {
        &[Self::StudioWhite, Self::StudioGrey, Self::StudioDark]
    }

    /// Stable string identifier used by the asset layer
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StudioWhite => "studio-white",
            Self::StudioGrey => "studio-grey",
            Self::StudioDark => "studio-dark",
        }
    }

    /// Wall and floor colors of the generated fallback showroom
    #[must_use]
    pub fn fallback_colors(self) -> ([u8; 3], [u8; 3]) {
        match self {
            Self::StudioWhite => ([242, 242, 240], [214, 214, 212]),
            Self::StudioGrey => ([168, 170, 172], [132, 134, 136]),
            Self::StudioDark => ([52, 54, 58], [34, 35, 38]),
        }
    }
}

impl std::fmt::Display for BackgroundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundId {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CompositeError::invalid_config(format!(
                    "Unknown background '{}'. Expected one of: studio-white, studio-grey, studio-dark",
                    s
                ))
            })
    }
}

/// How the pipeline decides whether an upload is itself a prior composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReprocessHint {
    /// Treat uploads that exactly match the export resolution as prior output
    #[default]
    Auto,
    /// Caller knows the answer; dimensions are ignored
    Force(bool),
}

impl ReprocessHint {
    /// Resolve the hint against the raw upload dimensions
    #[must_use]
    pub fn resolve(self, upload: (u32, u32), export: (u32, u32)) -> bool {
        match self {
            Self::Auto => upload == export,
            Self::Force(value) => value,
        }
    }
}

/// Geometric constants of the placement solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub export_width: u32,
    pub export_height: u32,
    /// Vertical position of the floor line as a fraction of canvas height
    pub floor_fraction: f64,
    /// Minimum gap between the solid box and either side edge
    pub side_margin_fraction: f64,
    /// Lower width bound is `target - min_width_spread`, floored at
    /// `min_width_floor`. At the default 0.82 target that is 0.70, not a
    /// fixed 0.72 minimum.
    pub min_width_spread: f64,
    pub max_width_spread: f64,
    pub min_width_floor: f64,
    pub max_width_ceiling: f64,
    /// Upper width bound when re-running on a prior composite
    pub reprocessed_max_width: f64,
    /// Share of the canvas an interior shot may occupy
    pub interior_fill_fraction: f64,
    pub interior_min_scale: f64,
    pub interior_max_scale: f64,
    pub reprocess_target_min: f64,
    pub reprocess_target_max: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            export_width: EXPORT_WIDTH,
            export_height: EXPORT_HEIGHT,
            floor_fraction: 0.84,
            side_margin_fraction: 0.05,
            min_width_spread: 0.12,
            max_width_spread: 0.08,
            min_width_floor: 0.50,
            max_width_ceiling: 0.95,
            reprocessed_max_width: 0.98,
            interior_fill_fraction: 0.90,
            interior_min_scale: 0.1,
            interior_max_scale: 2.0,
            reprocess_target_min: 0.60,
            reprocess_target_max: 0.95,
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn export_dimensions(&self) -> (u32, u32) {
        (self.export_width.max(1), self.export_height.max(1))
    }
}

/// Constants of the shadow conditioner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Gray fill added before the removal call, top/left/right
    pub pre_pad_side: f64,
    pub pre_pad_bottom: f64,
    pub pre_pad_color: [u8; 3],
    /// Share of each pre-pad edge kept after the removal call
    pub retain_side: f64,
    pub retain_bottom: f64,
    /// Transparent margins wrapped around the subject before placement
    pub placement_pad_side: f64,
    pub placement_pad_bottom: f64,
    /// Rows below a shadow edge that receive the ease-out fade
    pub fade_distance: u32,
    pub fade_strength: f64,
    pub blur_radius: u32,
    /// Distance from the image border over which alpha is feathered to zero
    pub feather_px: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            pre_pad_side: 0.02,
            pre_pad_bottom: 0.08,
            pre_pad_color: [128, 128, 128],
            retain_side: 0.10,
            retain_bottom: 0.50,
            placement_pad_side: 0.03,
            placement_pad_bottom: 0.10,
            fade_distance: 24,
            fade_strength: 0.7,
            blur_radius: 3,
            feather_px: 4,
        }
    }
}

/// Configuration for one compositing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Target car width as a whole-number percentage of canvas width (60-95)
    pub target_width_percent: u8,

    /// Logo width as a fraction of canvas width (0.05-0.20)
    pub logo_width_fraction: f64,

    /// Shadow intensity (0-100, 100 leaves the service shadow untouched)
    pub shadow_intensity: u8,

    /// Studio background for exterior shots
    pub background: BackgroundId,

    /// JPEG quality of the exported composite (0-100)
    pub jpeg_quality: u8,

    /// Reprocessing detection policy
    pub reprocess: ReprocessHint,

    pub layout: LayoutConfig,

    pub shadow: ShadowConfig,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            target_width_percent: DEFAULT_TARGET_WIDTH_PERCENT,
            logo_width_fraction: DEFAULT_LOGO_WIDTH_FRACTION,
            shadow_intensity: DEFAULT_SHADOW_INTENSITY,
            background: BackgroundId::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            reprocess: ReprocessHint::default(),
            layout: LayoutConfig::default(),
            shadow: ShadowConfig::default(),
        }
    }
}

impl CompositeConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> CompositeConfigBuilder {
        CompositeConfigBuilder::new()
    }

    /// Target car width as a fraction, clamped into the canonical range
    #[must_use]
    pub fn target_fraction(&self) -> f64 {
        f64::from(
            self.target_width_percent
                .clamp(MIN_TARGET_WIDTH_PERCENT, MAX_TARGET_WIDTH_PERCENT),
        ) / 100.0
    }

    /// Logo width fraction, clamped into the canonical range
    #[must_use]
    pub fn logo_fraction(&self) -> f64 {
        if self.logo_width_fraction.is_finite() {
            self.logo_width_fraction
                .clamp(MIN_LOGO_WIDTH_FRACTION, MAX_LOGO_WIDTH_FRACTION)
        } else {
            DEFAULT_LOGO_WIDTH_FRACTION
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// - Target width outside 60-95
    /// - Logo width fraction outside 0.05-0.20 or non-finite
    /// - Shadow intensity or JPEG quality above 100
    /// - Layout fractions outside (0, 1]
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_range(
            self.target_width_percent,
            MIN_TARGET_WIDTH_PERCENT,
            MAX_TARGET_WIDTH_PERCENT,
            "Target width percent",
        )?;
        NumericValidator::validate_fraction_range(
            self.logo_width_fraction,
            MIN_LOGO_WIDTH_FRACTION,
            MAX_LOGO_WIDTH_FRACTION,
            "Logo width fraction",
        )?;
        NumericValidator::validate_percent(self.shadow_intensity, "Shadow intensity")?;
        NumericValidator::validate_percent(self.jpeg_quality, "JPEG quality")?;

        NumericValidator::validate_fraction(self.layout.floor_fraction, "floor_fraction")?;
        NumericValidator::validate_fraction(
            self.layout.side_margin_fraction,
            "side_margin_fraction",
        )?;
        NumericValidator::validate_fraction(
            self.layout.interior_fill_fraction,
            "interior_fill_fraction",
        )?;
        Ok(())
    }
}

/// Builder for `CompositeConfig`
///
/// Setters clamp into the canonical ranges so out-of-range settings degrade
/// instead of failing.
pub struct CompositeConfigBuilder {
    config: CompositeConfig,
}

impl CompositeConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CompositeConfig::default(),
        }
    }

    #[must_use]
    pub fn target_width_percent(mut self, percent: u8) -> Self {
        self.config.target_width_percent =
            percent.clamp(MIN_TARGET_WIDTH_PERCENT, MAX_TARGET_WIDTH_PERCENT);
        self
    }

    #[must_use]
    pub fn logo_width_fraction(mut self, fraction: f64) -> Self {
        self.config.logo_width_fraction = if fraction.is_finite() {
            fraction.clamp(MIN_LOGO_WIDTH_FRACTION, MAX_LOGO_WIDTH_FRACTION)
        } else {
            DEFAULT_LOGO_WIDTH_FRACTION
        };
        self
    }

    #[must_use]
    pub fn shadow_intensity(mut self, intensity: u8) -> Self {
        self.config.shadow_intensity = intensity.min(100);
        self
    }

    #[must_use]
    pub fn background(mut self, background: BackgroundId) -> Self {
        self.config.background = background;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn reprocess(mut self, hint: ReprocessHint) -> Self {
        self.config.reprocess = hint;
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    #[must_use]
    pub fn shadow(mut self, shadow: ShadowConfig) -> Self {
        self.config.shadow = shadow;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `CompositeError::InvalidConfig` when a custom layout carries
    /// fractions outside (0, 1].
    pub fn build(self) -> Result<CompositeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CompositeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user settings record as stored by the settings layer
///
/// The car width is kept as a whole-number percentage; every field is
/// optional and falls back to the canonical default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub car_width_percent: Option<u8>,
    pub logo_width_fraction: Option<f64>,
    pub shadow_intensity: Option<u8>,
    pub background: Option<String>,
}

impl UserSettings {
    /// Parse settings from JSON
    ///
    /// # Errors
    /// Returns `CompositeError::InvalidConfig` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CompositeError::invalid_config(format!("Invalid settings JSON: {}", e)))
    }

    /// Convert into a compositing configuration, clamping every value
    #[must_use]
    pub fn into_config(self) -> CompositeConfig {
        let mut builder = CompositeConfigBuilder::new();
        if let Some(percent) = self.car_width_percent {
            builder = builder.target_width_percent(percent);
        }
        if let Some(fraction) = self.logo_width_fraction {
            builder = builder.logo_width_fraction(fraction);
        }
        if let Some(intensity) = self.shadow_intensity {
            builder = builder.shadow_intensity(intensity);
        }
        if let Some(name) = self.background.as_deref() {
            match name.parse::<BackgroundId>() {
                Ok(id) => builder = builder.background(id),
                Err(e) => tracing::warn!(background = name, "{}; using default", e),
            }
        }
        builder.config
    }
}
