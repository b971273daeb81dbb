//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    config::{
        BackgroundId, CompositeConfig, ReprocessHint, UserSettings, MAX_LOGO_WIDTH_FRACTION,
        MAX_TARGET_WIDTH_PERCENT, MIN_LOGO_WIDTH_FRACTION, MIN_TARGET_WIDTH_PERCENT,
    },
    utils::NumericValidator,
};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `CompositeConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: settings file first, flags on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositeConfig> {
        let mut config = match &cli.settings {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings file {}", path.display()))?;
                UserSettings::from_json(&json)
                    .with_context(|| format!("Invalid settings file {}", path.display()))?
                    .into_config()
            },
            None => CompositeConfig::default(),
        };

        if let Some(percent) = cli.target_width {
            config.target_width_percent = percent;
        }
        if let Some(fraction) = cli.logo_width {
            config.logo_width_fraction = fraction;
        }
        if let Some(intensity) = cli.shadow_intensity {
            config.shadow_intensity = intensity;
        }
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }
        if let Some(name) = &cli.background {
            config.background = name
                .parse::<BackgroundId>()
                .context("Invalid --background")?;
        }
        if cli.reprocessed {
            config.reprocess = ReprocessHint::Force(true);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(percent) = cli.target_width {
            NumericValidator::validate_range(
                percent,
                MIN_TARGET_WIDTH_PERCENT,
                MAX_TARGET_WIDTH_PERCENT,
                "--target-width",
            )?;
        }
        if let Some(fraction) = cli.logo_width {
            NumericValidator::validate_fraction_range(
                fraction,
                MIN_LOGO_WIDTH_FRACTION,
                MAX_LOGO_WIDTH_FRACTION,
                "--logo-width",
            )?;
        }
        if let Some(intensity) = cli.shadow_intensity {
            NumericValidator::validate_percent(intensity, "--shadow-intensity")?;
        }
        if let Some(quality) = cli.jpeg_quality {
            NumericValidator::validate_percent(quality, "--jpeg-quality")?;
        }
        NumericValidator::validate_job_count(cli.jobs).context("Invalid --jobs")?;

        if cli.cutout.is_some() && cli.input.len() != 1 {
            anyhow::bail!("--cutout can only be used with a single input file");
        }
        Ok(())
    }
}
