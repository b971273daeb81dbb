//! Numeric validation utilities
//!
//! Range checks shared by configuration validation and the CLI.

use crate::error::{CompositeError, Result};

/// Upper bound on concurrent batch jobs
pub const MAX_JOBS: usize = 64;

/// Validator for numeric settings
pub struct NumericValidator;

impl NumericValidator {
    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(CompositeError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate a finite fraction in (0, 1]
    pub fn validate_fraction(value: f64, name: &str) -> Result<f64> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(CompositeError::invalid_config(format!(
                "{} must be in (0, 1], got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate a finite fraction within an inclusive range
    pub fn validate_fraction_range(value: f64, min: f64, max: f64, name: &str) -> Result<f64> {
        if !value.is_finite() {
            return Err(CompositeError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Self::validate_range(value, min, max, name)
    }

    /// Validate a 0-100 setting (quality, intensity)
    pub fn validate_percent(value: u8, name: &str) -> Result<u8> {
        Self::validate_range(value, 0, 100, name)
    }

    /// Validate batch concurrency
    pub fn validate_job_count(value: usize) -> Result<usize> {
        Self::validate_range(value, 1, MAX_JOBS, "Job count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range() {
        assert_eq!(NumericValidator::validate_range(82u8, 60, 95, "Target").unwrap(), 82);
        let err = NumericValidator::validate_range(59u8, 60, 95, "Target").unwrap_err();
        assert!(err.to_string().contains("Target must be between 60 and 95, got 59"));
    }

    #[test]
    fn test_validate_fraction() {
        assert!(NumericValidator::validate_fraction(0.84, "floor").is_ok());
        assert!(NumericValidator::validate_fraction(1.0, "floor").is_ok());
        assert!(NumericValidator::validate_fraction(0.0, "floor").is_err());
        assert!(NumericValidator::validate_fraction(1.01, "floor").is_err());
        assert!(NumericValidator::validate_fraction(f64::NAN, "floor").is_err());
    }

    #[test]
    fn test_validate_fraction_range() {
        assert!(NumericValidator::validate_fraction_range(0.12, 0.05, 0.20, "Logo").is_ok());
        assert!(NumericValidator::validate_fraction_range(0.30, 0.05, 0.20, "Logo").is_err());
        assert!(NumericValidator::validate_fraction_range(f64::INFINITY, 0.05, 0.20, "Logo").is_err());
    }

    #[test]
    fn test_validate_percent_and_jobs() {
        assert!(NumericValidator::validate_percent(100, "Quality").is_ok());
        assert!(NumericValidator::validate_percent(101, "Quality").is_err());
        assert!(NumericValidator::validate_job_count(0).is_err());
        assert!(NumericValidator::validate_job_count(8).is_ok());
        assert!(NumericValidator::validate_job_count(MAX_JOBS + 1).is_err());
    }
}
