//! Error types for studio compositing operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error types surfaced by the compositing pipeline
///
/// Only the background-removal boundary is a hard failure inside the pipeline.
/// Everything else (analysis decode failures, missing logo or template assets)
/// degrades to a fallback and never reaches the caller as an error.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external background-removal service failed or returned garbage
    #[error("Background removal failed: {0}")]
    Removal(String),

    /// A pipeline stage could not produce its output
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompositeError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new background-removal error
    pub fn removal<S: Into<String>>(msg: S) -> Self {
        Self::Removal(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a file I/O error carrying the operation and path
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// Create a processing error tagged with the stage that produced it
    pub fn stage_error(stage: &str, details: &str) -> Self {
        Self::Processing(format!("{} failed: {}", stage, details))
    }

    /// Whether this error originated at the background-removal boundary
    #[must_use]
    pub fn is_removal_failure(&self) -> bool {
        matches!(self, Self::Removal(_))
    }
}
