//! Watermark error types.
//!
//! Defines errors that can occur while generating or applying a watermark.
//! None of these ever reach the code that attached a watermark: the
//! controller turns them into log events and leaves the element untouched.

use thiserror::Error;

/// Errors that can occur during watermark processing.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// A raster surface could not be created or resized.
    #[error("Raster surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The host cannot observe element geometry.
    #[error("Geometry observation is not supported by the host")]
    MissingCapability,

    /// Invalid configuration.
    #[error("Watermark configuration error: {0}")]
    ConfigError(String),

    /// A font could not be loaded.
    #[error("Failed to load font: {0}")]
    FontError(String),

    /// A paint color could not be parsed.
    #[error("Invalid color '{0}'")]
    ColorError(String),

    /// The rendered surface could not be exported.
    #[error("Failed to encode watermark image: {0}")]
    EncodeError(String),

    /// The free-mode scan grid cannot be walked with the given steps.
    #[error("Invalid scan step: {0}")]
    ScanError(String),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
