//! Error types for the rastervec-core library

use thiserror::Error;

/// Main error type for vectorization operations
#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Insufficient image data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Unknown preset: {name}")]
    UnknownPreset { name: String },

    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    #[error("Algorithm error: {message}")]
    AlgorithmError { message: String },

    #[error("SVG generation error: {message}")]
    SvgError { message: String },

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },
}

impl VectorizeError {
    /// Create a new invalid-dimensions error
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Create a new insufficient-data error
    pub fn insufficient_data(expected: usize, actual: usize) -> Self {
        Self::InsufficientData { expected, actual }
    }

    /// Create a new unknown-preset error
    pub fn unknown_preset(name: impl Into<String>) -> Self {
        Self::UnknownPreset { name: name.into() }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new algorithm error
    pub fn algorithm_error(message: impl Into<String>) -> Self {
        Self::AlgorithmError {
            message: message.into(),
        }
    }

    /// Create a new SVG generation error
    pub fn svg_error(message: impl Into<String>) -> Self {
        Self::SvgError {
            message: message.into(),
        }
    }

    /// Create a new unsupported-format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }
}

/// Result type alias for convenience
pub type VectorizeResult<T> = Result<T, VectorizeError>;
