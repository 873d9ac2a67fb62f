//! Error types for the render crate.

use thiserror::Error;

/// Errors that can occur while finishing or scaling images.
#[derive(Error, Debug)]
pub enum FinishError {
    /// The image has a zero width or height.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A bleed margin was negative or not a finite number.
    #[error("invalid bleed margin: {0}")]
    InvalidMargin(f64),

    /// A corner radius was negative or not a finite number.
    #[error("invalid corner radius: {0}")]
    InvalidRadius(f64),

    /// A resolution (DPI) was zero, negative, or not a finite number.
    #[error("invalid resolution: {0} dpi")]
    InvalidResolution(f64),

    /// Failed to load or decode an image.
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    /// Failed to save or encode an image.
    #[error("failed to save image: {0}")]
    ImageSave(String),
}

impl FinishError {
    /// Shorthand for an [`InvalidDimensions`](Self::InvalidDimensions) error.
    pub(crate) fn dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }
}

/// Result type for finishing operations.
pub type FinishResult<T> = Result<T, FinishError>;
