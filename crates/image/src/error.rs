//! Error types for the image crate.

use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur during image operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Malformed pixel grid (ragged rows, wrong buffer length, mismatched planes)
    #[error("Invalid pixel grid: {0}")]
    InvalidGrid(String),

    /// The codec rejected the pixel data
    #[error("Encoding failed: {0}")]
    EncodingFailure(String),

    /// Pipeline options out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input decoding error
    #[error("Image decoding error: {0}")]
    DecodeError(#[from] image::ImageError),
}

impl ImageError {
    /// Whether the error comes from malformed input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ImageError::InvalidGrid(_) | ImageError::DecodeError(_))
    }
}
