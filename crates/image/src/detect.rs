//! Input format detection from magic bytes and file extensions.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input formats the batch driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// WebP image
    WebP,
    /// TIFF image
    Tiff,
}

impl InputFormat {
    /// All accepted formats.
    pub const ALL: [InputFormat; 4] = [
        InputFormat::Jpeg,
        InputFormat::Png,
        InputFormat::WebP,
        InputFormat::Tiff,
    ];

    /// Common file extensions for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            InputFormat::Jpeg => &["jpg", "jpeg"],
            InputFormat::Png => &["png"],
            InputFormat::WebP => &["webp"],
            InputFormat::Tiff => &["tif", "tiff"],
        }
    }

    /// Match a path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|fmt| fmt.extensions().contains(&ext.as_str()))
    }

    /// The matching `image` crate decoder format.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            InputFormat::Jpeg => image::ImageFormat::Jpeg,
            InputFormat::Png => image::ImageFormat::Png,
            InputFormat::WebP => image::ImageFormat::WebP,
            InputFormat::Tiff => image::ImageFormat::Tiff,
        }
    }
}

/// Detect an accepted input format from magic bytes.
///
/// # Example
/// ```
/// use packshot_image::{detect_format, InputFormat};
///
/// let png_data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(detect_format(&png_data), Some(InputFormat::Png));
/// ```
pub fn detect_format(data: &[u8]) -> Option<InputFormat> {
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(InputFormat::Jpeg);
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(InputFormat::Png);
    }

    if is_webp(data) {
        return Some(InputFormat::WebP);
    }

    // TIFF: II or MM (little/big endian)
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return Some(InputFormat::Tiff);
    }

    None
}

/// RIFF....WEBP container check.
pub fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP"
}
