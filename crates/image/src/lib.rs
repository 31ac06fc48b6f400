//! Product cutout post-processing for packshot.
//!
//! This crate provides:
//! - Alpha matte cleanup (halo threshold, erosion, binarization)
//! - Tight cropping to the non-transparent region
//! - Portrait-to-landscape orientation normalization
//! - Lossy WebP encoding with a byte-budget quality search
//! - A batch driver with per-file fault isolation
//!
//! # Example
//!
//! ```rust,no_run
//! use packshot_image::{Pipeline, PipelineConfig};
//!
//! let grid = image::open("bottle.png")?.into_rgba8();
//! let pipeline = Pipeline::new(&PipelineConfig::default())?;
//! let output = pipeline.run(grid, Some(200_000))?;
//! std::fs::write("bottle.webp", &output.encoded.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod alpha;
pub mod batch;
mod config;
pub mod crop;
mod detect;
pub mod encode;
mod error;
pub mod grid;
pub mod orientation;
mod pipeline;

pub use alpha::{clean, AlphaCleaner, AlphaOptions};
pub use batch::{
    decode_input, list_images, open_input, output_path_for, BackgroundRemover, BatchDriver, BatchReport, ExistingAlpha,
    ItemOutcome,
};
pub use config::PipelineConfig;
pub use crop::{bounding_box, crop, BoundingBox};
pub use detect::{detect_format, is_webp, InputFormat};
pub use encode::{
    encode, encode_webp, quality_schedule, EncodeOptions, EncodeOutcome, EncodingAttempt,
    SizeConstrainedEncoder,
};
pub use error::{ImageError, Result};
pub use grid::{AlphaChannel, PixelGrid};
pub use orientation::{needs_rotation, normalize, OrientationOptions};
pub use pipeline::{Pipeline, PipelineOutput, Transformed};
