//! The clean → crop → normalize → encode chain.

use crate::alpha::AlphaCleaner;
use crate::config::PipelineConfig;
use crate::crop::{bounding_box, crop, BoundingBox};
use crate::encode::{EncodeOutcome, SizeConstrainedEncoder};
use crate::error::Result;
use crate::grid::{is_fully_transparent, PixelGrid};
use crate::orientation::normalize;
use std::path::Path;
use tracing::debug;

/// Output of the pixel stages, before encoding.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Cleaned, cropped and oriented grid
    pub grid: PixelGrid,
    /// Box the crop used, `None` when the cleaned matte was empty
    pub bbox: Option<BoundingBox>,
    /// Whether the grid was rotated to landscape
    pub rotated: bool,
}

/// Encoded pipeline output.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Encoding result
    pub encoded: EncodeOutcome,
    /// Final width and height
    pub dimensions: (u32, u32),
    /// Whether the grid was rotated to landscape
    pub rotated: bool,
}

/// A configured pipeline. Cheap to share across threads.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    cleaner: AlphaCleaner,
    clockwise: bool,
    encoder: SizeConstrainedEncoder,
}

impl Pipeline {
    /// Build a pipeline, validating the config.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            cleaner: AlphaCleaner::new(config.alpha),
            clockwise: config.orientation.rotate_clockwise,
            encoder: SizeConstrainedEncoder::new(config.encode)?,
        })
    }

    /// The encoder stage.
    pub fn encoder(&self) -> &SizeConstrainedEncoder {
        &self.encoder
    }

    /// Run the pixel stages only.
    pub fn transform(&self, grid: PixelGrid) -> Result<Transformed> {
        let cleaned = self.cleaner.clean(grid)?;
        if is_fully_transparent(&cleaned) {
            debug!("Matte is empty after cleaning, nothing to crop");
        }
        let bbox = bounding_box(&cleaned);
        let cropped = crop(cleaned);
        let (grid, rotated) = normalize(cropped, self.clockwise);

        debug!(
            width = grid.width(),
            height = grid.height(),
            ?bbox,
            rotated,
            "Transformed grid"
        );

        Ok(Transformed { grid, bbox, rotated })
    }

    /// Transform and encode in memory.
    pub fn run(&self, grid: PixelGrid, budget: Option<u64>) -> Result<PipelineOutput> {
        let t = self.transform(grid)?;
        let encoded = self.encoder.encode(&t.grid, budget)?;
        Ok(PipelineOutput {
            encoded,
            dimensions: t.grid.dimensions(),
            rotated: t.rotated,
        })
    }

    /// Transform and encode straight to `out_path` through a scratch file.
    pub fn run_to_path(
        &self,
        grid: PixelGrid,
        out_path: &Path,
        budget: Option<u64>,
    ) -> Result<PipelineOutput> {
        let t = self.transform(grid)?;
        let encoded = self.encoder.encode_to_path(&t.grid, out_path, budget)?;
        Ok(PipelineOutput {
            encoded,
            dimensions: t.grid.dimensions(),
            rotated: t.rotated,
        })
    }
}
