//! Alpha matte cleanup: halo threshold, erosion and binarization.
//!
//! Matting models leave faint halos and soft partial alpha around the
//! subject. Lossy WebP then smears those partial values into a dirty fringe,
//! so the cleaner collapses the matte to a hard 0/255 mask.

use crate::error::Result;
use crate::grid::{alpha_channel, replace_alpha, AlphaChannel, PixelGrid};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Options for alpha cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaOptions {
    /// Alpha below this is forced to 0 before erosion
    pub low_threshold: u8,
    /// Alpha strictly above this becomes 255, everything else 0
    pub cutoff: u8,
    /// Number of 3x3 erosion passes
    pub erosion_radius: u32,
}

impl Default for AlphaOptions {
    fn default() -> Self {
        Self {
            low_threshold: 10,
            cutoff: 128,
            erosion_radius: 1,
        }
    }
}

/// Cleans the alpha matte of a [`PixelGrid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaCleaner {
    options: AlphaOptions,
}

impl AlphaCleaner {
    /// Create a cleaner with the given options.
    pub fn new(options: AlphaOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &AlphaOptions {
        &self.options
    }

    /// Clean `grid`, returning a grid whose alpha is only ever 0 or 255.
    pub fn clean(&self, grid: PixelGrid) -> Result<PixelGrid> {
        let AlphaOptions {
            low_threshold,
            cutoff,
            erosion_radius,
        } = self.options;

        let mut alpha = alpha_channel(&grid);
        threshold(&mut alpha, low_threshold);
        for _ in 0..erosion_radius {
            alpha = erode(&alpha);
        }
        binarize(&mut alpha, cutoff);

        replace_alpha(grid, &alpha)
    }
}

/// Threshold, erode and binarize the alpha of `grid`.
///
/// Colour channels and dimensions are preserved.
pub fn clean(
    grid: PixelGrid,
    low_threshold: u8,
    cutoff: u8,
    erosion_radius: u32,
) -> Result<PixelGrid> {
    AlphaCleaner::new(AlphaOptions {
        low_threshold,
        cutoff,
        erosion_radius,
    })
    .clean(grid)
}

/// Force every value strictly below `low` to 0.
pub fn threshold(alpha: &mut AlphaChannel, low: u8) {
    for a in alpha.pixels_mut() {
        if a[0] < low {
            a[0] = 0;
        }
    }
}

/// One pass of a 3x3 minimum filter.
///
/// Out-of-bounds neighbours repeat the nearest edge pixel, so the grid border
/// only erodes from real transparent pixels, never from off-grid zeros.
pub fn erode(alpha: &AlphaChannel) -> AlphaChannel {
    let (width, height) = alpha.dimensions();
    if width == 0 || height == 0 {
        return alpha.clone();
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut min = u8::MAX;
        // Clamping the window to the grid is the same as edge padding for a min.
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                min = min.min(alpha.get_pixel(nx, ny)[0]);
            }
        }
        Luma([min])
    })
}

/// Map values above `cutoff` to 255 and the rest to 0.
pub fn binarize(alpha: &mut AlphaChannel, cutoff: u8) {
    for a in alpha.pixels_mut() {
        a[0] = if a[0] > cutoff { u8::MAX } else { 0 };
    }
}
