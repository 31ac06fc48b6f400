//! Portrait-to-landscape normalization.

use crate::grid::PixelGrid;
use image::imageops;
use serde::{Deserialize, Serialize};

/// Options for orientation normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationOptions {
    /// Rotate portrait images clockwise (otherwise counter-clockwise)
    pub rotate_clockwise: bool,
}

impl Default for OrientationOptions {
    fn default() -> Self {
        Self {
            rotate_clockwise: true,
        }
    }
}

/// Whether a `width` x `height` image is portrait and must be rotated.
///
/// Square images are left alone.
pub fn needs_rotation(width: u32, height: u32) -> bool {
    height > width
}

/// Rotate a portrait grid by 90 degrees; landscape and square grids pass through.
///
/// Returns the grid and whether it was rotated.
pub fn normalize(grid: PixelGrid, clockwise: bool) -> (PixelGrid, bool) {
    if !needs_rotation(grid.width(), grid.height()) {
        return (grid, false);
    }

    let rotated = if clockwise {
        imageops::rotate90(&grid)
    } else {
        imageops::rotate270(&grid)
    };
    (rotated, true)
}
