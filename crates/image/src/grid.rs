//! Pixel grid helpers shared by the pipeline stages.
//!
//! A [`PixelGrid`] is a plain `image::RgbaImage`; an [`AlphaChannel`] is its
//! fourth channel split out into a `GrayImage` of the same dimensions.

use crate::error::{ImageError, Result};
use image::{GrayImage, Luma, RgbaImage};

/// Straight-alpha RGBA8 pixel grid.
pub type PixelGrid = RgbaImage;

/// One opacity value per pixel of a [`PixelGrid`].
pub type AlphaChannel = GrayImage;

/// Build a grid from rows of `[r, g, b, a]` pixels.
///
/// Every row must have the same length. An empty slice yields a 0x0 grid.
pub fn grid_from_rows(rows: &[Vec<[u8; 4]>]) -> Result<PixelGrid> {
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);

    let mut raw = Vec::with_capacity(width * height * 4);
    for (y, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ImageError::InvalidGrid(format!(
                "row {} has {} pixels, expected {}",
                y,
                row.len(),
                width
            )));
        }
        for px in row {
            raw.extend_from_slice(px);
        }
    }

    grid_from_raw(dimension(width)?, dimension(height)?, raw)
}

/// Wrap a raw interleaved RGBA buffer, checking its length.
pub fn grid_from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<PixelGrid> {
    let len = raw.len();
    RgbaImage::from_raw(width, height, raw).ok_or_else(|| {
        ImageError::InvalidGrid(format!(
            "buffer of {} bytes does not match {}x{} RGBA",
            len, width, height
        ))
    })
}

/// Copy the alpha plane out of a grid.
pub fn alpha_channel(grid: &PixelGrid) -> AlphaChannel {
    GrayImage::from_fn(grid.width(), grid.height(), |x, y| {
        Luma([grid.get_pixel(x, y)[3]])
    })
}

/// Replace the alpha plane of `grid`, leaving colour channels untouched.
pub fn replace_alpha(mut grid: PixelGrid, alpha: &AlphaChannel) -> Result<PixelGrid> {
    if grid.dimensions() != alpha.dimensions() {
        let (gw, gh) = grid.dimensions();
        let (aw, ah) = alpha.dimensions();
        return Err(ImageError::InvalidGrid(format!(
            "alpha plane is {}x{} but grid is {}x{}",
            aw, ah, gw, gh
        )));
    }

    for (px, a) in grid.pixels_mut().zip(alpha.pixels()) {
        px[3] = a[0];
    }
    Ok(grid)
}

/// Whether every pixel has alpha 0 (also true for an empty grid).
pub fn is_fully_transparent(grid: &PixelGrid) -> bool {
    grid.pixels().all(|px| px[3] == 0)
}

fn dimension(n: usize) -> Result<u32> {
    u32::try_from(n)
        .map_err(|_| ImageError::InvalidGrid(format!("dimension {} exceeds u32", n)))
}
