//! Tight cropping to the non-transparent region.

use crate::grid::PixelGrid;
use image::imageops;
use serde::{Deserialize, Serialize};

/// Axis-aligned box, half-open on `right` and `bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// First column inside the box
    pub left: u32,
    /// First row inside the box
    pub top: u32,
    /// One past the last column
    pub right: u32,
    /// One past the last row
    pub bottom: u32,
}

impl BoundingBox {
    /// Box width in pixels.
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Box height in pixels.
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Whether the box covers a whole `width` x `height` grid.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.left == 0 && self.top == 0 && self.right == width && self.bottom == height
    }
}

/// Smallest box containing every pixel with alpha > 0.
///
/// Returns `None` when the grid has no such pixel (including 0x0 grids).
pub fn bounding_box(grid: &PixelGrid) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for (x, y, px) in grid.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        bbox = Some(match bbox {
            None => BoundingBox {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => BoundingBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }

    bbox
}

/// Crop `grid` to its [`bounding_box`].
///
/// A fully transparent grid is returned unchanged rather than collapsing to
/// an empty image.
pub fn crop(grid: PixelGrid) -> PixelGrid {
    match bounding_box(&grid) {
        Some(bbox) if !bbox.is_full(grid.width(), grid.height()) => {
            imageops::crop_imm(&grid, bbox.left, bbox.top, bbox.width(), bbox.height()).to_image()
        }
        _ => grid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn block(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y) {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_crops_transparent_border() {
        let img = block(100, 100, 40, 30, 20, 20);
        assert_eq!(
            bounding_box(&img),
            Some(BoundingBox { left: 40, top: 30, right: 60, bottom: 50 })
        );

        let cropped = crop(img);
        assert_eq!(cropped.dimensions(), (20, 20));
        assert!(cropped.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_fully_opaque_unchanged() {
        let img = RgbaImage::from_pixel(50, 80, Rgba([1, 2, 3, 255]));
        let bbox = bounding_box(&img).unwrap();
        assert!(bbox.is_full(50, 80));
        assert_eq!(crop(img).dimensions(), (50, 80));
    }

    #[test]
    fn test_fully_transparent_returns_original() {
        let img = RgbaImage::from_pixel(30, 30, Rgba([9, 9, 9, 0]));
        assert_eq!(bounding_box(&img), None);

        let cropped = crop(img.clone());
        assert_eq!(cropped, img);
    }

    #[test]
    fn test_empty_grid_has_no_box() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(bounding_box(&img), None);
        assert_eq!(crop(img).dimensions(), (0, 0));
    }

    #[test]
    fn test_any_nonzero_alpha_counts() {
        let mut img = RgbaImage::new(10, 10);
        img.put_pixel(7, 2, Rgba([0, 0, 0, 1]));
        img.put_pixel(3, 8, Rgba([0, 0, 0, 1]));

        let bbox = bounding_box(&img).unwrap();
        assert_eq!(bbox, BoundingBox { left: 3, top: 2, right: 8, bottom: 9 });
        assert_eq!((bbox.width(), bbox.height()), (5, 7));
    }

    #[test]
    fn test_single_pixel() {
        let cropped = crop(block(9, 9, 4, 4, 1, 1));
        assert_eq!(cropped.dimensions(), (1, 1));
    }

    #[test]
    fn test_crop_idempotent() {
        let once = crop(block(64, 48, 5, 7, 30, 11));
        let twice = crop(once.clone());
        assert_eq!(once, twice);
    }
}
