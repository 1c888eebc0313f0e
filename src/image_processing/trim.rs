use image::{imageops, RgbaImage};

/// Inclusive pixel rectangle enclosing every pixel with non-zero alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// True when the box covers an entire `width`x`height` image
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x_min == 0 && self.y_min == 0 && self.width() == width && self.height() == height
    }
}

#[inline]
fn is_visible(img: &RgbaImage, x: u32, y: u32) -> bool {
    img.get_pixel(x, y)[3] > 0
}

/// Find the tight bounding box of all non-transparent pixels.
///
/// Four early-exit scans, each narrowing the search space of the next:
/// left edge over the whole image, top edge from `x_min` rightwards, right edge
/// from the last column down to `x_min` starting at `y_min`, and bottom edge
/// within `[x_min, x_max]`. Returns `None` for a fully transparent image.
pub fn alpha_bounding_box(img: &RgbaImage) -> Option<BoundingBox> {
    let (width, height) = img.dimensions();

    let x_min = (0..width).find(|&x| (0..height).any(|y| is_visible(img, x, y)))?;

    // A hit exists in column x_min, so every following scan finds one too
    let y_min = (0..height).find(|&y| (x_min..width).any(|x| is_visible(img, x, y)))?;

    let x_max = (x_min..width)
        .rev()
        .find(|&x| (y_min..height).any(|y| is_visible(img, x, y)))?;

    let y_max = (y_min..height)
        .rev()
        .find(|&y| (x_min..=x_max).any(|x| is_visible(img, x, y)))?;

    Some(BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
    })
}

/// Crop an image to its visible content.
///
/// Fully transparent images and images whose content already touches every edge
/// are returned untouched; an image is never cropped to zero size.
pub fn trim(img: RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();

    match alpha_bounding_box(&img) {
        Some(bbox) if !bbox.is_full(width, height) => {
            imageops::crop_imm(&img, bbox.x_min, bbox.y_min, bbox.width(), bbox.height())
                .to_image()
        }
        _ => img,
    }
}
