use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{imageops, RgbaImage};

use crate::error::{ProcessingError, Result};

/// Placement of uniformly scaled content inside a target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pos_x: u32,
    pub pos_y: u32,
}

fn check_source(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ProcessingError::InvalidDimension { width, height });
    }
    Ok(())
}

fn check_target(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ProcessingError::InvalidTarget { width, height });
    }
    Ok(())
}

/// Compute the largest uniform scale of `src` that fits in `dst`, centered.
///
/// `ratio = min(dst_w / src_w, dst_h / src_h)`; scaled sides are floored and the
/// offsets use truncating division, so odd remainders lean top-left. The floors are
/// evaluated in integer arithmetic to stay exact at ratios like 64/3.
pub fn fit_geometry(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> Result<FitGeometry> {
    check_source(src_width, src_height)?;
    check_target(dst_width, dst_height)?;

    let (sw, sh, dw, dh) = (
        src_width as u64,
        src_height as u64,
        dst_width as u64,
        dst_height as u64,
    );

    // dw/sw <= dh/sh  <=>  dw*sh <= dh*sw
    let (scaled_width, scaled_height) = if dw * sh <= dh * sw {
        (dw, sh * dw / sw)
    } else {
        (sw * dh / sh, dh)
    };

    // Extreme aspect ratios can floor a side to nothing
    let scaled_width = scaled_width.max(1) as u32;
    let scaled_height = scaled_height.max(1) as u32;

    Ok(FitGeometry {
        scaled_width,
        scaled_height,
        pos_x: (dst_width - scaled_width) / 2,
        pos_y: (dst_height - scaled_height) / 2,
    })
}

/// Output size for stretch mode: the longer source side becomes `long_side`,
/// the shorter one is scaled proportionally and truncated.
pub fn stretch_dimensions(src_width: u32, src_height: u32, long_side: u32) -> Result<(u32, u32)> {
    check_source(src_width, src_height)?;
    check_target(long_side, long_side)?;

    let size = long_side as u64;
    let dims = if src_width > src_height {
        let height = size * src_height as u64 / src_width as u64;
        (long_side, height.max(1) as u32)
    } else if src_height > src_width {
        let width = size * src_width as u64 / src_height as u64;
        (width.max(1) as u32, long_side)
    } else {
        (long_side, long_side)
    };

    Ok(dims)
}

/// Letterbox `img` into a fully transparent `target_width`x`target_height` canvas
pub fn resize_fit(img: &RgbaImage, target_width: u32, target_height: u32) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();
    let geometry = fit_geometry(src_width, src_height, target_width, target_height)?;

    let scaled = resize_image(img, geometry.scaled_width, geometry.scaled_height)?;
    if geometry.scaled_width == target_width && geometry.scaled_height == target_height {
        return Ok(scaled);
    }

    let mut canvas = RgbaImage::new(target_width, target_height);
    imageops::replace(
        &mut canvas,
        &scaled,
        geometry.pos_x as i64,
        geometry.pos_y as i64,
    );
    Ok(canvas)
}

/// Resample `img` to its aspect-matched size with the long side at `long_side`
pub fn resize_stretch(img: &RgbaImage, long_side: u32) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();
    let (width, height) = stretch_dimensions(src_width, src_height, long_side)?;
    resize_image(img, width, height)
}

/// Produce the variant for one configured size
pub fn resize_to_size(img: &RgbaImage, size: u32, square_output: bool) -> Result<RgbaImage> {
    if square_output {
        resize_fit(img, size, size)
    } else {
        resize_stretch(img, size)
    }
}

/// Resample to exact dimensions with a bicubic (Catmull-Rom) convolution.
///
/// Alpha is pre-multiplied before filtering and divided back afterwards so that
/// transparent neighbours do not darken silhouette edges.
pub fn resize_image(img: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();
    check_source(src_width, src_height)?;
    check_target(width, height)?;

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(ProcessingError::resample)?;

    let mut dst_image = Image::new(width, height, PixelType::U8x4);

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom))
        .use_alpha(true);

    let mut resizer = Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(ProcessingError::resample)?;

    RgbaImage::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
        ProcessingError::Resample(format!(
            "resized buffer does not match {}x{}",
            width, height
        ))
    })
}
