//! Region extraction and canvas reframing.
//!
//! # Coordinate System
//!
//! - Pixel rects are in image pixels, origin top-left
//! - Preview rects are in preview units and are mapped onto the image by
//!   scaling each axis independently

use crate::frame::{Image, Rect, Size};

/// Copy a pixel-space region out of an image.
///
/// The region is clamped to the image bounds. Returns `None` when nothing
/// of the region overlaps the image (zero-area crop), or when the buffer
/// length does not match the dimensions.
pub fn crop_pixels(image: &Image, left: u32, top: u32, width: u32, height: u32) -> Option<Image> {
    if image.is_empty() || !image.is_consistent() || left >= image.width || top >= image.height {
        return None;
    }

    let right = left.saturating_add(width).min(image.width);
    let bottom = top.saturating_add(height).min(image.height);
    let out_width = right - left;
    let out_height = bottom - top;
    if out_width == 0 || out_height == 0 {
        return None;
    }

    // Fast path: full-frame crop
    if out_width == image.width && out_height == image.height {
        return Some(image.clone());
    }

    let row_bytes = (out_width * 3) as usize;
    let mut output = Vec::with_capacity(row_bytes * out_height as usize);

    // Copy pixel data row by row
    for y in top..bottom {
        let start = ((y * image.width + left) * 3) as usize;
        output.extend_from_slice(&image.pixels[start..start + row_bytes]);
    }

    Some(Image {
        width: out_width,
        height: out_height,
        pixels: output,
    })
}

/// Crop the part of `image` covered by a rect expressed in preview coordinates.
///
/// Returns `None` for an invalid rect, an invalid preview size, or a rect
/// lying entirely outside the preview.
pub fn crop_preview_rect(image: &Image, rect: &Rect, preview: Size) -> Option<Image> {
    if !rect.is_valid() || !preview.is_valid() {
        return None;
    }

    let sx = image.width as f32 / preview.width;
    let sy = image.height as f32 / preview.height;

    let x0 = (rect.x * sx).floor().max(0.0);
    let y0 = (rect.y * sy).floor().max(0.0);
    let x1 = (rect.max_x() * sx).ceil().min(image.width as f32);
    let y1 = (rect.max_y() * sy).ceil().min(image.height as f32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    crop_pixels(
        image,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
}

/// Place an image, centered, on a square canvas sized to its longer side.
///
/// Uncovered canvas is filled with `background`. A square input is returned
/// unchanged.
pub fn pad_to_square(image: &Image, background: [u8; 3]) -> Image {
    if image.width == image.height {
        return image.clone();
    }

    let side = image.width.max(image.height);
    let mut canvas = Image::filled(side, side, background);
    let offset_x = (side - image.width) / 2;
    let offset_y = (side - image.height) / 2;
    let row_bytes = (image.width * 3) as usize;

    for y in 0..image.height {
        let src = (y * image.width * 3) as usize;
        let dst = (((y + offset_y) * side + offset_x) * 3) as usize;
        canvas.pixels[dst..dst + row_bytes].copy_from_slice(&image.pixels[src..src + row_bytes]);
    }

    canvas
}
