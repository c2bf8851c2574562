//! Geometric resampling using the `image` crate's algorithms.
//!
//! All functions return new `Image` instances without modifying the input.

use crate::frame::{FilterType, Image, ImageError};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `ImageError::InvalidDimensions` for a zero target size and
/// `ImageError::InvalidPixelData` if the source buffer is malformed.
pub fn resize(
    image: &Image,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Image, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image.to_rgb_image()?;
    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(Image::from_rgb_image(resized))
}

/// Scale an image by independent horizontal and vertical factors.
///
/// The result is shrunk uniformly, if needed, so that neither edge exceeds
/// `max_edge`. Factors must be positive and finite.
pub fn scale_by(
    image: &Image,
    scale_x: f32,
    scale_y: f32,
    max_edge: u32,
    filter: FilterType,
) -> Result<Image, ImageError> {
    if image.is_empty() {
        return Err(ImageError::InvalidDimensions {
            width: image.width,
            height: image.height,
        });
    }
    let (width, height) = scaled_dimensions(image.width, image.height, scale_x, scale_y, max_edge);
    resize(image, width, height, filter)
}

/// Target dimensions for `scale_by`, capped at `max_edge`.
fn scaled_dimensions(
    width: u32,
    height: u32,
    scale_x: f32,
    scale_y: f32,
    max_edge: u32,
) -> (u32, u32) {
    let sx = if scale_x.is_finite() && scale_x > 0.0 { scale_x as f64 } else { 1.0 };
    let sy = if scale_y.is_finite() && scale_y > 0.0 { scale_y as f64 } else { 1.0 };

    let mut w = width as f64 * sx;
    let mut h = height as f64 * sy;

    // Keep the scaled aspect ratio while fitting under the cap
    let longest = w.max(h);
    if max_edge > 0 && longest > max_edge as f64 {
        let shrink = max_edge as f64 / longest;
        w *= shrink;
        h *= shrink;
    }

    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}
