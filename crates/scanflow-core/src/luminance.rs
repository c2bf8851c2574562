//! Luminance and grayscale conversion.
//!
//! Uses ITU-R BT.601 weights, the same weights camera pipelines apply when
//! collapsing a BGR frame to a single channel before edge analysis.

use image::GrayImage;

use crate::frame::Image;

/// BT.601 coefficient for the red channel.
pub const LUMA_R: f32 = 0.299;

/// BT.601 coefficient for the green channel.
pub const LUMA_G: f32 = 0.587;

/// BT.601 coefficient for the blue channel.
pub const LUMA_B: f32 = 0.114;

/// Luminance of an RGB triple (0-255).
#[inline]
pub fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    let lum = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
    lum.clamp(0.0, 255.0).round() as u8
}

/// Collapse an RGB image to a single-channel `GrayImage`.
pub fn to_grayscale(image: &Image) -> GrayImage {
    let gray: Vec<u8> = image
        .pixels
        .chunks_exact(3)
        .map(|p| luma_u8(p[0], p[1], p[2]))
        .collect();
    GrayImage::from_raw(image.width, image.height, gray)
        .unwrap_or_else(|| GrayImage::new(image.width, image.height))
}

/// Mean luminance of an image, normalized to 0.0-1.0.
///
/// Returns 0.0 for an empty image.
pub fn mean_luminance(image: &Image) -> f32 {
    let count = image.pixels.len() / 3;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image
        .pixels
        .chunks_exact(3)
        .map(|p| luma_u8(p[0], p[1], p[2]) as u64)
        .sum();
    sum as f32 / count as f32 / 255.0
}
