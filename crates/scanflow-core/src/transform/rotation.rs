//! Rotation about the image center on a fixed-size canvas.
//!
//! The output keeps the source dimensions, like an affine warp into a
//! destination of the same size, so callers that must not clip content
//! reframe the image onto a larger canvas first.
//!
//! Angles are in degrees; positive values rotate counter-clockwise as the
//! image is displayed (y axis pointing down). `imageproc` rotates clockwise,
//! so the angle is negated on the way in. The pivot is the middle of the
//! pixel grid, `((w - 1) / 2, (h - 1) / 2)`, so a quarter turn of an odd-sized
//! image maps pixels exactly onto pixels.

use image::Rgb;
use imageproc::geometric_transformations::{rotate, Interpolation};
use tracing::warn;

use crate::frame::Image;

/// Interpolation used when sampling the rotated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum InterpolationFilter {
    Nearest,
    /// Fast bilinear interpolation.
    #[default]
    Bilinear,
    /// Bicubic interpolation, sharper on thin bars.
    Bicubic,
}

impl InterpolationFilter {
    fn to_interpolation(self) -> Interpolation {
        match self {
            InterpolationFilter::Nearest => Interpolation::Nearest,
            InterpolationFilter::Bilinear => Interpolation::Bilinear,
            InterpolationFilter::Bicubic => Interpolation::Bicubic,
        }
    }
}

/// Rotate an image about its center, keeping its dimensions.
///
/// Output pixels whose source falls outside the image take `fill`.
/// Angles within 0.001° of zero return a copy of the input, as does a
/// malformed buffer.
pub fn rotate_about_center(
    image: &Image,
    angle_degrees: f64,
    filter: InterpolationFilter,
    fill: [u8; 3],
) -> Image {
    if !angle_degrees.is_finite() || angle_degrees.abs() < 0.001 || image.is_empty() {
        return image.clone();
    }
    let rgb = match image.to_rgb_image() {
        Ok(rgb) => rgb,
        Err(e) => {
            warn!(error = %e, "skipping rotation of malformed image");
            return image.clone();
        }
    };

    let pivot = (
        (image.width as f32 - 1.0) / 2.0,
        (image.height as f32 - 1.0) / 2.0,
    );
    let theta = -(angle_degrees.to_radians() as f32);
    let rotated = rotate(&rgb, pivot, theta, filter.to_interpolation(), Rgb(fill));
    Image::from_rgb_image(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 3] = [255, 255, 255];

    /// Create a simple test image with a gradient pattern.
    fn test_image(width: u32, height: u32) -> Image {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) * 8) as u8;
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        Image {
            width,
            height,
            pixels,
        }
    }

    /// Black image with a single white pixel at (x, y).
    fn marker_image(size: u32, x: u32, y: u32) -> Image {
        let mut img = Image::filled(size, size, [0, 0, 0]);
        let idx = ((y * size + x) * 3) as usize;
        img.pixels[idx..idx + 3].copy_from_slice(&WHITE);
        img
    }

    fn brightest(img: &Image) -> (u32, u32) {
        let mut best = (0, 0, 0u8);
        for y in 0..img.height {
            for x in 0..img.width {
                let v = img.pixel(x, y)[0];
                if v > best.2 {
                    best = (x, y, v);
                }
            }
        }
        (best.0, best.1)
    }

    #[test]
    fn test_no_rotation_is_identity() {
        let img = test_image(30, 20);
        assert_eq!(rotate_about_center(&img, 0.0, InterpolationFilter::Bilinear, WHITE), img);
        assert_eq!(rotate_about_center(&img, 0.0004, InterpolationFilter::Bilinear, WHITE), img);
        assert_eq!(rotate_about_center(&img, f64::NAN, InterpolationFilter::Bilinear, WHITE), img);
    }

    #[test]
    fn test_rotation_keeps_dimensions() {
        let img = test_image(40, 25);
        let rotated = rotate_about_center(&img, 33.0, InterpolationFilter::Bicubic, WHITE);
        assert_eq!((rotated.width, rotated.height), (40, 25));
        assert_eq!(rotated.pixels.len(), img.pixels.len());
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        // Marker near the top-right corner moves to the top-left corner
        let img = marker_image(21, 18, 2);
        let rotated = rotate_about_center(&img, 90.0, InterpolationFilter::Nearest, [0, 0, 0]);
        assert_eq!(brightest(&rotated), (2, 2));
    }

    #[test]
    fn test_negative_quarter_turn_is_clockwise() {
        // Marker near the top-right corner moves to the bottom-right corner
        let img = marker_image(21, 18, 2);
        let rotated = rotate_about_center(&img, -90.0, InterpolationFilter::Nearest, [0, 0, 0]);
        assert_eq!(brightest(&rotated), (18, 18));
    }

    #[test]
    fn test_corners_take_fill_color() {
        let img = Image::filled(50, 50, [0, 0, 0]);
        let rotated = rotate_about_center(&img, 45.0, InterpolationFilter::Bilinear, WHITE);
        assert_eq!(rotated.pixel(0, 0), WHITE);
        assert_eq!(rotated.pixel(49, 49), WHITE);
        assert_eq!(rotated.pixel(25, 25), [0, 0, 0]);
    }

    #[test]
    fn test_malformed_buffer_is_returned_unchanged() {
        let img = Image {
            width: 10,
            height: 10,
            pixels: vec![0u8; 7],
        };
        assert_eq!(rotate_about_center(&img, 30.0, InterpolationFilter::Bilinear, WHITE), img);
    }

    #[test]
    fn test_tiny_images_do_not_panic() {
        for (w, h) in [(1, 1), (2, 2), (1, 40), (40, 1)] {
            let img = test_image(w, h);
            for filter in [
                InterpolationFilter::Nearest,
                InterpolationFilter::Bilinear,
                InterpolationFilter::Bicubic,
            ] {
                let rotated = rotate_about_center(&img, 30.0, filter, WHITE);
                assert_eq!((rotated.width, rotated.height), (w, h));
            }
        }
    }
}
