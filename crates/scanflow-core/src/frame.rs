//! Image buffers, capture frames and preview-space geometry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image buffer operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height is zero.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Pixel data length doesn't match expected dimensions.
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },
}

/// Filter type for geometric resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// An RGB image, 3 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order. Length is width * height * 3.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Create a new Image, checking the buffer length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected = rgb_len(width, height);
        if pixels.len() != expected {
            return Err(ImageError::InvalidPixelData {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create an image filled with a single color.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(rgb_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build an RGB image from a 4-channel RGBA buffer (e.g. canvas `ImageData`).
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, ImageError> {
        Self::from_four_channel(width, height, rgba, [0, 1, 2])
    }

    /// Build an RGB image from a 4-channel BGRA buffer (the usual camera format).
    pub fn from_bgra(width: u32, height: u32, bgra: &[u8]) -> Result<Self, ImageError> {
        Self::from_four_channel(width, height, bgra, [2, 1, 0])
    }

    fn from_four_channel(
        width: u32,
        height: u32,
        data: &[u8],
        order: [usize; 3],
    ) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }
        let mut pixels = Vec::with_capacity(rgb_len(width, height));
        for chunk in data.chunks_exact(4) {
            pixels.push(chunk[order[0]]);
            pixels.push(chunk[order[1]]);
            pixels.push(chunk[order[2]]);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create an Image from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Result<image::RgbImage, ImageError> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            ImageError::InvalidPixelData {
                expected: rgb_len(self.width, self.height),
                actual: self.pixels.len(),
            },
        )
    }

    /// Dimensions as a `Size`.
    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// True when the buffer length matches the dimensions.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == rgb_len(self.width, self.height)
    }

    /// Read the RGB triple at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }
}

/// A captured camera frame as offered by the frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Image,
    /// Capture time, relative to the pipeline clock's origin.
    pub captured_at: Duration,
    /// Scene brightness reported by the camera (EXIF brightness value), if any.
    pub brightness: Option<f64>,
}

impl Frame {
    pub fn new(image: Image, captured_at: Duration, brightness: Option<f64>) -> Self {
        Self {
            image,
            captured_at,
            brightness,
        }
    }

    /// Brightness metric with an absent value treated as 0 (dark).
    pub fn brightness_or_zero(&self) -> f64 {
        self.brightness.filter(|b| b.is_finite()).unwrap_or(0.0)
    }
}

#[inline]
fn rgb_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Width and height in preview (screen) units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Positive, finite width and height.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle in preview coordinates. Origin is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// A rect that can locate a candidate: finite coordinates, positive area.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}
