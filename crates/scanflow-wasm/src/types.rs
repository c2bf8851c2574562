//! WASM-compatible wrapper types for image data.
//!
//! Browser frames arrive as RGBA (`ImageData`, `VideoFrame.copyTo`); the core
//! works on RGB. `JsImage` keeps RGB in WASM memory and converts at the edges.

use scanflow_core::{FilterType, Image};
use wasm_bindgen::prelude::*;

/// An RGB image held in WASM memory.
#[wasm_bindgen]
pub struct JsImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsImage {
    /// Create an image from RGB pixel data (3 bytes per pixel, row-major order).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsImage {
        JsImage {
            width,
            height,
            pixels,
        }
    }

    /// Create an image from RGBA data, e.g. `ctx.getImageData(...).data`.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<JsImage, JsValue> {
        Image::from_rgba(width, height, rgba)
            .map(JsImage::from_image)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGB pixel data as Uint8Array. This copies.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Returns opaque RGBA data ready for `new ImageData(...)`.
    pub fn to_rgba(&self) -> Vec<u8> {
        rgb_to_rgba(&self.pixels)
    }

    /// Explicitly free WASM memory.
    ///
    /// This is optional - wasm-bindgen's finalizer will handle cleanup automatically.
    pub fn free(self) {
        // Dropping self releases the memory
    }
}

impl JsImage {
    pub(crate) fn from_image(img: Image) -> Self {
        Self {
            width: img.width,
            height: img.height,
            pixels: img.pixels,
        }
    }

    /// Convert to a core Image. This clones the pixel data.
    pub(crate) fn to_image(&self) -> Image {
        Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}

/// Expand RGB to RGBA with full alpha.
pub(crate) fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for p in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[p[0], p[1], p[2], 255]);
    }
    rgba
}

/// Convert a u8 filter type value to the core FilterType enum.
///
/// Values:
/// - 0 = Nearest (fastest, lowest quality)
/// - 1 = Bilinear (good balance of speed and quality)
/// - 2 = Lanczos3 (best quality, slowest)
///
/// Any other value defaults to Bilinear.
pub(crate) fn filter_from_u8(value: u8) -> FilterType {
    match value {
        0 => FilterType::Nearest,
        2 => FilterType::Lanczos3,
        _ => FilterType::Bilinear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_image_creation() {
        let img = JsImage::new(100, 50, vec![0u8; 100 * 50 * 3]);
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 50);
        assert_eq!(img.byte_length(), 15000);
    }

    #[test]
    fn test_round_trip_through_core_image() {
        let core = Image::filled(4, 3, [9, 8, 7]);
        let js = JsImage::from_image(core.clone());
        assert_eq!(js.to_image(), core);
    }

    #[test]
    fn test_to_rgba_adds_opaque_alpha() {
        let img = JsImage::new(2, 1, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(img.to_rgba(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_filter_from_u8() {
        assert!(matches!(filter_from_u8(0), FilterType::Nearest));
        assert!(matches!(filter_from_u8(1), FilterType::Bilinear));
        assert!(matches!(filter_from_u8(2), FilterType::Lanczos3));
        assert!(matches!(filter_from_u8(255), FilterType::Bilinear));
    }
}
