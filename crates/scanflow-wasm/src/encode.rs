//! JPEG encoding bindings.
//!
//! Used to export crops and stage snapshots from a scan session, e.g. to
//! attach them to a bug report or save them for offline tuning.
//!
//! ```typescript
//! import { encode_jpeg, JsImage } from '@scanflow/wasm';
//!
//! const jpeg = encode_jpeg(image, 90);
//! const blob = new Blob([jpeg], { type: 'image/jpeg' });
//! ```

use crate::types::JsImage;
use scanflow_core::encode;
use scanflow_core::Image;
use wasm_bindgen::prelude::*;

/// Encode a JsImage to JPEG bytes.
///
/// `quality` is clamped to 1-100; 90 is a good default for crops that will be
/// decoded again later.
///
/// # Errors
///
/// Returns an error if the image is empty or its buffer doesn't match its
/// dimensions.
#[wasm_bindgen]
pub fn encode_jpeg(image: &JsImage, quality: u8) -> Result<Vec<u8>, JsValue> {
    encode::encode_jpeg(&image.to_image(), quality).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Encode raw RGB pixel data to JPEG bytes.
#[wasm_bindgen]
pub fn encode_jpeg_rgb(pixels: Vec<u8>, width: u32, height: u32, quality: u8) -> Result<Vec<u8>, JsValue> {
    let image = Image::new(width, height, pixels).map_err(|e| JsValue::from_str(&e.to_string()))?;
    encode::encode_jpeg(&image, quality).map_err(|e| JsValue::from_str(&e.to_string()))
}
