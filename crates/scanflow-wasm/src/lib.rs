//! ScanFlow WASM - WebAssembly bindings for ScanFlow
//!
//! This crate exposes the scanflow-core pipeline to JavaScript/TypeScript
//! applications that scan codes from a camera stream.
//!
//! # Module Structure
//!
//! - `pipeline` - `ScanPipeline`, the whole frame pipeline driven by JS callbacks
//! - `transform` - Individual stages (enhance, crop, classify, upscale, deskew)
//! - `types` - WASM-compatible wrapper types for image data
//! - `encode` - JPEG export of crops and stage snapshots
//!
//! # Usage
//!
//! ```typescript
//! import init, { ScanPipeline } from '@scanflow/wasm';
//!
//! await init();
//!
//! const pipeline = new ScanPipeline(undefined, callbacks, 390, 844);
//! const frame = ctx.getImageData(0, 0, video.videoWidth, video.videoHeight);
//! const summary = pipeline.process_frame(frame.data, frame.width, frame.height, undefined);
//! ```

use wasm_bindgen::prelude::*;

mod encode;
mod pipeline;
mod transform;
mod types;

// Re-export public types
pub use encode::{encode_jpeg, encode_jpeg_rgb};
pub use pipeline::ScanPipeline;
pub use transform::{
    classify_distance, crop_preview, deskew, enhance_frame, frame_luminance, resize, rotate, skew_angle,
    upscale_crop,
};
pub use types::JsImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    // Panics surface as opaque "unreachable" traps until a panic hook is installed.
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
