//! WASM bindings for the individual pipeline stages.
//!
//! Hosts that drive their own loop (or want to preview a single stage while
//! tuning) can call these directly instead of going through `ScanPipeline`.

use crate::types::{filter_from_u8, JsImage};
use scanflow_core::luminance::mean_luminance;
use scanflow_core::transform::{crop_preview_rect, resize as core_resize, rotate_about_center, InterpolationFilter};
use scanflow_core::{
    DistanceClass, DistanceClassifier, FrameEnhancer, ImageUpscaler, Rect, RotationCorrector, Size,
    SymbologyClass,
};
use wasm_bindgen::prelude::*;

const WHITE: [u8; 3] = [255, 255, 255];

/// Brighten a frame when `brightness` is below the default threshold.
///
/// Bright frames come back unchanged.
#[wasm_bindgen]
pub fn enhance_frame(image: &JsImage, brightness: f64) -> JsImage {
    let enhancer = FrameEnhancer::default();
    JsImage::from_image(enhancer.enhance(&image.to_image(), brightness))
}

/// Mean luminance in 0.0-1.0, for hosts whose camera reports no brightness.
#[wasm_bindgen]
pub fn frame_luminance(image: &JsImage) -> f32 {
    mean_luminance(&image.to_image())
}

/// Crop the region of a frame covered by a preview-space rectangle.
///
/// Returns `undefined` for a degenerate rectangle or one entirely outside
/// the preview.
#[wasm_bindgen]
pub fn crop_preview(
    image: &JsImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    preview_width: f32,
    preview_height: f32,
) -> Option<JsImage> {
    let rect = Rect::new(x, y, width, height);
    let preview = Size::new(preview_width, preview_height);
    crop_preview_rect(&image.to_image(), &rect, preview).map(JsImage::from_image)
}

/// Classify a crop as `"near"` or `"far"` for its class label (`"QR"` or
/// anything else for linear barcodes).
#[wasm_bindgen]
pub fn classify_distance(
    class_label: &str,
    crop_width: f32,
    crop_height: f32,
    preview_width: f32,
    preview_height: f32,
) -> String {
    let class = SymbologyClass::from_label(class_label);
    let distance = DistanceClassifier::default().classify(
        class,
        crop_width,
        crop_height,
        preview_width,
        preview_height,
    );
    distance_label(distance).to_string()
}

/// Geometric upscale of a far crop with the default per-class factors.
#[wasm_bindgen]
pub fn upscale_crop(image: &JsImage, class_label: &str) -> JsImage {
    let class = SymbologyClass::from_label(class_label);
    JsImage::from_image(ImageUpscaler::default().geometric(&image.to_image(), class))
}

/// Resize to exact dimensions.
///
/// `filter`: 0 = Nearest, 1 = Bilinear, 2 = Lanczos3.
#[wasm_bindgen]
pub fn resize(image: &JsImage, width: u32, height: u32, filter: u8) -> Result<JsImage, JsValue> {
    core_resize(&image.to_image(), width, height, filter_from_u8(filter))
        .map(JsImage::from_image)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Straighten a barcode crop. The result is square, padded with white.
#[wasm_bindgen]
pub fn deskew(image: &JsImage) -> JsImage {
    JsImage::from_image(RotationCorrector::default().deskew(&image.to_image()))
}

/// Skew angle in degrees that `deskew` would correct, 0 when no line is found.
#[wasm_bindgen]
pub fn skew_angle(image: &JsImage) -> f64 {
    RotationCorrector::default()
        .deskew_with_angle(&image.to_image())
        .angle
}

/// Rotate about the center, keeping dimensions. Uncovered pixels are white.
///
/// Positive angles rotate counter-clockwise.
#[wasm_bindgen]
pub fn rotate(image: &JsImage, angle_degrees: f64, use_bicubic: bool) -> JsImage {
    let filter = if use_bicubic {
        InterpolationFilter::Bicubic
    } else {
        InterpolationFilter::Bilinear
    };
    JsImage::from_image(rotate_about_center(&image.to_image(), angle_degrees, filter, WHITE))
}

pub(crate) fn distance_label(distance: DistanceClass) -> &'static str {
    match distance {
        DistanceClass::Near => "near",
        DistanceClass::Far => "far",
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_resize_exact() {
        let img = JsImage::new(10, 10, vec![128u8; 300]);
        let out = resize(&img, 5, 20, 1).unwrap();
        assert_eq!((out.width(), out.height()), (5, 20));
    }

    #[wasm_bindgen_test]
    fn test_resize_zero_fails() {
        let img = JsImage::new(10, 10, vec![128u8; 300]);
        assert!(resize(&img, 0, 20, 1).is_err());
    }
}
