//! Low-light frame enhancement.
//!
//! Frames whose reported brightness falls under a threshold get an exposure
//! lift followed by a contrast stretch before detection runs on them.
//!
//! ## Adjustment Order
//! 1. Exposure
//! 2. Contrast

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::frame::Image;

/// Settings for the brightness-gated enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Frames with brightness strictly below this value are enhanced.
    pub brightness_threshold: f64,
    /// Exposure lift in stops (-5 to 5).
    pub exposure: f32,
    /// Contrast (-100 to 100).
    pub contrast: f32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 0.5,
            exposure: 0.8,
            contrast: 35.0,
        }
    }
}

/// Brightness-gated brightness/contrast correction.
#[derive(Debug, Clone, Default)]
pub struct FrameEnhancer {
    config: EnhancerConfig,
}

impl FrameEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Whether a frame with this brightness would be enhanced.
    pub fn should_enhance(&self, brightness: f64) -> bool {
        brightness < self.config.brightness_threshold
    }

    /// Return an enhanced copy of `frame` when `brightness` is below the
    /// threshold, otherwise an unchanged copy.
    ///
    /// The input is never modified. A malformed buffer is returned as-is.
    pub fn enhance(&self, frame: &Image, brightness: f64) -> Image {
        if !self.should_enhance(brightness) {
            return frame.clone();
        }
        if !frame.is_consistent() {
            warn!(
                width = frame.width,
                height = frame.height,
                len = frame.pixels.len(),
                "skipping enhancement of malformed frame"
            );
            return frame.clone();
        }

        debug!(brightness, "low light frame, applying brightness/contrast");
        let mut output = frame.clone();
        apply_brightness_contrast(&mut output.pixels, self.config.exposure, self.config.contrast);
        output
    }
}

/// Apply exposure then contrast to RGB pixel data in place.
///
/// # Example
/// ```
/// use scanflow_core::enhance::apply_brightness_contrast;
///
/// let mut pixels = vec![64, 64, 64];
/// apply_brightness_contrast(&mut pixels, 1.0, 0.0);
/// assert_eq!(pixels, vec![128, 128, 128]);
/// ```
pub fn apply_brightness_contrast(pixels: &mut [u8], exposure: f32, contrast: f32) {
    // Early exit if no adjustments
    if exposure == 0.0 && contrast == 0.0 {
        return;
    }

    for chunk in pixels.chunks_exact_mut(3) {
        for c in chunk.iter_mut() {
            let v = *c as f32 / 255.0;
            let v = apply_contrast(apply_exposure(v, exposure), contrast);
            *c = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
}

/// Formula: `output = input * 2^exposure`
#[inline]
fn apply_exposure(v: f32, exposure: f32) -> f32 {
    if exposure == 0.0 {
        return v;
    }
    v * 2.0_f32.powf(exposure)
}

/// Formula: `output = (input - 0.5) * (1 + contrast/100) + 0.5`
#[inline]
fn apply_contrast(v: f32, contrast: f32) -> f32 {
    if contrast == 0.0 {
        return v;
    }
    (v - 0.5) * (1.0 + contrast / 100.0) + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gray(width: u32, height: u32, v: u8) -> Image {
        Image::filled(width, height, [v, v, v])
    }

    #[test]
    fn test_bright_frame_passes_through() {
        let enhancer = FrameEnhancer::default();
        let frame = gray(4, 4, 90);
        assert_eq!(enhancer.enhance(&frame, 0.8), frame);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let enhancer = FrameEnhancer::default();
        let frame = gray(4, 4, 90);
        assert_eq!(enhancer.enhance(&frame, 0.5), frame);
        assert_ne!(enhancer.enhance(&frame, 0.49), frame);
    }

    #[test]
    fn test_dark_frame_gets_brighter() {
        let enhancer = FrameEnhancer::default();
        let frame = gray(4, 4, 90);
        let out = enhancer.enhance(&frame, 0.3);
        assert!(out.pixels.iter().all(|&p| p > 90));
        // Input untouched
        assert!(frame.pixels.iter().all(|&p| p == 90));
    }

    #[test]
    fn test_negative_brightness_is_enhanced() {
        // EXIF brightness is an APEX value and goes negative in the dark
        let enhancer = FrameEnhancer::default();
        assert!(enhancer.should_enhance(-2.3));
    }

    #[test]
    fn test_malformed_frame_returned_unchanged() {
        let enhancer = FrameEnhancer::default();
        let frame = Image {
            width: 4,
            height: 4,
            pixels: vec![10u8; 7],
        };
        assert_eq!(enhancer.enhance(&frame, 0.0), frame);
    }

    #[test]
    fn test_exposure_one_stop_doubles() {
        let mut pixels = vec![64u8, 64, 64];
        apply_brightness_contrast(&mut pixels, 1.0, 0.0);
        assert_eq!(pixels, vec![128, 128, 128]);
    }

    #[test]
    fn test_contrast_spreads_around_midpoint() {
        let mut pixels = vec![100u8, 128, 160];
        apply_brightness_contrast(&mut pixels, 0.0, 50.0);
        assert!(pixels[0] < 100);
        assert!((pixels[1] as i32 - 128).abs() <= 1);
        assert!(pixels[2] > 160);
    }

    #[test]
    fn test_identity_settings() {
        let mut pixels = vec![1u8, 2, 3, 250, 251, 252];
        apply_brightness_contrast(&mut pixels, 0.0, 0.0);
        assert_eq!(pixels, vec![1, 2, 3, 250, 251, 252]);
    }

    proptest! {
        #[test]
        fn prop_enhancement_preserves_shape(
            w in 1u32..16,
            h in 1u32..16,
            v in any::<u8>(),
            brightness in -5.0f64..5.0,
        ) {
            let frame = gray(w, h, v);
            let out = FrameEnhancer::default().enhance(&frame, brightness);
            prop_assert_eq!(out.width, w);
            prop_assert_eq!(out.height, h);
            prop_assert_eq!(out.pixels.len(), frame.pixels.len());
        }

        #[test]
        fn prop_default_enhancement_never_darkens_midtones(v in 128u8..=255) {
            let out = FrameEnhancer::default().enhance(&gray(1, 1, v), 0.0);
            prop_assert!(out.pixels[0] >= v);
        }
    }
}
