//! Near/far classification of detector crops.
//!
//! A code that covers only a small share of the preview is far from the
//! camera and needs upscaling before decoding. QR codes are square and
//! barcodes elongated, so each class carries its own area-ratio threshold.

use serde::{Deserialize, Serialize};

use crate::symbology::SymbologyClass;

/// Distance of a candidate from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceClass {
    Near,
    Far,
}

/// Area-ratio thresholds (crop area / preview area).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub qr_ratio_threshold: f32,
    pub linear_ratio_threshold: f32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            qr_ratio_threshold: 0.04,
            linear_ratio_threshold: 0.06,
        }
    }
}

impl DistanceConfig {
    pub fn threshold_for(&self, class: SymbologyClass) -> f32 {
        match class {
            SymbologyClass::Qr => self.qr_ratio_threshold,
            SymbologyClass::Linear => self.linear_ratio_threshold,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DistanceClassifier {
    config: DistanceConfig,
}

impl DistanceClassifier {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    /// Classify a crop against the preview it was taken from.
    ///
    /// A ratio equal to the threshold is Near. An unmeasurable preview
    /// (zero or non-finite area) is treated as Near.
    pub fn classify(
        &self,
        class: SymbologyClass,
        crop_width: f32,
        crop_height: f32,
        preview_width: f32,
        preview_height: f32,
    ) -> DistanceClass {
        let preview_area = preview_width * preview_height;
        if !preview_area.is_finite() || preview_area <= 0.0 {
            return DistanceClass::Near;
        }

        let ratio = (crop_width * crop_height) / preview_area;
        if ratio < self.config.threshold_for(class) {
            DistanceClass::Far
        } else {
            DistanceClass::Near
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> DistanceClassifier {
        DistanceClassifier::default()
    }

    #[test]
    fn test_small_qr_is_far() {
        // 60x60 on 390x844 is ~1.1% of the preview
        let d = classifier().classify(SymbologyClass::Qr, 60.0, 60.0, 390.0, 844.0);
        assert_eq!(d, DistanceClass::Far);
    }

    #[test]
    fn test_large_qr_is_near() {
        let d = classifier().classify(SymbologyClass::Qr, 250.0, 250.0, 390.0, 844.0);
        assert_eq!(d, DistanceClass::Near);
    }

    #[test]
    fn test_classes_use_their_own_threshold() {
        // Ratio 0.05 sits between the QR (0.04) and linear (0.06) thresholds
        let c = classifier();
        assert_eq!(c.classify(SymbologyClass::Qr, 50.0, 10.0, 100.0, 100.0), DistanceClass::Near);
        assert_eq!(
            c.classify(SymbologyClass::Linear, 50.0, 10.0, 100.0, 100.0),
            DistanceClass::Far
        );
    }

    #[test]
    fn test_ratio_equal_to_threshold_is_near() {
        let c = DistanceClassifier::new(DistanceConfig {
            qr_ratio_threshold: 0.25,
            linear_ratio_threshold: 0.5,
        });
        // 50x50 / 100x100 = 0.25 exactly
        assert_eq!(c.classify(SymbologyClass::Qr, 50.0, 50.0, 100.0, 100.0), DistanceClass::Near);
        // 50x100 / 100x100 = 0.5 exactly
        assert_eq!(
            c.classify(SymbologyClass::Linear, 50.0, 100.0, 100.0, 100.0),
            DistanceClass::Near
        );
    }

    #[test]
    fn test_ratio_just_below_threshold_is_far() {
        let c = DistanceClassifier::new(DistanceConfig {
            qr_ratio_threshold: 0.25,
            linear_ratio_threshold: 0.5,
        });
        assert_eq!(c.classify(SymbologyClass::Qr, 49.9, 50.0, 100.0, 100.0), DistanceClass::Far);
        assert_eq!(c.classify(SymbologyClass::Qr, 50.1, 50.0, 100.0, 100.0), DistanceClass::Near);
    }

    #[test]
    fn test_degenerate_preview_is_near() {
        let c = classifier();
        assert_eq!(c.classify(SymbologyClass::Qr, 10.0, 10.0, 0.0, 844.0), DistanceClass::Near);
        assert_eq!(
            c.classify(SymbologyClass::Qr, 10.0, 10.0, f32::NAN, 844.0),
            DistanceClass::Near
        );
    }

    proptest! {
        #[test]
        fn prop_boundary_epsilon(threshold in 0.01f32..0.9, eps in 1e-4f32..1e-2) {
            let c = DistanceClassifier::new(DistanceConfig {
                qr_ratio_threshold: threshold,
                linear_ratio_threshold: threshold,
            });
            // Preview of area 1.0 makes the ratio the crop area itself
            let below = (threshold - eps).max(0.0);
            let above = threshold + eps;
            prop_assert_eq!(
                c.classify(SymbologyClass::Qr, below, 1.0, 1.0, 1.0),
                DistanceClass::Far
            );
            prop_assert_eq!(
                c.classify(SymbologyClass::Linear, above, 1.0, 1.0, 1.0),
                DistanceClass::Near
            );
        }

        #[test]
        fn prop_growing_crop_never_moves_far(
            w in 1.0f32..400.0,
            h in 1.0f32..400.0,
            grow in 1.0f32..4.0,
        ) {
            let c = classifier();
            let small = c.classify(SymbologyClass::Qr, w, h, 400.0, 800.0);
            let large = c.classify(SymbologyClass::Qr, w * grow, h * grow, 400.0, 800.0);
            if small == DistanceClass::Near {
                prop_assert_eq!(large, DistanceClass::Near);
            }
        }
    }
}
