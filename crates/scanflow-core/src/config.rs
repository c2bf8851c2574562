//! Pipeline configuration.
//!
//! Every section has working defaults; hosts override only what they need,
//! typically from a JSON object. Call [`PipelineConfig::validate`] before
//! building a pipeline from untrusted input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deskew::DeskewConfig;
use crate::distance::DistanceConfig;
use crate::enhance::EnhancerConfig;
use crate::overlay::OverlayConfig;
use crate::upscale::UpscaleConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames discarded after start while the camera settles.
    pub warmup_frames: u32,
    /// Suppresses success feedback.
    pub production: bool,
    /// Keep per-stage snapshots in the diagnostics recorder.
    pub capture_diagnostics: bool,
    pub enhancer: EnhancerConfig,
    pub distance: DistanceConfig,
    pub upscale: UpscaleConfig,
    pub deskew: DeskewConfig,
    pub overlay: OverlayConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warmup_frames: 5,
            production: false,
            capture_diagnostics: false,
            enhancer: EnhancerConfig::default(),
            distance: DistanceConfig::default(),
            upscale: UpscaleConfig::default(),
            deskew: DeskewConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.enhancer;
        finite("enhancer.brightness_threshold", e.brightness_threshold)?;
        in_range("enhancer.exposure", e.exposure as f64, -5.0, 5.0)?;
        in_range("enhancer.contrast", e.contrast as f64, -100.0, 100.0)?;

        let d = &self.distance;
        in_range("distance.qr_ratio_threshold", d.qr_ratio_threshold as f64, 0.0, 1.0)?;
        in_range("distance.linear_ratio_threshold", d.linear_ratio_threshold as f64, 0.0, 1.0)?;

        let u = &self.upscale;
        in_range("upscale.qr_scale", u.qr_scale as f64, 1.0, 8.0)?;
        in_range("upscale.linear_scale_x", u.linear_scale_x as f64, 1.0, 8.0)?;
        in_range("upscale.linear_scale_y", u.linear_scale_y as f64, 1.0, 8.0)?;
        if u.max_edge == 0 {
            return Err(ConfigError::Invalid {
                field: "upscale.max_edge",
                reason: "must be positive".to_string(),
            });
        }

        let k = &self.deskew;
        if k.kernel_size == 0 || k.kernel_size % 2 == 0 {
            return Err(ConfigError::Invalid {
                field: "deskew.kernel_size",
                reason: format!("must be odd, got {}", k.kernel_size),
            });
        }
        // Morphology radius is a u8
        in_range("deskew.kernel_size", k.kernel_size as f64, 1.0, 511.0)?;
        in_range("deskew.canny_low", k.canny_low as f64, 0.0, f32::MAX as f64)?;
        in_range("deskew.canny_high", k.canny_high as f64, k.canny_low as f64, f32::MAX as f64)?;
        if k.vote_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "deskew.vote_threshold",
                reason: "must be positive".to_string(),
            });
        }
        in_range("deskew.min_line_length", k.min_line_length as f64, 0.0, f32::MAX as f64)?;
        in_range("deskew.max_line_gap", k.max_line_gap as f64, 0.0, f32::MAX as f64)?;

        in_range("overlay.edge_offset", self.overlay.edge_offset as f64, 0.0, f32::MAX as f64)?;
        in_range("overlay.font.size", self.overlay.font.size as f64, 1.0, 200.0)?;

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be finite, got {}", value),
        })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.warmup_frames, 5);
        assert!(!config.production);
        assert_eq!(config.distance.qr_ratio_threshold, 0.04);
        assert_eq!(config.distance.linear_ratio_threshold, 0.06);
        assert_eq!(config.enhancer.brightness_threshold, 0.5);
    }

    #[test]
    fn test_exposure_out_of_range() {
        let mut config = PipelineConfig::default();
        config.enhancer.exposure = 6.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "enhancer.exposure",
                ..
            })
        ));
    }

    #[test]
    fn test_even_kernel_rejected() {
        let mut config = PipelineConfig::default();
        config.deskew.kernel_size = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "deskew.kernel_size",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_kernel_rejected() {
        let mut config = PipelineConfig::default();
        config.deskew.kernel_size = 513;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "deskew.kernel_size",
                ..
            })
        ));
        config.deskew.kernel_size = 511;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_canny_thresholds_ordered() {
        let mut config = PipelineConfig::default();
        config.deskew.canny_low = 250.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = PipelineConfig::default();
        config.distance.qr_ratio_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_downscale_rejected() {
        let mut config = PipelineConfig::default();
        config.upscale.linear_scale_y = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_error_message() {
        let err = ConfigError::OutOfRange {
            field: "enhancer.contrast",
            value: 150.0,
            min: -100.0,
            max: 100.0,
        };
        assert_eq!(err.to_string(), "enhancer.contrast must be within [-100, 100], got 150");
    }
}
