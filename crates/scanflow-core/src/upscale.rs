//! Upscaling of far-away candidate crops.
//!
//! Near crops pass through. Far crops are resampled geometrically; far QR
//! crops then go through the super-resolution service, whose miss falls back
//! to the geometric result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::distance::DistanceClass;
use crate::frame::{FilterType, Image};
use crate::services::{Clock, SuperResolution};
use crate::symbology::SymbologyClass;
use crate::transform::scale_by;

/// Per-class geometric scale factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleConfig {
    pub qr_scale: f32,
    pub qr_filter: FilterType,
    /// Horizontal factor for linear codes (across the bars).
    pub linear_scale_x: f32,
    /// Vertical factor for linear codes (along the bars).
    pub linear_scale_y: f32,
    pub linear_filter: FilterType,
    /// Longest edge allowed after scaling.
    pub max_edge: u32,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            qr_scale: 2.0,
            qr_filter: FilterType::Lanczos3,
            linear_scale_x: 3.0,
            linear_scale_y: 2.0,
            linear_filter: FilterType::Bilinear,
            max_edge: 2048,
        }
    }
}

/// Output of one upscale call.
#[derive(Debug, Clone)]
pub struct Upscaled {
    pub image: Image,
    /// Geometric resampling result, when it ran. Kept for diagnostics.
    pub geometric: Option<Image>,
    /// Whether the super-resolution service produced the final image.
    pub super_resolved: bool,
    pub upscale_time: Duration,
    pub super_resolution_time: Duration,
}

impl Upscaled {
    fn passthrough(image: &Image) -> Self {
        Self {
            image: image.clone(),
            geometric: None,
            super_resolved: false,
            upscale_time: Duration::ZERO,
            super_resolution_time: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageUpscaler {
    config: UpscaleConfig,
}

impl ImageUpscaler {
    pub fn new(config: UpscaleConfig) -> Self {
        Self { config }
    }

    /// Upscale a crop according to its class and distance.
    ///
    /// Never fails: a resampling error falls back to the input crop and a
    /// super-resolution miss to the geometric image.
    pub fn upscale(
        &self,
        crop: &Image,
        class: SymbologyClass,
        distance: DistanceClass,
        super_resolution: &dyn SuperResolution,
        clock: &dyn Clock,
    ) -> Upscaled {
        if distance == DistanceClass::Near {
            return Upscaled::passthrough(crop);
        }

        let started = clock.now();
        let geometric = self.geometric(crop, class);
        let upscaled_at = clock.now();
        let upscale_time = upscaled_at.saturating_sub(started);

        if class == SymbologyClass::Linear {
            return Upscaled {
                image: geometric.clone(),
                geometric: Some(geometric),
                super_resolved: false,
                upscale_time,
                super_resolution_time: Duration::ZERO,
            };
        }

        let enhanced = super_resolution.enhance(&geometric).filter(|img| !img.is_empty());
        let super_resolution_time = clock.now().saturating_sub(upscaled_at);

        match enhanced {
            Some(image) => {
                debug!(
                    width = image.width,
                    height = image.height,
                    "super resolution applied"
                );
                Upscaled {
                    image,
                    geometric: Some(geometric),
                    super_resolved: true,
                    upscale_time,
                    super_resolution_time,
                }
            }
            None => {
                debug!("super resolution missed, using geometric upscale");
                Upscaled {
                    image: geometric.clone(),
                    geometric: Some(geometric),
                    super_resolved: false,
                    upscale_time,
                    super_resolution_time,
                }
            }
        }
    }

    /// Geometric resampling only.
    pub fn geometric(&self, crop: &Image, class: SymbologyClass) -> Image {
        let (sx, sy, filter) = match class {
            SymbologyClass::Qr => (self.config.qr_scale, self.config.qr_scale, self.config.qr_filter),
            SymbologyClass::Linear => (
                self.config.linear_scale_x,
                self.config.linear_scale_y,
                self.config.linear_filter,
            ),
        };

        match scale_by(crop, sx, sy, self.config.max_edge, filter) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "upscale failed, keeping original crop");
                crop.clone()
            }
        }
    }
}
