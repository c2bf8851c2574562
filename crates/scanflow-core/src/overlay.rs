//! Overlay descriptors for the host's bounding-box renderer.

use serde::{Deserialize, Serialize};

use crate::frame::{Rect, Size};
use crate::services::DetectionCandidate;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#RRGGBB` / `#RRGGBBAA` form, as CSS expects.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontWeight {
    Regular,
    Medium,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontMetric {
    pub size: f32,
    pub weight: FontWeight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Inset kept between a clamped rect and the preview edge.
    pub edge_offset: f32,
    pub success_color: Rgba,
    pub font: FontMetric,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            edge_offset: 2.0,
            success_color: Rgba::new(0x32, 0xD7, 0x4B, 0xFF),
            font: FontMetric {
                size: 14.0,
                weight: FontWeight::Medium,
            },
        }
    }
}

/// One box for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayDescriptor {
    pub label: String,
    pub rect: Rect,
    pub color: Rgba,
    pub font: FontMetric,
}

impl OverlayDescriptor {
    pub fn for_candidate(
        candidate: &DetectionCandidate,
        preview: Size,
        success: bool,
        config: &OverlayConfig,
    ) -> Self {
        Self {
            label: overlay_label(candidate),
            rect: clamp_to_preview(candidate.rect, preview, config.edge_offset),
            color: if success {
                config.success_color
            } else {
                Rgba::TRANSPARENT
            },
            font: config.font,
        }
    }
}

/// `"QR  (87%)"`: class label, two spaces, truncated confidence percentage.
pub fn overlay_label(candidate: &DetectionCandidate) -> String {
    let percent = (candidate.confidence * 100.0) as i32;
    format!("{}  ({}%)", candidate.class.label(), percent)
}

/// Pull a rect back inside the preview.
///
/// A negative origin moves to `offset`; a rect crossing the far edge is
/// shortened to end `offset` inside it. A rect lying wholly past the far
/// edge collapses to zero width or height rather than going negative.
pub fn clamp_to_preview(rect: Rect, preview: Size, offset: f32) -> Rect {
    let mut out = rect;
    if out.x < 0.0 {
        out.x = offset;
    }
    if out.y < 0.0 {
        out.y = offset;
    }
    if out.max_y() > preview.height {
        out.height = preview.height - out.y - offset;
    }
    if out.max_x() > preview.width {
        out.width = preview.width - out.x - offset;
    }
    out.width = out.width.max(0.0);
    out.height = out.height.max(0.0);
    out
}
