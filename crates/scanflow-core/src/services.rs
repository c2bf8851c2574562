//! Contracts for the black-box collaborators the pipeline drives.
//!
//! Detection and super-resolution models, symbology decoders, feedback
//! playback and result delivery all live outside this crate. Each is a
//! synchronous call returning `Option`; `None` means "no output" and is
//! never an error.

use std::time::Duration;

use crate::frame::{Image, Rect, Size};
use crate::symbology::{DecodeHints, DecodedCode, SymbologyClass};

/// A code located by the object detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate {
    pub class: SymbologyClass,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Bounding rect in preview coordinates.
    pub rect: Rect,
    /// Region of the frame covered by `rect`. When absent the pipeline crops
    /// it from the enhanced frame.
    pub crop: Option<Image>,
}

impl DetectionCandidate {
    pub fn new(class: SymbologyClass, confidence: f32, rect: Rect) -> Self {
        Self {
            class,
            confidence: confidence.clamp(0.0, 1.0),
            rect,
            crop: None,
        }
    }

    pub fn with_crop(mut self, crop: Image) -> Self {
        self.crop = Some(crop);
        self
    }
}

/// Locates codes in an enhanced frame.
pub trait ObjectDetector {
    /// Rects are returned in `preview` space, in no particular order.
    /// `None` is a transient miss and is treated like an empty list.
    fn detect(&self, frame: &Image, preview: Size) -> Option<Vec<DetectionCandidate>>;
}

/// Learned upscaling applied to far QR crops.
pub trait SuperResolution {
    fn enhance(&self, image: &Image) -> Option<Image>;
}

/// Decoder tuned for QR codes.
pub trait QrDecoder {
    fn decode(&self, image: &Image) -> Option<String>;
}

/// Fast platform decoder, tried first for linear codes.
pub trait NativeDecoder {
    fn decode(&self, image: &Image) -> Option<DecodedCode>;
}

/// Permissive multi-format decoder used after deskewing.
pub trait MultiFormatDecoder {
    fn decode(&self, image: &Image, hints: &DecodeHints) -> Option<DecodedCode>;
}

/// Audible or haptic confirmation of a successful decode.
pub trait FeedbackTrigger {
    fn notify_success(&self);
}

/// Receives pipeline output.
pub trait ResultSink {
    /// Called once per candidate, and once with empty strings for a frame
    /// without candidates.
    fn on_decode_result(&self, text: &str, symbology: &str);

    /// Called once per processed frame with that frame's overlays.
    fn on_overlay_update(&self, overlays: Vec<crate::overlay::OverlayDescriptor>);
}

/// Source of timestamps, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since the Unix epoch.
///
/// Not usable on `wasm32-unknown-unknown`; hosts there supply their own clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Feedback trigger for hosts without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackTrigger for NoFeedback {
    fn notify_success(&self) {}
}

/// Super-resolution service for hosts without a model. Always misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuperResolution;

impl SuperResolution for NoSuperResolution {
    fn enhance(&self, _image: &Image) -> Option<Image> {
        None
    }
}

/// Every collaborator one pipeline instance talks to.
pub struct Collaborators {
    pub detector: Box<dyn ObjectDetector>,
    pub super_resolution: Box<dyn SuperResolution>,
    pub qr_decoder: Box<dyn QrDecoder>,
    pub native_decoder: Box<dyn NativeDecoder>,
    pub multi_format_decoder: Box<dyn MultiFormatDecoder>,
    pub feedback: Box<dyn FeedbackTrigger>,
    pub sink: Box<dyn ResultSink>,
    pub clock: Box<dyn Clock>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
