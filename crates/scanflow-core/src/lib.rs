//! ScanFlow Core - camera-frame code scanning pipeline
//!
//! This crate turns camera frames into decoded QR and barcode results:
//! low-light enhancement, detector-driven candidate extraction, near/far
//! classification, upscaling, deskewing and a multi-strategy decode chain.
//!
//! Detection and super-resolution models and the symbology decoders are
//! external services, plugged in through the traits in [`services`].

pub mod config;
pub mod context;
pub mod decoder;
pub mod deskew;
pub mod diagnostics;
pub mod distance;
pub mod encode;
pub mod enhance;
pub mod frame;
pub mod luminance;
pub mod overlay;
pub mod pipeline;
pub mod services;
pub mod symbology;
pub mod transform;
pub mod upscale;

pub use config::{ConfigError, PipelineConfig};
pub use context::{PipelineContext, PipelineCounters, PipelineSnapshot};
pub use decoder::{DecodeResult, DecodeStrategy, MultiStrategyDecoder};
pub use deskew::{DeskewConfig, RotationCorrector};
pub use distance::{DistanceClass, DistanceClassifier, DistanceConfig};
pub use enhance::{EnhancerConfig, FrameEnhancer};
pub use frame::{FilterType, Frame, Image, ImageError, Rect, Size};
pub use overlay::{OverlayConfig, OverlayDescriptor, Rgba};
pub use pipeline::{AdmissionHandle, FrameOutcome, PipelineOrchestrator, PipelineRun};
pub use services::{
    Clock, Collaborators, DetectionCandidate, FeedbackTrigger, MultiFormatDecoder, NativeDecoder,
    ObjectDetector, QrDecoder, ResultSink, SuperResolution, SystemClock,
};
pub use symbology::{BarcodeFormat, DecodeHints, DecodedCode, SymbologyClass};
pub use upscale::{ImageUpscaler, UpscaleConfig};
