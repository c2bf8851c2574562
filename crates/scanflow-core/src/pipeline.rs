//! Per-frame orchestration.
//!
//! ```text
//! Frame -> enhance -> detect -> for each candidate:
//!     crop -> classify distance -> upscale -> decode chain
//! -> decode callbacks (detector order) -> one overlay update
//! ```
//!
//! Frames are processed one at a time: `process_frame` takes `&mut self`.
//! A frame source running elsewhere can watch the [`AdmissionHandle`] and
//! drop frames while a run is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::{ConfigError, PipelineConfig};
use crate::context::{PipelineContext, PipelineSnapshot};
use crate::decoder::{DecodeResult, DecoderSet, MultiStrategyDecoder};
use crate::deskew::RotationCorrector;
use crate::diagnostics::Stage;
use crate::distance::{DistanceClass, DistanceClassifier};
use crate::enhance::FrameEnhancer;
use crate::frame::{Frame, Image, Size};
use crate::overlay::OverlayDescriptor;
use crate::services::{
    Collaborators, DetectionCandidate, MultiFormatDecoder, NativeDecoder, ObjectDetector,
    QrDecoder, ResultSink, SuperResolution,
};
use crate::transform::crop_preview_rect;
use crate::upscale::ImageUpscaler;

/// Timings of one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandidateTimings {
    pub upscale: Duration,
    pub super_resolution: Duration,
    pub decode: Duration,
}

/// Frame-level timings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTimings {
    pub enhancement: Duration,
    pub detection: Duration,
    pub total: Duration,
}

/// One processed candidate.
#[derive(Debug, Clone)]
pub struct CandidateRun {
    pub candidate: DetectionCandidate,
    pub distance: DistanceClass,
    pub result: DecodeResult,
    pub timings: CandidateTimings,
}

/// Everything one processed frame produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub frame_index: u64,
    pub enhanced: bool,
    /// Candidates in detector order, degenerate ones excluded.
    pub candidates: Vec<CandidateRun>,
    /// Candidates dropped for degenerate geometry.
    pub skipped: usize,
    pub overlays: Vec<OverlayDescriptor>,
    pub timings: FrameTimings,
}

impl PipelineRun {
    pub fn successes(&self) -> impl Iterator<Item = &CandidateRun> {
        self.candidates.iter().filter(|c| c.result.success)
    }
}

#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Discarded while the camera settles.
    WarmingUp { frame_index: u64 },
    Processed(PipelineRun),
}

/// Read side of the single-flight flag.
#[derive(Debug, Clone)]
pub struct AdmissionHandle {
    busy: Arc<AtomicBool>,
}

impl AdmissionHandle {
    /// True while a frame is being processed.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether a frame offered now would be processed immediately.
    pub fn should_admit(&self) -> bool {
        !self.is_busy()
    }
}

/// Holds the busy flag for the duration of a run.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn enter(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    enhancer: FrameEnhancer,
    classifier: DistanceClassifier,
    upscaler: ImageUpscaler,
    decoder: MultiStrategyDecoder,
    detector: Box<dyn ObjectDetector>,
    super_resolution: Box<dyn SuperResolution>,
    qr_decoder: Box<dyn QrDecoder>,
    native_decoder: Box<dyn NativeDecoder>,
    multi_format_decoder: Box<dyn MultiFormatDecoder>,
    sink: Box<dyn ResultSink>,
    context: PipelineContext,
    preview: Size,
    frames_admitted: u64,
    busy: Arc<AtomicBool>,
}

impl PipelineOrchestrator {
    /// Build a pipeline. Counters start at zero.
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        preview: Size,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let Collaborators {
            detector,
            super_resolution,
            qr_decoder,
            native_decoder,
            multi_format_decoder,
            feedback,
            sink,
            clock,
        } = collaborators;

        Ok(Self {
            enhancer: FrameEnhancer::new(config.enhancer.clone()),
            classifier: DistanceClassifier::new(config.distance.clone()),
            upscaler: ImageUpscaler::new(config.upscale.clone()),
            decoder: MultiStrategyDecoder::new(RotationCorrector::new(config.deskew.clone())),
            context: PipelineContext::new(
                config.production,
                config.capture_diagnostics,
                feedback,
                clock,
            ),
            config,
            detector,
            super_resolution,
            qr_decoder,
            native_decoder,
            multi_format_decoder,
            sink,
            preview,
            frames_admitted: 0,
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn preview_size(&self) -> Size {
        self.preview
    }

    pub fn set_preview_size(&mut self, preview: Size) {
        self.preview = preview;
    }

    pub fn successful_detection_count(&self) -> u64 {
        self.context.successful_detection_count()
    }

    pub fn frames_admitted(&self) -> u64 {
        self.frames_admitted
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.context.snapshot()
    }

    pub fn admission_handle(&self) -> AdmissionHandle {
        AdmissionHandle {
            busy: Arc::clone(&self.busy),
        }
    }

    /// Run one frame through the pipeline and report it to the result sink.
    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        let _in_flight = InFlight::enter(&self.busy);

        self.frames_admitted += 1;
        let frame_index = self.frames_admitted;
        if frame_index <= self.config.warmup_frames as u64 {
            trace!(frame_index, "warm-up frame discarded");
            return FrameOutcome::WarmingUp { frame_index };
        }

        let started = self.context.now();
        let brightness = frame.brightness_or_zero();
        let original = Arc::new(frame.image);
        self.context.set_last_original(Arc::clone(&original));
        self.context
            .diagnostics_mut()
            .record(Stage::Original, &original, frame.captured_at);

        // Enhance
        let enhanced_flag = self.enhancer.should_enhance(brightness);
        let enhanced = self.enhancer.enhance(&original, brightness);
        let enhanced_at = self.context.now();
        if enhanced_flag {
            self.context
                .diagnostics_mut()
                .record(Stage::BrightnessApplied, &enhanced, enhanced_at);
        }

        // Detect
        let preview = self.preview;
        let detections = if enhanced.is_consistent() {
            self.detector.detect(&enhanced, preview).unwrap_or_default()
        } else {
            // Reported like a frame with nothing in view
            warn!(
                frame_index,
                width = enhanced.width,
                height = enhanced.height,
                len = enhanced.pixels.len(),
                "skipping detection on malformed frame"
            );
            Vec::new()
        };
        let detected_at = self.context.now();
        debug!(
            frame_index,
            brightness,
            enhanced = enhanced_flag,
            candidates = detections.len(),
            "frame detected"
        );

        let mut candidates = Vec::with_capacity(detections.len());
        let mut overlays = Vec::with_capacity(detections.len());
        let mut skipped = 0;

        for candidate in detections {
            let Some(crop) = resolve_crop(&candidate, &enhanced, preview) else {
                warn!(rect = ?candidate.rect, class = ?candidate.class, "skipping degenerate candidate");
                skipped += 1;
                continue;
            };
            let cropped_at = self.context.now();
            self.context
                .diagnostics_mut()
                .record(Stage::Cropped, &crop, cropped_at);

            // Crop size in preview units
            let (crop_w, crop_h) = (
                crop.width as f32 * preview.width / enhanced.width.max(1) as f32,
                crop.height as f32 * preview.height / enhanced.height.max(1) as f32,
            );
            let distance = self.classifier.classify(
                candidate.class,
                crop_w,
                crop_h,
                preview.width,
                preview.height,
            );

            let upscaled = self.upscaler.upscale(
                &crop,
                candidate.class,
                distance,
                self.super_resolution.as_ref(),
                self.context.clock(),
            );
            let upscaled_at = self.context.now();
            if let Some(geometric) = &upscaled.geometric {
                self.context
                    .diagnostics_mut()
                    .record(Stage::Upscaled, geometric, upscaled_at);
            }
            if upscaled.super_resolved {
                self.context
                    .diagnostics_mut()
                    .record(Stage::SuperResolved, &upscaled.image, upscaled_at);
            }

            let decoders = DecoderSet {
                qr: self.qr_decoder.as_ref(),
                native: self.native_decoder.as_ref(),
                multi_format: self.multi_format_decoder.as_ref(),
            };
            let decode_started = self.context.now();
            let result = self
                .decoder
                .decode(candidate.class, &upscaled.image, decoders, &mut self.context);
            let decode_time = self.context.now().saturating_sub(decode_started);

            debug!(
                class = ?candidate.class,
                distance = ?distance,
                success = result.success,
                strategy = ?result.strategy,
                angle = ?result.deskew_angle,
                count = self.context.successful_detection_count(),
                "candidate done"
            );

            self.sink.on_decode_result(&result.text, &result.symbology);
            overlays.push(OverlayDescriptor::for_candidate(
                &candidate,
                preview,
                result.success,
                &self.config.overlay,
            ));
            candidates.push(CandidateRun {
                candidate,
                distance,
                result,
                timings: CandidateTimings {
                    upscale: upscaled.upscale_time,
                    super_resolution: upscaled.super_resolution_time,
                    decode: decode_time,
                },
            });
        }

        if candidates.is_empty() {
            self.sink.on_decode_result("", "");
        }
        self.sink.on_overlay_update(overlays.clone());

        FrameOutcome::Processed(PipelineRun {
            frame_index,
            enhanced: enhanced_flag,
            candidates,
            skipped,
            overlays,
            timings: FrameTimings {
                enhancement: enhanced_at.saturating_sub(started),
                detection: detected_at.saturating_sub(enhanced_at),
                total: self.context.now().saturating_sub(started),
            },
        })
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("preview", &self.preview)
            .field("frames_admitted", &self.frames_admitted)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// The candidate's crop, or the region of `frame` under its rect.
///
/// `None` marks degenerate geometry: an invalid rect, or a crop with no area.
fn resolve_crop(candidate: &DetectionCandidate, frame: &Image, preview: Size) -> Option<Image> {
    if !candidate.rect.is_valid() {
        return None;
    }
    match &candidate.crop {
        Some(crop) if !crop.is_empty() && crop.is_consistent() => Some(crop.clone()),
        Some(_) => None,
        None => crop_preview_rect(frame, &candidate.rect, preview),
    }
}
