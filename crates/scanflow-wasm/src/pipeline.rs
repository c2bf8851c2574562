//! `ScanPipeline`: the full frame pipeline driven from JavaScript.
//!
//! The host supplies its models and decoders as plain JS functions:
//!
//! ```typescript
//! const pipeline = new ScanPipeline({ warmup_frames: 5 }, {
//!   detect: (frame, previewWidth, previewHeight) =>
//!     [{ label: 'QR', confidence: 0.9, x: 40, y: 120, width: 180, height: 180 }],
//!   superResolve: (image) => srModel.run(image),       // optional
//!   decodeQr: (image) => qrReader.decode(image),        // string | null
//!   decodeNative: (image) => nativeReader.decode(image), // { text, format } | null
//!   decodeMultiFormat: (image, hints) => zxing.decode(image, hints),
//!   onSuccess: () => navigator.vibrate(50),             // optional
//!   onDecodeResult: (text, symbology) => { ... },
//!   onOverlayUpdate: (overlays) => drawBoxes(overlays),
//!   now: () => performance.now(),                       // optional, milliseconds
//! }, 390, 844);
//!
//! const summary = pipeline.process_frame(imageData.data, width, height, brightness);
//! ```
//!
//! Images handed to callbacks are `ImageData`-shaped objects
//! (`{ width, height, data: Uint8ClampedArray }`, RGBA). Images returned by
//! `superResolve` may be RGBA or RGB. A callback that throws is logged to the
//! console and counts as a miss.

use std::time::Duration;

use js_sys::{Function, Object, Reflect, Uint8Array, Uint8ClampedArray};
use scanflow_core::diagnostics::Stage;
use scanflow_core::pipeline::CandidateRun;
use scanflow_core::{
    AdmissionHandle, BarcodeFormat, Clock, Collaborators, DecodeHints, DecodeStrategy, DecodedCode,
    DetectionCandidate, FeedbackTrigger, Frame, FrameOutcome, Image, MultiFormatDecoder,
    NativeDecoder, ObjectDetector, OverlayDescriptor, PipelineConfig, PipelineOrchestrator,
    QrDecoder, Rect, ResultSink, Size, SuperResolution, SymbologyClass,
};
use scanflow_core::services::{NoFeedback, NoSuperResolution};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::transform::distance_label;
use crate::types::rgb_to_rgba;

/// A scanning pipeline bound to JS callbacks.
#[wasm_bindgen]
pub struct ScanPipeline {
    inner: PipelineOrchestrator,
    admission: AdmissionHandle,
}

#[wasm_bindgen]
impl ScanPipeline {
    /// Build a pipeline.
    ///
    /// `config` may be `undefined` for defaults or a partial config object.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is malformed or out of range, or a
    /// required callback is missing.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        callbacks: JsValue,
        preview_width: f32,
        preview_height: f32,
    ) -> Result<ScanPipeline, JsValue> {
        let config = parse_config(config)?;
        let collaborators = collaborators_from_js(&callbacks)?;
        let inner = PipelineOrchestrator::new(
            config,
            collaborators,
            Size::new(preview_width, preview_height),
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let admission = inner.admission_handle();
        Ok(ScanPipeline { inner, admission })
    }

    /// Process one RGBA frame and return a summary object.
    ///
    /// `brightness` is the camera's scene brightness; `undefined` counts as dark.
    pub fn process_frame(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        brightness: Option<f64>,
    ) -> Result<JsValue, JsValue> {
        let image = Image::from_rgba(width, height, rgba).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let frame = Frame::new(image, self.inner.context().now(), brightness);
        let outcome = self.inner.process_frame(frame);
        serde_wasm_bindgen::to_value(&FrameSummary::from_outcome(&outcome)).map_err(Into::into)
    }

    /// Update the preview size after a layout change.
    pub fn set_preview_size(&mut self, width: f32, height: f32) {
        self.inner.set_preview_size(Size::new(width, height));
    }

    #[wasm_bindgen(getter)]
    pub fn successful_detection_count(&self) -> f64 {
        self.inner.successful_detection_count() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn frames_admitted(&self) -> f64 {
        self.inner.frames_admitted() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn is_busy(&self) -> bool {
        self.admission.is_busy()
    }

    /// JPEG of the most recent original frame, if any frame got past warm-up.
    pub fn last_original_jpeg(&self, quality: u8) -> Result<Option<Vec<u8>>, JsValue> {
        self.inner
            .snapshot()
            .last_original
            .map(|image| scanflow_core::encode::encode_jpeg(&image, quality))
            .transpose()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// JPEG of a stage snapshot: `original`, `brightness`, `cropped`,
    /// `upscaled`, `super_resolved` or `deskewed`.
    ///
    /// Requires `capture_diagnostics` in the config.
    pub fn export_stage_jpeg(&self, stage: &str, quality: u8) -> Result<Option<Vec<u8>>, JsValue> {
        let stage = parse_stage(stage).ok_or_else(|| JsValue::from_str(&format!("unknown stage `{stage}`")))?;
        self.inner
            .context()
            .diagnostics()
            .export_jpeg(stage, quality)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn parse_config(value: JsValue) -> Result<PipelineConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(PipelineConfig::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_stage(name: &str) -> Option<Stage> {
    match name {
        "original" => Some(Stage::Original),
        "brightness" => Some(Stage::BrightnessApplied),
        "cropped" => Some(Stage::Cropped),
        "upscaled" => Some(Stage::Upscaled),
        "super_resolved" => Some(Stage::SuperResolved),
        "deskewed" => Some(Stage::Deskewed),
        _ => None,
    }
}

fn collaborators_from_js(callbacks: &JsValue) -> Result<Collaborators, JsValue> {
    if !callbacks.is_object() {
        return Err(JsValue::from_str("callbacks must be an object"));
    }

    let super_resolution: Box<dyn SuperResolution> = match optional(callbacks, "superResolve")? {
        Some(f) => Box::new(JsSuperResolution(f)),
        None => Box::new(NoSuperResolution),
    };
    let feedback: Box<dyn FeedbackTrigger> = match optional(callbacks, "onSuccess")? {
        Some(f) => Box::new(JsFeedback(f)),
        None => Box::new(NoFeedback),
    };

    Ok(Collaborators {
        detector: Box::new(JsDetector(required(callbacks, "detect")?)),
        super_resolution,
        qr_decoder: Box::new(JsQrDecoder(required(callbacks, "decodeQr")?)),
        native_decoder: Box::new(JsNativeDecoder(required(callbacks, "decodeNative")?)),
        multi_format_decoder: Box::new(JsMultiFormatDecoder(required(callbacks, "decodeMultiFormat")?)),
        feedback,
        sink: Box::new(JsResultSink {
            on_decode_result: required(callbacks, "onDecodeResult")?,
            on_overlay_update: required(callbacks, "onOverlayUpdate")?,
        }),
        clock: Box::new(JsClock(optional(callbacks, "now")?)),
    })
}

fn optional(callbacks: &JsValue, name: &str) -> Result<Option<Function>, JsValue> {
    let value = Reflect::get(callbacks, &JsValue::from_str(name))?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .dyn_into::<Function>()
        .map(Some)
        .map_err(|_| JsValue::from_str(&format!("callback `{name}` is not a function")))
}

fn required(callbacks: &JsValue, name: &str) -> Result<Function, JsValue> {
    optional(callbacks, name)?.ok_or_else(|| JsValue::from_str(&format!("missing callback `{name}`")))
}

fn console_warn(message: &str, detail: &JsValue) {
    web_sys::console::warn_2(&JsValue::from_str(message), detail);
}

/// The callback's return value, `None` for null/undefined or a throw.
fn returned(name: &str, result: Result<JsValue, JsValue>) -> Option<JsValue> {
    match result {
        Ok(value) if value.is_undefined() || value.is_null() => None,
        Ok(value) => Some(value),
        Err(err) => {
            console_warn(&format!("scanflow: `{name}` threw"), &err);
            None
        }
    }
}

/// `ImageData`-shaped object with RGBA data.
fn image_to_js(image: &Image) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    let data = Uint8ClampedArray::from(rgb_to_rgba(&image.pixels).as_slice());
    Reflect::set(&obj, &"width".into(), &image.width.into())?;
    Reflect::set(&obj, &"height".into(), &image.height.into())?;
    Reflect::set(&obj, &"data".into(), &data)?;
    Ok(obj.into())
}

fn image_from_js(value: &JsValue) -> Option<Image> {
    let width = Reflect::get(value, &"width".into()).ok()?.as_f64()? as u32;
    let height = Reflect::get(value, &"height".into()).ok()?.as_f64()? as u32;
    let data = Reflect::get(value, &"data".into()).ok()?;
    if !data.is_object() {
        return None;
    }
    let bytes = Uint8Array::new(&data).to_vec();
    if bytes.len() == width as usize * height as usize * 4 {
        Image::from_rgba(width, height, &bytes).ok()
    } else {
        Image::new(width, height, bytes).ok()
    }
}

/// Candidate as returned by the `detect` callback.
#[derive(Debug, Clone, Deserialize)]
struct JsCandidate {
    #[serde(alias = "class")]
    label: String,
    confidence: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl From<JsCandidate> for DetectionCandidate {
    fn from(c: JsCandidate) -> Self {
        DetectionCandidate::new(
            SymbologyClass::from_label(&c.label),
            c.confidence,
            Rect::new(c.x, c.y, c.width, c.height),
        )
    }
}

/// Decode as returned by the native and multi-format callbacks.
/// `format` is the reader's format index.
#[derive(Debug, Clone, Deserialize)]
struct JsDecoded {
    text: String,
    #[serde(default)]
    format: u32,
}

impl From<JsDecoded> for DecodedCode {
    fn from(d: JsDecoded) -> Self {
        DecodedCode::new(d.text, BarcodeFormat::from_index(d.format))
    }
}

fn decoded_from_js(name: &str, value: JsValue) -> Option<DecodedCode> {
    match serde_wasm_bindgen::from_value::<JsDecoded>(value) {
        Ok(decoded) => Some(decoded.into()),
        Err(e) => {
            console_warn(&format!("scanflow: `{name}` returned a malformed result"), &e.into());
            None
        }
    }
}

struct JsDetector(Function);

impl ObjectDetector for JsDetector {
    fn detect(&self, frame: &Image, preview: Size) -> Option<Vec<DetectionCandidate>> {
        let image = image_to_js(frame).ok()?;
        let value = returned(
            "detect",
            self.0
                .call3(&JsValue::NULL, &image, &preview.width.into(), &preview.height.into()),
        )?;
        match serde_wasm_bindgen::from_value::<Vec<JsCandidate>>(value) {
            Ok(candidates) => Some(candidates.into_iter().map(DetectionCandidate::from).collect()),
            Err(e) => {
                console_warn("scanflow: `detect` returned malformed candidates", &e.into());
                None
            }
        }
    }
}

struct JsSuperResolution(Function);

impl SuperResolution for JsSuperResolution {
    fn enhance(&self, image: &Image) -> Option<Image> {
        let arg = image_to_js(image).ok()?;
        let value = returned("superResolve", self.0.call1(&JsValue::NULL, &arg))?;
        image_from_js(&value)
    }
}

struct JsQrDecoder(Function);

impl QrDecoder for JsQrDecoder {
    fn decode(&self, image: &Image) -> Option<String> {
        let arg = image_to_js(image).ok()?;
        returned("decodeQr", self.0.call1(&JsValue::NULL, &arg))?.as_string()
    }
}

struct JsNativeDecoder(Function);

impl NativeDecoder for JsNativeDecoder {
    fn decode(&self, image: &Image) -> Option<DecodedCode> {
        let arg = image_to_js(image).ok()?;
        let value = returned("decodeNative", self.0.call1(&JsValue::NULL, &arg))?;
        decoded_from_js("decodeNative", value)
    }
}

struct JsMultiFormatDecoder(Function);

impl MultiFormatDecoder for JsMultiFormatDecoder {
    fn decode(&self, image: &Image, hints: &DecodeHints) -> Option<DecodedCode> {
        let arg = image_to_js(image).ok()?;
        let hints = serde_wasm_bindgen::to_value(hints).ok()?;
        let value = returned("decodeMultiFormat", self.0.call2(&JsValue::NULL, &arg, &hints))?;
        decoded_from_js("decodeMultiFormat", value)
    }
}

struct JsFeedback(Function);

impl FeedbackTrigger for JsFeedback {
    fn notify_success(&self) {
        returned("onSuccess", self.0.call0(&JsValue::NULL));
    }
}

struct JsResultSink {
    on_decode_result: Function,
    on_overlay_update: Function,
}

impl ResultSink for JsResultSink {
    fn on_decode_result(&self, text: &str, symbology: &str) {
        returned(
            "onDecodeResult",
            self.on_decode_result
                .call2(&JsValue::NULL, &text.into(), &symbology.into()),
        );
    }

    fn on_overlay_update(&self, overlays: Vec<OverlayDescriptor>) {
        let boxes: Vec<JsOverlay> = overlays.iter().map(JsOverlay::from).collect();
        match serde_wasm_bindgen::to_value(&boxes) {
            Ok(value) => {
                returned("onOverlayUpdate", self.on_overlay_update.call1(&JsValue::NULL, &value));
            }
            Err(e) => console_warn("scanflow: overlay serialization failed", &e.into()),
        }
    }
}

/// Milliseconds from the `now` callback, or `Date.now()`.
struct JsClock(Option<Function>);

impl Clock for JsClock {
    fn now(&self) -> Duration {
        let millis = self
            .0
            .as_ref()
            .and_then(|f| returned("now", f.call0(&JsValue::NULL)))
            .and_then(|v| v.as_f64())
            .unwrap_or_else(js_sys::Date::now);
        millis_to_duration(millis)
    }
}

fn millis_to_duration(millis: f64) -> Duration {
    if millis.is_finite() && millis > 0.0 {
        Duration::from_secs_f64(millis / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn duration_millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Overlay box in the shape canvas code wants.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct JsOverlay {
    label: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    /// CSS color, fully transparent for failed candidates.
    color: String,
    font_size: f32,
    font_weight: String,
}

impl From<&OverlayDescriptor> for JsOverlay {
    fn from(o: &OverlayDescriptor) -> Self {
        Self {
            label: o.label.clone(),
            x: o.rect.x,
            y: o.rect.y,
            width: o.rect.width,
            height: o.rect.height,
            color: o.color.to_hex(),
            font_size: o.font.size,
            font_weight: format!("{:?}", o.font.weight).to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CandidateSummary {
    success: bool,
    text: String,
    symbology: String,
    class: &'static str,
    confidence: f32,
    distance: &'static str,
    strategy: Option<DecodeStrategy>,
    deskew_angle: Option<f64>,
    upscale_ms: f64,
    super_resolution_ms: f64,
    decode_ms: f64,
}

impl From<&CandidateRun> for CandidateSummary {
    fn from(run: &CandidateRun) -> Self {
        Self {
            success: run.result.success,
            text: run.result.text.clone(),
            symbology: run.result.symbology.clone(),
            class: run.candidate.class.label(),
            confidence: run.candidate.confidence,
            distance: distance_label(run.distance),
            strategy: run.result.strategy,
            deskew_angle: run.result.deskew_angle,
            upscale_ms: duration_millis(run.timings.upscale),
            super_resolution_ms: duration_millis(run.timings.super_resolution),
            decode_ms: duration_millis(run.timings.decode),
        }
    }
}

/// What `process_frame` returns to JS.
#[derive(Debug, Clone, Serialize)]
struct FrameSummary {
    frame_index: f64,
    warming_up: bool,
    enhanced: bool,
    skipped: u32,
    results: Vec<CandidateSummary>,
    enhancement_ms: f64,
    detection_ms: f64,
    total_ms: f64,
}

impl FrameSummary {
    fn from_outcome(outcome: &FrameOutcome) -> Self {
        match outcome {
            FrameOutcome::WarmingUp { frame_index } => Self {
                frame_index: *frame_index as f64,
                warming_up: true,
                enhanced: false,
                skipped: 0,
                results: Vec::new(),
                enhancement_ms: 0.0,
                detection_ms: 0.0,
                total_ms: 0.0,
            },
            FrameOutcome::Processed(run) => Self {
                frame_index: run.frame_index as f64,
                warming_up: false,
                enhanced: run.enhanced,
                skipped: u32::try_from(run.skipped).unwrap_or(u32::MAX),
                results: run.candidates.iter().map(CandidateSummary::from).collect(),
                enhancement_ms: duration_millis(run.timings.enhancement),
                detection_ms: duration_millis(run.timings.detection),
                total_ms: duration_millis(run.timings.total),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanflow_core::decoder::DecodeResult;
    use scanflow_core::pipeline::{CandidateTimings, FrameTimings, PipelineRun};
    use scanflow_core::{DistanceClass, OverlayConfig};

    fn qr_candidate() -> DetectionCandidate {
        DetectionCandidate::new(SymbologyClass::Qr, 0.87, Rect::new(10.0, 20.0, 100.0, 100.0))
    }

    #[test]
    fn test_js_candidate_conversion() {
        let candidate: DetectionCandidate = JsCandidate {
            label: "BAR".into(),
            confidence: 1.4,
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        }
        .into();
        assert_eq!(candidate.class, SymbologyClass::Linear);
        assert_eq!(candidate.confidence, 1.0);
        assert_eq!(candidate.rect, Rect::new(1.0, 2.0, 3.0, 4.0));
        assert!(candidate.crop.is_none());
    }

    #[test]
    fn test_js_decoded_conversion_unknown_format() {
        let code: DecodedCode = JsDecoded {
            text: "12345".into(),
            format: 999,
        }
        .into();
        assert_eq!(code.text, "12345");
        assert_eq!(code.format, BarcodeFormat::from_index(999));
    }

    #[test]
    fn test_overlay_shape() {
        let descriptor = OverlayDescriptor::for_candidate(
            &qr_candidate(),
            Size::new(390.0, 844.0),
            true,
            &OverlayConfig::default(),
        );
        let overlay = JsOverlay::from(&descriptor);
        assert_eq!(overlay.label, "QR  (87%)");
        assert_eq!(overlay.color, "#32D74B");
        assert_eq!(overlay.font_size, 14.0);
        assert_eq!(overlay.font_weight, "medium");
        assert_eq!((overlay.x, overlay.y), (10.0, 20.0));
    }

    #[test]
    fn test_failed_overlay_is_transparent() {
        let descriptor = OverlayDescriptor::for_candidate(
            &qr_candidate(),
            Size::new(390.0, 844.0),
            false,
            &OverlayConfig::default(),
        );
        assert_eq!(JsOverlay::from(&descriptor).color, "#00000000");
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("original"), Some(Stage::Original));
        assert_eq!(parse_stage("deskewed"), Some(Stage::Deskewed));
        assert_eq!(parse_stage("Deskewed"), None);
    }

    #[test]
    fn test_warming_up_summary() {
        let summary = FrameSummary::from_outcome(&FrameOutcome::WarmingUp { frame_index: 3 });
        assert!(summary.warming_up);
        assert_eq!(summary.frame_index, 3.0);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_processed_summary() {
        let run = PipelineRun {
            frame_index: 9,
            enhanced: true,
            candidates: vec![CandidateRun {
                candidate: qr_candidate(),
                distance: DistanceClass::Far,
                result: DecodeResult {
                    success: true,
                    text: "hello".into(),
                    symbology: "QR".into(),
                    source: Image::filled(2, 2, [0, 0, 0]),
                    completed_at: Duration::from_millis(40),
                    strategy: Some(DecodeStrategy::QrRobust),
                    deskew_angle: None,
                },
                timings: CandidateTimings {
                    upscale: Duration::from_millis(3),
                    super_resolution: Duration::from_millis(12),
                    decode: Duration::from_millis(5),
                },
            }],
            skipped: 1,
            overlays: Vec::new(),
            timings: FrameTimings {
                enhancement: Duration::from_millis(2),
                detection: Duration::from_millis(20),
                total: Duration::from_millis(45),
            },
        };

        let summary = FrameSummary::from_outcome(&FrameOutcome::Processed(run));
        assert!(!summary.warming_up);
        assert!(summary.enhanced);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_ms, 45.0);

        let result = &summary.results[0];
        assert!(result.success);
        assert_eq!(result.text, "hello");
        assert_eq!(result.class, "QR");
        assert_eq!(result.distance, "far");
        assert_eq!(result.strategy, Some(DecodeStrategy::QrRobust));
        assert_eq!(result.super_resolution_ms, 12.0);
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(1500.0), Duration::from_millis(1500));
        assert_eq!(millis_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(millis_to_duration(-4.0), Duration::ZERO);
    }
}
