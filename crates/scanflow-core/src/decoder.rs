//! Ordered decode chain per symbology class.
//!
//! - QR: the QR decoder on the working image, nothing else
//! - Linear: the fast native decoder, then deskew + the permissive
//!   multi-format decoder with every format hinted
//!
//! The first success ends the chain and is booked in the pipeline context.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::context::PipelineContext;
use crate::deskew::RotationCorrector;
use crate::diagnostics::Stage;
use crate::frame::Image;
use crate::services::{MultiFormatDecoder, NativeDecoder, QrDecoder};
use crate::symbology::{DecodeHints, SymbologyClass};

/// Which link of the chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecodeStrategy {
    QrRobust,
    FastNative,
    DeskewPermissive,
}

/// Outcome of decoding one candidate.
#[derive(Debug, Clone)]
pub struct DecodeResult {
    pub success: bool,
    /// Decoded text, empty on failure.
    pub text: String,
    /// Symbology label of the decode, or the candidate class label on failure.
    pub symbology: String,
    /// Image the last attempt ran on.
    pub source: Image,
    pub completed_at: Duration,
    pub strategy: Option<DecodeStrategy>,
    /// Rotation applied before the permissive decode, in degrees.
    pub deskew_angle: Option<f64>,
}

impl DecodeResult {
    fn failure(class: SymbologyClass, source: Image, completed_at: Duration, deskew_angle: Option<f64>) -> Self {
        Self {
            success: false,
            text: String::new(),
            symbology: class.label().to_string(),
            source,
            completed_at,
            strategy: None,
            deskew_angle,
        }
    }
}

/// Decoder services used by the chain.
#[derive(Clone, Copy)]
pub struct DecoderSet<'a> {
    pub qr: &'a dyn QrDecoder,
    pub native: &'a dyn NativeDecoder,
    pub multi_format: &'a dyn MultiFormatDecoder,
}

#[derive(Debug, Clone, Default)]
pub struct MultiStrategyDecoder {
    corrector: RotationCorrector,
    hints: DecodeHints,
}

impl MultiStrategyDecoder {
    pub fn new(corrector: RotationCorrector) -> Self {
        Self {
            corrector,
            hints: DecodeHints::all_formats(),
        }
    }

    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }

    /// Run the chain for `class` on the (possibly upscaled) working image.
    pub fn decode(
        &self,
        class: SymbologyClass,
        image: &Image,
        decoders: DecoderSet<'_>,
        ctx: &mut PipelineContext,
    ) -> DecodeResult {
        match class {
            SymbologyClass::Qr => self.decode_qr(image, decoders.qr, ctx),
            SymbologyClass::Linear => self.decode_linear(image, decoders, ctx),
        }
    }

    fn decode_qr(&self, image: &Image, qr: &dyn QrDecoder, ctx: &mut PipelineContext) -> DecodeResult {
        let class = SymbologyClass::Qr;
        if image.is_empty() {
            trace!("empty QR working image");
            return DecodeResult::failure(class, image.clone(), ctx.now(), None);
        }

        match qr.decode(image).filter(|text| !text.is_empty()) {
            Some(text) => {
                let completed_at = ctx.record_success(class);
                debug!(strategy = ?DecodeStrategy::QrRobust, "decoded");
                DecodeResult {
                    success: true,
                    text,
                    symbology: class.label().to_string(),
                    source: image.clone(),
                    completed_at,
                    strategy: Some(DecodeStrategy::QrRobust),
                    deskew_angle: None,
                }
            }
            None => DecodeResult::failure(class, image.clone(), ctx.now(), None),
        }
    }

    fn decode_linear(&self, image: &Image, decoders: DecoderSet<'_>, ctx: &mut PipelineContext) -> DecodeResult {
        let class = SymbologyClass::Linear;

        if let Some(code) = decoders.native.decode(image).filter(|c| !c.text.is_empty()) {
            let completed_at = ctx.record_success(class);
            debug!(strategy = ?DecodeStrategy::FastNative, format = code.format.label(), "decoded");
            return DecodeResult {
                success: true,
                text: code.text,
                symbology: code.format.label().to_string(),
                source: image.clone(),
                completed_at,
                strategy: Some(DecodeStrategy::FastNative),
                deskew_angle: None,
            };
        }

        let deskewed = self.corrector.deskew_with_angle(image);
        let at = ctx.now();
        ctx.diagnostics_mut().record(Stage::Deskewed, &deskewed.image, at);
        trace!(angle = deskewed.angle, "native decode missed, trying deskewed image");

        match decoders
            .multi_format
            .decode(&deskewed.image, &self.hints)
            .filter(|c| !c.text.is_empty())
        {
            Some(code) => {
                let completed_at = ctx.record_success(class);
                debug!(
                    strategy = ?DecodeStrategy::DeskewPermissive,
                    format = code.format.label(),
                    angle = deskewed.angle,
                    "decoded"
                );
                DecodeResult {
                    success: true,
                    text: code.text,
                    symbology: code.format.label().to_string(),
                    source: deskewed.image,
                    completed_at,
                    strategy: Some(DecodeStrategy::DeskewPermissive),
                    deskew_angle: Some(deskewed.angle),
                }
            }
            None => DecodeResult::failure(class, deskewed.image, ctx.now(), Some(deskewed.angle)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Clock, FeedbackTrigger};
    use crate::symbology::{BarcodeFormat, DecodedCode};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Clock0;

    impl Clock for Clock0 {
        fn now(&self) -> Duration {
            Duration::from_millis(7)
        }
    }

    struct Beeps(Rc<Cell<u32>>);

    impl FeedbackTrigger for Beeps {
        fn notify_success(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct Qr(Option<&'static str>);

    impl QrDecoder for Qr {
        fn decode(&self, _image: &Image) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    struct Native(Option<&'static str>, Rc<Cell<u32>>);

    impl NativeDecoder for Native {
        fn decode(&self, _image: &Image) -> Option<DecodedCode> {
            self.1.set(self.1.get() + 1);
            self.0.map(|t| DecodedCode::new(t, BarcodeFormat::Ean13))
        }
    }

    struct Permissive(Option<&'static str>, Rc<Cell<u32>>);

    impl MultiFormatDecoder for Permissive {
        fn decode(&self, _image: &Image, hints: &DecodeHints) -> Option<DecodedCode> {
            assert_eq!(hints.possible_formats.len(), 17);
            self.1.set(self.1.get() + 1);
            self.0.map(|t| DecodedCode::new(t, BarcodeFormat::Code128))
        }
    }

    fn context() -> (PipelineContext, Rc<Cell<u32>>) {
        let beeps = Rc::new(Cell::new(0));
        let ctx = PipelineContext::new(false, false, Box::new(Beeps(beeps.clone())), Box::new(Clock0));
        (ctx, beeps)
    }

    fn crop() -> Image {
        Image::filled(60, 30, [255, 255, 255])
    }

    #[test]
    fn test_qr_success() {
        let (mut ctx, beeps) = context();
        let native_calls = Rc::new(Cell::new(0));
        let decoders = DecoderSet {
            qr: &Qr(Some("ABC123")),
            native: &Native(None, native_calls.clone()),
            multi_format: &Permissive(None, Rc::new(Cell::new(0))),
        };
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Qr, &crop(), decoders, &mut ctx);

        assert!(result.success);
        assert_eq!(result.text, "ABC123");
        assert_eq!(result.symbology, "QR");
        assert_eq!(result.strategy, Some(DecodeStrategy::QrRobust));
        assert_eq!(result.completed_at, Duration::from_millis(7));
        assert_eq!(ctx.successful_detection_count(), 1);
        assert_eq!(beeps.get(), 1);
        assert_eq!(native_calls.get(), 0);
    }

    #[test]
    fn test_qr_empty_text_is_failure() {
        let (mut ctx, beeps) = context();
        let decoders = DecoderSet {
            qr: &Qr(Some("")),
            native: &Native(Some("never"), Rc::new(Cell::new(0))),
            multi_format: &Permissive(Some("never"), Rc::new(Cell::new(0))),
        };
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Qr, &crop(), decoders, &mut ctx);

        assert!(!result.success);
        assert!(result.text.is_empty());
        assert_eq!(result.symbology, "QR");
        assert_eq!(ctx.successful_detection_count(), 0);
        assert_eq!(beeps.get(), 0);
    }

    #[test]
    fn test_qr_empty_image_skips_decoder() {
        let (mut ctx, _) = context();
        let decoders = DecoderSet {
            qr: &Qr(Some("ABC")),
            native: &Native(None, Rc::new(Cell::new(0))),
            multi_format: &Permissive(None, Rc::new(Cell::new(0))),
        };
        let empty = Image::filled(0, 0, [0, 0, 0]);
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Qr, &empty, decoders, &mut ctx);
        assert!(!result.success);
    }

    #[test]
    fn test_linear_native_success_skips_deskew() {
        let (mut ctx, _) = context();
        let permissive_calls = Rc::new(Cell::new(0));
        let decoders = DecoderSet {
            qr: &Qr(None),
            native: &Native(Some("4006381333931"), Rc::new(Cell::new(0))),
            multi_format: &Permissive(Some("other"), permissive_calls.clone()),
        };
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Linear, &crop(), decoders, &mut ctx);

        assert!(result.success);
        assert_eq!(result.text, "4006381333931");
        assert_eq!(result.symbology, "EAN-13");
        assert_eq!(result.strategy, Some(DecodeStrategy::FastNative));
        assert_eq!(result.deskew_angle, None);
        assert_eq!(permissive_calls.get(), 0);
        assert_eq!(ctx.successful_detection_count(), 1);
    }

    #[test]
    fn test_linear_falls_back_to_deskew() {
        let (mut ctx, _) = context();
        let decoders = DecoderSet {
            qr: &Qr(None),
            native: &Native(None, Rc::new(Cell::new(0))),
            multi_format: &Permissive(Some("CODE-128-TEXT"), Rc::new(Cell::new(0))),
        };
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Linear, &crop(), decoders, &mut ctx);

        assert!(result.success);
        assert_eq!(result.symbology, "Code 128");
        assert_eq!(result.strategy, Some(DecodeStrategy::DeskewPermissive));
        assert_eq!(result.deskew_angle, Some(0.0));
        // Reframed onto a square canvas
        assert_eq!((result.source.width, result.source.height), (60, 60));
        assert_eq!(ctx.successful_detection_count(), 1);
    }

    #[test]
    fn test_linear_total_failure() {
        let (mut ctx, beeps) = context();
        let native_calls = Rc::new(Cell::new(0));
        let permissive_calls = Rc::new(Cell::new(0));
        let decoders = DecoderSet {
            qr: &Qr(Some("not used")),
            native: &Native(None, native_calls.clone()),
            multi_format: &Permissive(None, permissive_calls.clone()),
        };
        let result = MultiStrategyDecoder::default().decode(SymbologyClass::Linear, &crop(), decoders, &mut ctx);

        assert!(!result.success);
        assert_eq!(result.symbology, "BAR");
        assert_eq!(native_calls.get(), 1);
        assert_eq!(permissive_calls.get(), 1);
        assert_eq!(ctx.successful_detection_count(), 0);
        assert_eq!(beeps.get(), 0);
    }
}
