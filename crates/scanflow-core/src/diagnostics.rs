//! Per-stage image snapshots for debugging a scan session.
//!
//! When enabled, the recorder keeps the most recent image and timestamp for
//! every pipeline stage. Disabled recorders store nothing and cost a branch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encode::{encode_jpeg, EncodeError};
use crate::frame::Image;
use crate::symbology::SymbologyClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Original,
    BrightnessApplied,
    Cropped,
    Upscaled,
    SuperResolved,
    Deskewed,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Original,
        Stage::BrightnessApplied,
        Stage::Cropped,
        Stage::Upscaled,
        Stage::SuperResolved,
        Stage::Deskewed,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
pub struct StageCapture {
    pub image: Image,
    pub at: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticsRecorder {
    enabled: bool,
    captures: [Option<StageCapture>; 6],
    last_code_class: Option<SymbologyClass>,
}

impl DiagnosticsRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Store a copy of `image` for `stage`, replacing the previous one.
    pub fn record(&mut self, stage: Stage, image: &Image, at: Duration) {
        if !self.enabled {
            return;
        }
        self.captures[stage.index()] = Some(StageCapture {
            image: image.clone(),
            at,
        });
    }

    pub fn capture(&self, stage: Stage) -> Option<&StageCapture> {
        self.captures[stage.index()].as_ref()
    }

    /// Class of the last successfully decoded code.
    pub fn last_code_class(&self) -> Option<SymbologyClass> {
        self.last_code_class
    }

    pub fn set_last_code_class(&mut self, class: SymbologyClass) {
        if self.enabled {
            self.last_code_class = Some(class);
        }
    }

    pub fn clear(&mut self) {
        self.captures = Default::default();
        self.last_code_class = None;
    }

    /// JPEG bytes of a stage snapshot, or `None` if the stage was not captured.
    pub fn export_jpeg(&self, stage: Stage, quality: u8) -> Result<Option<Vec<u8>>, EncodeError> {
        self.capture(stage)
            .map(|c| encode_jpeg(&c.image, quality))
            .transpose()
    }
}
