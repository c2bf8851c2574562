//! Per-pipeline shared state: counters, feedback, clock and snapshots.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::diagnostics::DiagnosticsRecorder;
use crate::frame::Image;
use crate::services::{Clock, FeedbackTrigger};
use crate::symbology::SymbologyClass;

/// Monotonic pipeline counters. Reset only by constructing a new pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    successful_detection_count: u64,
}

impl PipelineCounters {
    pub fn successful_detection_count(&self) -> u64 {
        self.successful_detection_count
    }

    /// Count one confirmed decode and return the new total.
    pub fn record_success(&mut self) -> u64 {
        self.successful_detection_count = self.successful_detection_count.saturating_add(1);
        self.successful_detection_count
    }
}

/// Immutable view of the context handed to consumers.
#[derive(Debug, Clone)]
pub struct PipelineSnapshot {
    pub successful_detection_count: u64,
    pub last_original: Option<Arc<Image>>,
}

pub struct PipelineContext {
    counters: PipelineCounters,
    production: bool,
    feedback: Box<dyn FeedbackTrigger>,
    clock: Box<dyn Clock>,
    diagnostics: DiagnosticsRecorder,
    last_original: Option<Arc<Image>>,
}

impl PipelineContext {
    pub fn new(
        production: bool,
        capture_diagnostics: bool,
        feedback: Box<dyn FeedbackTrigger>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            counters: PipelineCounters::default(),
            production,
            feedback,
            clock,
            diagnostics: DiagnosticsRecorder::new(capture_diagnostics),
            last_original: None,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    pub fn successful_detection_count(&self) -> u64 {
        self.counters.successful_detection_count()
    }

    /// Book a confirmed decode: bump the counter, fire feedback outside
    /// production, and return the completion time.
    pub fn record_success(&mut self, class: SymbologyClass) -> Duration {
        let count = self.counters.record_success();
        if !self.production {
            self.feedback.notify_success();
        }
        self.diagnostics.set_last_code_class(class);
        debug!(count, "successful detection");
        self.clock.now()
    }

    pub fn set_last_original(&mut self, image: Arc<Image>) {
        self.last_original = Some(image);
    }

    pub fn last_original(&self) -> Option<Arc<Image>> {
        self.last_original.clone()
    }

    pub fn diagnostics(&self) -> &DiagnosticsRecorder {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticsRecorder {
        &mut self.diagnostics
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            successful_detection_count: self.counters.successful_detection_count(),
            last_original: self.last_original.clone(),
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("counters", &self.counters)
            .field("production", &self.production)
            .field("diagnostics", &self.diagnostics.is_enabled())
            .finish_non_exhaustive()
    }
}
