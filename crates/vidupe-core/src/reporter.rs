//! Progress and diagnostics sink passed to each pipeline component.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::FileWarning;

/// A stage of the pipeline, used to attribute progress and skipped files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Stage {
    #[strum(to_string = "inventory")]
    Inventory,
    #[strum(to_string = "size grouping")]
    Size,
    #[strum(to_string = "content hashing")]
    Hash,
    #[strum(to_string = "name comparison")]
    Name,
    #[strum(to_string = "duration probing")]
    Probe,
    #[strum(to_string = "duration grouping")]
    DurationGrouping,
    #[strum(to_string = "frame extraction")]
    FrameExtraction,
    #[strum(to_string = "frame comparison")]
    FrameComparison,
    #[strum(to_string = "resolution")]
    Resolution,
}

/// Something a component wants its caller to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionEvent {
    /// A stage began; `total` is the number of items it will visit.
    StageStarted { stage: Stage, total: usize },
    /// One item of a stage was handled.
    Advanced { stage: Stage, path: PathBuf },
    /// A file was left out of a stage.
    Skipped { stage: Stage, warning: FileWarning },
    /// Two files' frame sequences were scored.
    Compared {
        left: PathBuf,
        right: PathBuf,
        score: f64,
    },
    /// A stage ended.
    StageFinished {
        stage: Stage,
        groups: usize,
        skipped: usize,
    },
}

/// Receiver of pipeline events.
pub trait Reporter: Send + Sync {
    /// Handle one event.
    fn report(&self, event: DetectionEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: DetectionEvent) {
        match event {
            DetectionEvent::StageStarted { stage, total } => {
                info!(%stage, total, "stage started");
            }
            DetectionEvent::Advanced { stage, path } => {
                debug!(%stage, path = %path.display(), "processing");
            }
            DetectionEvent::Skipped { stage, warning } => {
                warn!(%stage, path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
            }
            DetectionEvent::Compared { left, right, score } => {
                debug!(left = %left.display(), right = %right.display(), score, "frame similarity");
            }
            DetectionEvent::StageFinished {
                stage,
                groups,
                skipped,
            } => {
                info!(%stage, groups, skipped, "stage finished");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: DetectionEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<DetectionEvent>>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<DetectionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Warnings reported as skipped for one stage.
    pub fn skipped(&self, stage: Stage) -> Vec<FileWarning> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DetectionEvent::Skipped { stage: s, warning } if s == stage => Some(warning),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: DetectionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// The reporter components use when none is injected.
pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(TracingReporter)
}
