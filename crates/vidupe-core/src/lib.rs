//! Core types and traits for vidupe.
//!
//! This crate provides the data model shared by every stage of duplicate
//! video detection: media file records, detection groups, configuration,
//! the error taxonomy, the injected progress [`Reporter`], and the ports
//! through which external media tools are reached.

mod config;
mod error;
mod group;
mod inventory;
mod media;
mod ports;
mod reporter;

pub use config::{
    ConfigError, DetectionConfig, DetectionConfigBuilder, InventoryConfig, InventoryConfigBuilder,
    DEFAULT_VIDEO_EXTENSIONS, normalize_extension,
};
pub use error::{FileWarning, InventoryError, SignalError, WarningKind};
pub use group::{DetectionGroup, DetectionMethod, GroupKey};
pub use inventory::{Inventory, InventoryStats};
pub use media::{ContentHash, MediaFile, VisualSignature};
pub use ports::{DurationProber, FrameSampler};
pub use reporter::{
    DetectionEvent, NullReporter, RecordingReporter, Reporter, Stage, TracingReporter,
    default_reporter,
};
