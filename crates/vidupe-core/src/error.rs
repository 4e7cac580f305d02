//! Error types for inventory building and per-file signal extraction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort building an inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Permission denied for the root path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Root path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl InventoryError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Failure to obtain a signal (digest, duration, frames) for one file.
///
/// Detection methods turn these into [`FileWarning`]s; they never abort a pass.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Reading the file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation did not finish in time.
    #[error("Timed out after {}s: {path}", after.as_secs_f64())]
    Timeout { path: PathBuf, after: Duration },

    /// The external tool could not be started.
    #[error("{tool} could not be started: {source}")]
    ToolMissing {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{tool} failed on {path} ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// The tool ran but its output was unusable.
    #[error("Unusable output for {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl SignalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error with path context.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify this error, falling back to `fallback` for tool-specific failures.
    pub fn warning_kind(&self, fallback: WarningKind) -> WarningKind {
        match self {
            Self::Timeout { .. } => WarningKind::Timeout,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                WarningKind::PermissionDenied
            }
            Self::Io { .. } => WarningKind::ReadError,
            Self::ToolMissing { .. } | Self::ToolFailed { .. } | Self::Parse { .. } => fallback,
        }
    }
}

/// Kind of per-file warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading metadata.
    MetadataError,
    /// Error reading file contents or a directory.
    ReadError,
    /// A bounded operation expired.
    Timeout,
    /// The duration could not be probed.
    ProbeFailed,
    /// Frames could not be decoded.
    DecodeFailed,
    /// The video is too short for frame sampling.
    TooShort,
    /// A planned removal failed.
    RemoveFailed,
}

/// Non-fatal problem with a single file; the file is excluded from one stage only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl FileWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from a signal failure.
    pub fn from_signal(path: &Path, error: &SignalError, fallback: WarningKind) -> Self {
        Self::new(path, error.to_string(), error.warning_kind(fallback))
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let kind = if error.kind() == std::io::ErrorKind::PermissionDenied {
            WarningKind::PermissionDenied
        } else {
            WarningKind::ReadError
        };
        Self::new(path, format!("Read error: {error}"), kind)
    }

    /// Create a warning for a video shorter than the sampling floor.
    pub fn too_short(path: impl Into<PathBuf>, duration: Option<f64>, floor: f64) -> Self {
        let message = match duration {
            Some(secs) => format!("Too short for frame sampling ({secs:.1}s < {floor:.1}s)"),
            None => "Duration unknown, cannot place sampling window".to_string(),
        };
        Self::new(path, message, WarningKind::TooShort)
    }
}
