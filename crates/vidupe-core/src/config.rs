//! Inventory and detection configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extensions treated as video when none are configured.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".m4v", ".ts", ".webm", ".mpg", ".mpeg",
    ".3gp", ".f4v", ".asf", ".rm", ".rmvb",
];

/// Invalid detection settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A similarity threshold lies outside [0, 1].
    #[error("{field} must be between 0 and 1, got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    /// A length of time is negative, zero where forbidden, or not finite.
    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidSeconds { field: &'static str, value: f64 },

    /// A size must be non-zero.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    /// No extensions to match.
    #[error("At least one file extension is required")]
    NoExtensions,
}

/// Lower-case an extension and make sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Configuration for building a media inventory.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct InventoryConfig {
    /// Root directory to walk.
    pub root: PathBuf,

    /// Extensions (with leading dot) to keep, compared case-insensitively.
    #[builder(default = "default_extensions()")]
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Number of threads for walking (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,
}

fn default_true() -> bool {
    true
}

impl InventoryConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref extensions) = self.extensions {
            if extensions.is_empty() {
                return Err(ConfigError::NoExtensions.to_string());
            }
        }
        Ok(())
    }
}

impl InventoryConfig {
    /// Create a new inventory config builder.
    pub fn builder() -> InventoryConfigBuilder {
        InventoryConfigBuilder::default()
    }

    /// Create a config for walking a path with the default extensions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: default_extensions(),
            follow_symlinks: false,
            include_hidden: true,
            threads: 0,
        }
    }

    /// Replace the extension set, normalizing each entry.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| e.len() > 1)
            .collect();
        self
    }

    /// Check whether a path carries one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = normalize_extension(&ext.to_string_lossy());
        self.extensions
            .iter()
            .any(|configured| configured.eq_ignore_ascii_case(&ext))
    }
}

/// Thresholds, windows and timeouts for the detection methods.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum name similarity ratio for the name method.
    #[builder(default = "0.8")]
    pub name_similarity: f64,

    /// Maximum duration difference in seconds for the duration method.
    #[builder(default = "3.0")]
    pub duration_tolerance: f64,

    /// Minimum mean frame correlation for the visual refiner.
    #[builder(default = "0.8")]
    pub frame_similarity: f64,

    /// Length in seconds of the sampling window starting at the midpoint.
    #[builder(default = "5.0")]
    pub extract_seconds: f64,

    /// Videos shorter than this many seconds are not sampled.
    #[builder(default = "10.0")]
    pub min_visual_duration: f64,

    /// Edge length of the square grayscale thumbnails.
    #[builder(default = "64")]
    pub thumbnail_size: u32,

    /// Read buffer size for content hashing.
    #[builder(default = "8192")]
    pub hash_buffer_size: usize,

    /// Upper bound for hashing a single file, in seconds.
    #[builder(default = "600")]
    pub hash_timeout_secs: u64,

    /// Upper bound for probing a single file, in seconds.
    #[builder(default = "30")]
    pub probe_timeout_secs: u64,

    /// Upper bound for decoding one sampling window, in seconds.
    #[builder(default = "60")]
    pub decode_timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            name_similarity: 0.8,
            duration_tolerance: 3.0,
            frame_similarity: 0.8,
            extract_seconds: 5.0,
            min_visual_duration: 10.0,
            thumbnail_size: 64,
            hash_buffer_size: 8192,
            hash_timeout_secs: 600,
            probe_timeout_secs: 30,
            decode_timeout_secs: 60,
        }
    }
}

impl DetectionConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let defaults = DetectionConfig::default();
        let config = DetectionConfig {
            name_similarity: self.name_similarity.unwrap_or(defaults.name_similarity),
            duration_tolerance: self.duration_tolerance.unwrap_or(defaults.duration_tolerance),
            frame_similarity: self.frame_similarity.unwrap_or(defaults.frame_similarity),
            extract_seconds: self.extract_seconds.unwrap_or(defaults.extract_seconds),
            min_visual_duration: self.min_visual_duration.unwrap_or(defaults.min_visual_duration),
            thumbnail_size: self.thumbnail_size.unwrap_or(defaults.thumbnail_size),
            hash_buffer_size: self.hash_buffer_size.unwrap_or(defaults.hash_buffer_size),
            ..defaults
        };
        config.validate().map_err(|e| e.to_string())
    }
}

impl DetectionConfig {
    /// Create a new config builder.
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder::default()
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("name_similarity", self.name_similarity),
            ("frame_similarity", self.frame_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { field, value });
            }
        }

        if !self.duration_tolerance.is_finite() || self.duration_tolerance < 0.0 {
            return Err(ConfigError::InvalidSeconds {
                field: "duration_tolerance",
                value: self.duration_tolerance,
            });
        }
        if !self.extract_seconds.is_finite() || self.extract_seconds <= 0.0 {
            return Err(ConfigError::InvalidSeconds {
                field: "extract_seconds",
                value: self.extract_seconds,
            });
        }
        if !self.min_visual_duration.is_finite() || self.min_visual_duration < 0.0 {
            return Err(ConfigError::InvalidSeconds {
                field: "min_visual_duration",
                value: self.min_visual_duration,
            });
        }
        if self.thumbnail_size == 0 {
            return Err(ConfigError::Zero { field: "thumbnail_size" });
        }
        if self.hash_buffer_size == 0 {
            return Err(ConfigError::Zero { field: "hash_buffer_size" });
        }
        Ok(())
    }

    /// Bound for hashing one file.
    pub fn hash_timeout(&self) -> Duration {
        Duration::from_secs(self.hash_timeout_secs)
    }

    /// Bound for probing one file.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Bound for decoding one sampling window.
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_secs(self.decode_timeout_secs)
    }
}
