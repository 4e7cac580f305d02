//! Media inventory container and statistics.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FileWarning;
use crate::media::MediaFile;

/// Summary statistics for an inventory walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    /// Regular files encountered, media or not.
    pub files_seen: u64,
    /// Files kept because their extension matched.
    pub media_files: u64,
    /// Total size of kept files.
    pub total_bytes: u64,
}

impl InventoryStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file that did not match the extension filter.
    pub fn record_other(&mut self) {
        self.files_seen += 1;
    }

    /// Record a kept media file.
    pub fn record_media(&mut self, size: u64) {
        self.files_seen += 1;
        self.media_files += 1;
        self.total_bytes += size;
    }
}

/// The ordered sequence of candidate files for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Canonical root that was walked.
    pub root: PathBuf,
    /// Candidate files in deterministic walk order.
    pub files: Vec<MediaFile>,
    /// Entries skipped during the walk.
    pub warnings: Vec<FileWarning>,
    /// Walk statistics.
    pub stats: InventoryStats,
    /// Time spent walking.
    pub scan_duration: Duration,
}

impl Inventory {
    /// Create an inventory from already collected parts.
    pub fn new(
        root: PathBuf,
        files: Vec<MediaFile>,
        warnings: Vec<FileWarning>,
        stats: InventoryStats,
        scan_duration: Duration,
    ) -> Self {
        Self {
            root,
            files,
            warnings,
            stats,
            scan_duration,
        }
    }

    /// Build an inventory directly from records, e.g. for tests or replays.
    pub fn from_files(root: impl Into<PathBuf>, files: Vec<MediaFile>) -> Self {
        let mut stats = InventoryStats::new();
        for file in &files {
            stats.record_media(file.size);
        }
        Self::new(root.into(), files, Vec::new(), stats, Duration::ZERO)
    }

    /// Number of candidate files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no candidate file was found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of candidate files.
    pub fn total_size(&self) -> u64 {
        self.stats.total_bytes
    }
}
