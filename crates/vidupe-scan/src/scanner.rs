//! JWalk-based inventory scanner.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use tracing::debug;

use vidupe_core::{
    DetectionEvent, FileWarning, Inventory, InventoryConfig, InventoryError, InventoryStats,
    MediaFile, Reporter, Stage, WarningKind, default_reporter,
};

/// Builds a media inventory by walking a directory tree.
pub struct InventoryScanner {
    reporter: Arc<dyn Reporter>,
}

impl InventoryScanner {
    /// Create a new scanner that reports through `tracing`.
    pub fn new() -> Self {
        Self {
            reporter: default_reporter(),
        }
    }

    /// Create a scanner that reports to the given sink.
    pub fn with_reporter(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    /// Walk `config.root` and collect the media files under it.
    ///
    /// Only setup problems with the root are errors. Entries that cannot be
    /// read are recorded as warnings and left out.
    pub fn scan(&self, config: &InventoryConfig) -> Result<Inventory, InventoryError> {
        let start = Instant::now();

        if config.extensions.is_empty() {
            return Err(InventoryError::InvalidConfig {
                message: "no file extensions configured".to_string(),
            });
        }

        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| InventoryError::io(&config.root, e))?;

        // Verify root is a directory
        if !root_path.is_dir() {
            return Err(InventoryError::NotADirectory { path: root_path });
        }

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        // Sorted so inventory order does not depend on thread timing
        let walker = WalkDir::new(&root_path)
            .parallelism(parallelism)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks);

        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Inventory,
            total: 0,
        });

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut stats = InventoryStats::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let kind = match err.io_error().map(|e| e.kind()) {
                        Some(std::io::ErrorKind::PermissionDenied) => WarningKind::PermissionDenied,
                        _ => WarningKind::ReadError,
                    };
                    self.skip(&mut warnings, FileWarning::new(path, err.to_string(), kind));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !config.matches_extension(&path) {
                stats.record_other();
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    stats.record_other();
                    self.skip(
                        &mut warnings,
                        FileWarning::new(&path, err.to_string(), WarningKind::MetadataError),
                    );
                    continue;
                }
            };

            stats.record_media(metadata.len());
            self.reporter.report(DetectionEvent::Advanced {
                stage: Stage::Inventory,
                path: path.clone(),
            });
            files.push(MediaFile::new(path, metadata.len()));
        }

        let scan_duration = start.elapsed();
        debug!(
            files = files.len(),
            seen = stats.files_seen,
            elapsed_ms = scan_duration.as_millis() as u64,
            "inventory complete"
        );

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Inventory,
            groups: 0,
            skipped: warnings.len(),
        });

        Ok(Inventory::new(root_path, files, warnings, stats, scan_duration))
    }

    fn skip(&self, warnings: &mut Vec<FileWarning>, warning: FileWarning) {
        self.reporter.report(DetectionEvent::Skipped {
            stage: Stage::Inventory,
            warning: warning.clone(),
        });
        warnings.push(warning);
    }
}

impl Default for InventoryScanner {
    fn default() -> Self {
        Self::new()
    }
}
