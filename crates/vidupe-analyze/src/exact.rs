//! Exact grouping: identical byte size and identical content digest.
//!
//! Hashing only visits files whose size is shared with at least one other
//! file, since a file with a unique size cannot have a byte-identical twin.
//! Digests are computed in parallel and grouped in inventory order.

use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use blake3::Hasher;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::debug;

use vidupe_core::{
    ContentHash, DetectionConfig, DetectionEvent, DetectionGroup, DetectionMethod, FileWarning,
    GroupKey, MediaFile, Reporter, SignalError, Stage, WarningKind, default_reporter,
};

use crate::report::MethodReport;

/// Groups files by size and by content digest.
pub struct ExactGrouper {
    config: DetectionConfig,
    reporter: Arc<dyn Reporter>,
}

impl ExactGrouper {
    /// Create a grouper that reports through `tracing`.
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_reporter(config, default_reporter())
    }

    /// Create a grouper that reports to the given sink.
    pub fn with_reporter(config: DetectionConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self { config, reporter }
    }

    /// Group files sharing an exact byte size.
    pub fn group_by_size(&self, files: &[MediaFile]) -> MethodReport {
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Size,
            total: files.len(),
        });

        let groups: Vec<DetectionGroup> = size_buckets(files)
            .into_iter()
            .filter_map(|(size, members)| {
                DetectionGroup::new(
                    DetectionMethod::Size,
                    GroupKey::Size(size),
                    members.into_iter().cloned().collect(),
                )
            })
            .collect();

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Size,
            groups: groups.len(),
            skipped: 0,
        });

        MethodReport::new(DetectionMethod::Size, files.len(), groups, Vec::new())
    }

    /// Group files with identical content.
    ///
    /// Unreadable files, and files whose hashing exceeds the configured
    /// bound, are reported as skipped and left out.
    pub fn group_by_hash(&self, files: &[MediaFile]) -> MethodReport {
        let shared_sizes: HashSet<u64> = size_buckets(files)
            .into_iter()
            .filter(|(_, bucket)| bucket.len() > 1)
            .map(|(size, _)| size)
            .collect();
        let candidates: Vec<&MediaFile> = files
            .iter()
            .filter(|f| shared_sizes.contains(&f.size))
            .collect();

        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Hash,
            total: candidates.len(),
        });
        debug!(
            files = files.len(),
            candidates = candidates.len(),
            "hashing files with shared sizes"
        );

        let buffer_size = self.config.hash_buffer_size;
        let timeout = self.config.hash_timeout();
        let digests: Vec<Result<ContentHash, SignalError>> = candidates
            .par_iter()
            .map(|file| compute_digest(&file.path, buffer_size, timeout))
            .collect();

        let mut buckets: IndexMap<ContentHash, Vec<MediaFile>> = IndexMap::new();
        let mut warnings = Vec::new();

        for (file, digest) in candidates.into_iter().zip(digests) {
            self.reporter.report(DetectionEvent::Advanced {
                stage: Stage::Hash,
                path: file.path.clone(),
            });
            match digest {
                Ok(digest) => buckets
                    .entry(digest)
                    .or_default()
                    .push(file.clone().with_digest(digest)),
                Err(err) => {
                    let warning = FileWarning::from_signal(&file.path, &err, WarningKind::ReadError);
                    self.reporter.report(DetectionEvent::Skipped {
                        stage: Stage::Hash,
                        warning: warning.clone(),
                    });
                    warnings.push(warning);
                }
            }
        }

        let groups: Vec<DetectionGroup> = buckets
            .into_iter()
            .filter_map(|(digest, members)| {
                DetectionGroup::new(DetectionMethod::Hash, GroupKey::Digest(digest), members)
            })
            .collect();

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Hash,
            groups: groups.len(),
            skipped: warnings.len(),
        });

        MethodReport::new(DetectionMethod::Hash, files.len(), groups, warnings)
    }
}

/// Files bucketed by size, buckets and members in first-encounter order.
fn size_buckets(files: &[MediaFile]) -> IndexMap<u64, Vec<&MediaFile>> {
    let mut buckets: IndexMap<u64, Vec<&MediaFile>> = IndexMap::new();
    for file in files {
        buckets.entry(file.size).or_default().push(file);
    }
    buckets
}

/// Compute the BLAKE3 digest of a file's full contents.
///
/// The file is read through a fixed buffer of `buffer_size` bytes, so
/// memory use does not depend on file size. The deadline is checked before
/// every read and reading stops with [`SignalError::Timeout`] once `timeout`
/// has elapsed. A single read that blocks (a stalled network mount, say) is
/// not interrupted; the deadline applies as soon as it returns.
pub fn compute_digest(
    path: &Path,
    buffer_size: usize,
    timeout: Duration,
) -> Result<ContentHash, SignalError> {
    let started = Instant::now();
    let mut file = File::open(path).map_err(|e| SignalError::io(path, e))?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];

    loop {
        if started.elapsed() >= timeout {
            return Err(SignalError::Timeout {
                path: path.to_path_buf(),
                after: timeout,
            });
        }

        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SignalError::io(path, e)),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vidupe_core::NullReporter;

    fn grouper() -> ExactGrouper {
        ExactGrouper::with_reporter(DetectionConfig::default(), Arc::new(NullReporter))
    }

    #[test]
    fn test_digest_matches_one_shot_hash() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.mp4");
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        let digest = compute_digest(&path, 8192, Duration::from_secs(60)).unwrap();
        assert_eq!(digest, ContentHash::new(*blake3::hash(&content).as_bytes()));

        // buffer size does not change the result
        let small = compute_digest(&path, 7, Duration::from_secs(60)).unwrap();
        assert_eq!(digest, small);
    }

    #[test]
    fn test_digest_missing_file() {
        let err = compute_digest(Path::new("/no/such/file.mp4"), 8192, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, SignalError::Io { .. }));
    }

    #[test]
    fn test_digest_deadline() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.mp4");
        fs::write(&path, vec![1u8; 4096]).unwrap();

        let err = compute_digest(&path, 16, Duration::ZERO).unwrap_err();
        assert!(matches!(err, SignalError::Timeout { .. }));
    }

    #[test]
    fn test_digest_deadline_checked_before_first_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.mp4");
        fs::write(&path, b"").unwrap();

        let err = compute_digest(&path, 16, Duration::ZERO).unwrap_err();
        assert!(matches!(err, SignalError::Timeout { .. }));

        let digest = compute_digest(&path, 16, Duration::from_secs(60)).unwrap();
        assert_eq!(digest, ContentHash::new(*blake3::hash(b"").as_bytes()));
    }

    #[test]
    fn test_size_groups_in_encounter_order() {
        let files = vec![
            MediaFile::new("/v/a.mp4", 10),
            MediaFile::new("/v/b.mp4", 20),
            MediaFile::new("/v/c.mp4", 10),
            MediaFile::new("/v/d.mp4", 20),
            MediaFile::new("/v/e.mp4", 30),
        ];

        let report = grouper().group_by_size(&files);

        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].key, GroupKey::Size(10));
        assert_eq!(report.groups[1].key, GroupKey::Size(20));
        assert_eq!(report.files_considered, 5);
        assert_eq!(report.wasted_bytes, 30);
    }

    #[test]
    fn test_unique_sizes_are_not_hashed() {
        // the paths do not exist; hashing them would produce warnings
        let files = vec![MediaFile::new("/v/a.mp4", 10), MediaFile::new("/v/b.mp4", 20)];

        let report = grouper().group_by_hash(&files);

        assert!(report.groups.is_empty());
        assert!(report.warnings.is_empty());
    }
}
