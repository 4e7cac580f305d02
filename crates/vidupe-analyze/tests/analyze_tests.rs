use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{GrayImage, Luma};
use tempfile::TempDir;

use vidupe_analyze::{
    ApproximateGrouper, DetectError, DetectionMethod, DuplicateDetector, ExactGrouper, GroupKey,
    MediaFile, VisualRefiner,
};
use vidupe_core::{
    DetectionConfig, DurationProber, FrameSampler, Inventory, NullReporter, RecordingReporter,
    SignalError, Stage, WarningKind,
};

/// Durations by path; unknown paths time out.
#[derive(Default)]
struct FakeProber {
    durations: HashMap<PathBuf, f64>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeProber {
    fn with(entries: &[(&str, f64)]) -> Self {
        Self {
            durations: entries.iter().map(|(p, d)| (PathBuf::from(p), *d)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DurationProber for FakeProber {
    fn probe_duration(&self, path: &Path, timeout: Duration) -> Result<f64, SignalError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        self.durations
            .get(path)
            .copied()
            .ok_or_else(|| SignalError::Timeout {
                path: path.to_path_buf(),
                after: timeout,
            })
    }
}

/// Frames by path; unknown paths fail to decode.
#[derive(Default)]
struct FakeSampler {
    frames: HashMap<PathBuf, Vec<GrayImage>>,
    windows: Mutex<Vec<(PathBuf, f64, f64)>>,
}

impl FakeSampler {
    fn with(entries: Vec<(&str, Vec<GrayImage>)>) -> Self {
        Self {
            frames: entries
                .into_iter()
                .map(|(p, f)| (PathBuf::from(p), f))
                .collect(),
            windows: Mutex::new(Vec::new()),
        }
    }

    fn sampled_paths(&self) -> Vec<PathBuf> {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _, _)| p.clone())
            .collect()
    }
}

impl FrameSampler for FakeSampler {
    fn sample_frames(
        &self,
        path: &Path,
        start_secs: f64,
        window_secs: f64,
        _timeout: Duration,
    ) -> Result<Vec<GrayImage>, SignalError> {
        self.windows
            .lock()
            .unwrap()
            .push((path.to_path_buf(), start_secs, window_secs));
        self.frames.get(path).cloned().ok_or_else(|| SignalError::ToolFailed {
            tool: "fake".to_string(),
            path: path.to_path_buf(),
            status: "exit status: 1".to_string(),
            stderr: "invalid data".to_string(),
        })
    }
}

/// Horizontal ramp; uncorrelated with `scene_b`.
fn scene_a() -> Vec<GrayImage> {
    (0..3)
        .map(|_| GrayImage::from_fn(32, 32, |x, _| Luma([(x * 8) as u8])))
        .collect()
}

/// Vertical ramp.
fn scene_b() -> Vec<GrayImage> {
    (0..3)
        .map(|_| GrayImage::from_fn(32, 32, |_, y| Luma([(y * 8) as u8])))
        .collect()
}

/// Diagonal ramp; correlates about 0.7 with both `scene_a` and `scene_b`.
fn scene_diagonal() -> Vec<GrayImage> {
    (0..3)
        .map(|_| GrayImage::from_fn(32, 32, |x, y| Luma([((x + y) * 4) as u8])))
        .collect()
}

fn video(path: &str, size: u64) -> MediaFile {
    MediaFile::new(path, size)
}

fn inventory(files: Vec<MediaFile>) -> Inventory {
    Inventory::from_files("/v", files)
}

fn quiet() -> Arc<NullReporter> {
    Arc::new(NullReporter)
}

fn write_files(temp: &TempDir, entries: Vec<(&str, Vec<u8>)>) -> Vec<MediaFile> {
    entries
        .into_iter()
        .map(|(name, content)| {
            let path = temp.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, &content).unwrap();
            MediaFile::new(path, content.len() as u64)
        })
        .collect()
}

#[test]
fn test_equal_size_different_content() {
    let temp = TempDir::new().unwrap();
    let files = write_files(&temp, vec![("a.mp4", b"aaaa".to_vec()), ("b.mp4", b"bbbb".to_vec())]);
    let grouper = ExactGrouper::with_reporter(DetectionConfig::default(), quiet());

    let by_size = grouper.group_by_size(&files);
    assert_eq!(by_size.groups.len(), 1);
    assert_eq!(by_size.groups[0].len(), 2);

    let by_hash = grouper.group_by_hash(&files);
    assert!(by_hash.groups.is_empty());
    assert!(by_hash.warnings.is_empty());
}

#[test]
fn test_identical_content_grouped_regardless_of_name() {
    let temp = TempDir::new().unwrap();
    let content: Vec<u8> = (0..20_000u32).map(|i| (i * 31 % 256) as u8).collect();
    let files = write_files(
        &temp,
        vec![
            ("holiday.mp4", content.clone()),
            ("other/dir/completely_different.mkv", content),
            ("noise.mp4", vec![7u8; 20_000]),
        ],
    );
    let grouper = ExactGrouper::with_reporter(DetectionConfig::default(), quiet());

    let report = grouper.group_by_hash(&files);

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.len(), 2);
    assert!(group.contains(&files[0].path));
    assert!(group.contains(&files[1].path));
    assert!(matches!(group.key, GroupKey::Digest(_)));
    assert!(group.members().iter().all(|m| m.digest.is_some()));
}

#[test]
fn test_unreadable_file_is_skipped_not_fatal() {
    let temp = TempDir::new().unwrap();
    let mut files = write_files(&temp, vec![("a.mp4", b"same".to_vec()), ("b.mp4", b"same".to_vec())]);
    files.push(MediaFile::new(temp.path().join("gone.mp4"), 4));

    let recorder = Arc::new(RecordingReporter::new());
    let grouper = ExactGrouper::with_reporter(DetectionConfig::default(), recorder.clone());
    let report = grouper.group_by_hash(&files);

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].len(), 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::ReadError);
    assert_eq!(recorder.skipped(Stage::Hash).len(), 1);
}

#[test]
fn test_clustering_is_deterministic() {
    let files: Vec<MediaFile> = [
        "Trip.2019.part1.mp4",
        "Trip.2019.part2.mp4",
        "trip 2019 part1.mkv",
        "Concert.mp4",
        "Concert (1).mp4",
        "lecture-01.avi",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| MediaFile::new(format!("/v/{name}"), i as u64))
    .collect();
    let grouper = ApproximateGrouper::with_reporter(DetectionConfig::default(), quiet());

    let first = grouper.group_by_name(&files);
    let second = grouper.group_by_name(&files);

    assert_eq!(first.groups, second.groups);
    assert!(!first.groups.is_empty());
}

#[test]
fn test_duration_tolerance_boundaries() {
    let grouper = ApproximateGrouper::with_reporter(DetectionConfig::default(), quiet());

    let close = FakeProber::with(&[("/v/a.mp4", 100.0), ("/v/b.mp4", 102.5)]);
    let report = grouper.group_by_duration(&[video("/v/a.mp4", 1), video("/v/b.mp4", 2)], &close);
    assert_eq!(report.groups.len(), 1);

    let far = FakeProber::with(&[("/v/a.mp4", 100.0), ("/v/b.mp4", 104.0)]);
    let report = grouper.group_by_duration(&[video("/v/a.mp4", 1), video("/v/b.mp4", 2)], &far);
    assert!(report.groups.is_empty());
}

#[test]
fn test_duration_drift_is_bounded_by_representative() {
    // b is within tolerance of both a and c, but c is compared to a only
    let grouper = ApproximateGrouper::with_reporter(DetectionConfig::default(), quiet());
    let prober = FakeProber::with(&[("/v/a", 100.0), ("/v/b", 102.0), ("/v/c", 104.0)]);
    let files = vec![video("/v/a", 1), video("/v/b", 1), video("/v/c", 1)];

    let report = grouper.group_by_duration(&files, &prober);

    assert_eq!(report.groups.len(), 1);
    assert!(!report.groups[0].contains(Path::new("/v/c")));
}

#[test]
fn test_probe_failure_excludes_file_from_duration_only() {
    let files = vec![
        video("/v/a.mp4", 10),
        video("/v/b.mp4", 10),
        video("/v/broken.mp4", 10),
    ];
    let prober = Arc::new(FakeProber::with(&[("/v/a.mp4", 60.0), ("/v/b.mp4", 61.0)]));
    let recorder = Arc::new(RecordingReporter::new());
    let detector = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(recorder.clone())
        .with_prober(prober);

    let report = detector
        .detect(&inventory(files), &[DetectionMethod::Size, DetectionMethod::Duration])
        .unwrap();

    assert_eq!(report.groups(DetectionMethod::Size)[0].len(), 3);

    let duration = report.get(DetectionMethod::Duration).unwrap();
    assert_eq!(duration.groups.len(), 1);
    assert!(!duration.groups[0].contains(Path::new("/v/broken.mp4")));
    assert_eq!(duration.warnings.len(), 1);
    assert_eq!(duration.warnings[0].kind, WarningKind::Timeout);
    assert_eq!(recorder.skipped(Stage::Probe).len(), 1);
}

#[test]
fn test_visual_refinement_splits_by_content() {
    let files = vec![
        video("/v/a1.mp4", 300),
        video("/v/b.mp4", 200),
        video("/v/a2.mp4", 100),
    ];
    let prober = Arc::new(FakeProber::with(&[
        ("/v/a1.mp4", 60.0),
        ("/v/b.mp4", 60.5),
        ("/v/a2.mp4", 61.0),
    ]));
    let sampler = Arc::new(FakeSampler::with(vec![
        ("/v/a1.mp4", scene_a()),
        ("/v/b.mp4", scene_b()),
        ("/v/a2.mp4", scene_a()),
    ]));
    let detector = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(quiet())
        .with_prober(prober)
        .with_sampler(sampler.clone());

    let report = detector
        .detect(&inventory(files), &[DetectionMethod::Duration, DetectionMethod::Frames])
        .unwrap();

    assert_eq!(report.groups(DetectionMethod::Duration)[0].len(), 3);

    let frames = report.groups(DetectionMethod::Frames);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), 2);
    assert_eq!(frames[0].kept().path, PathBuf::from("/v/a1.mp4"));
    assert!(frames[0].contains(Path::new("/v/a2.mp4")));
    assert_eq!(
        frames[0].key,
        GroupKey::Cluster("dur#0@60.0s/frames#0".to_string())
    );

    // sampling starts at the midpoint and covers the configured window
    let windows = sampler.windows.lock().unwrap().clone();
    let (_, start, window) = windows
        .iter()
        .find(|(p, _, _)| p == Path::new("/v/a1.mp4"))
        .unwrap();
    assert_eq!(*start, 30.0);
    assert_eq!(*window, 5.0);
}

#[test]
fn test_short_videos_never_reach_visual_groups() {
    let files = vec![video("/v/clip1.mp4", 5), video("/v/clip2.mp4", 5)];
    let prober = FakeProber::with(&[("/v/clip1.mp4", 8.0), ("/v/clip2.mp4", 8.0)]);
    let sampler = FakeSampler::with(vec![("/v/clip1.mp4", scene_a()), ("/v/clip2.mp4", scene_a())]);

    let approximate = ApproximateGrouper::with_reporter(DetectionConfig::default(), quiet());
    let duration_groups = approximate.group_by_duration(&files, &prober).groups;
    assert_eq!(duration_groups.len(), 1);

    let refiner = VisualRefiner::with_reporter(DetectionConfig::default(), quiet());
    let report = refiner.refine(&duration_groups, &sampler);

    assert!(report.groups.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().all(|w| w.kind == WarningKind::TooShort));
    assert!(sampler.sampled_paths().is_empty());
}

#[test]
fn test_decode_failure_only_affects_refinement() {
    let files = vec![
        video("/v/a1.mp4", 3),
        video("/v/a2.mp4", 2),
        video("/v/corrupt.mp4", 1),
    ];
    let prober = FakeProber::with(&[
        ("/v/a1.mp4", 120.0),
        ("/v/a2.mp4", 120.0),
        ("/v/corrupt.mp4", 120.0),
    ]);
    let sampler = FakeSampler::with(vec![("/v/a1.mp4", scene_a()), ("/v/a2.mp4", scene_a())]);

    let approximate = ApproximateGrouper::with_reporter(DetectionConfig::default(), quiet());
    let duration_groups = approximate.group_by_duration(&files, &prober).groups;
    let refiner = VisualRefiner::with_reporter(DetectionConfig::default(), quiet());
    let report = refiner.refine(&duration_groups, &sampler);

    assert!(duration_groups[0].contains(Path::new("/v/corrupt.mp4")));
    assert_eq!(report.groups.len(), 1);
    assert!(!report.groups[0].contains(Path::new("/v/corrupt.mp4")));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::DecodeFailed);
}

#[test]
fn test_visual_clusters_follow_inventory_order() {
    // the smallest file comes first, so it is the representative
    let files = vec![
        video("/v/A.mp4", 100),
        video("/v/B.mp4", 300),
        video("/v/C.mp4", 200),
    ];
    let prober = FakeProber::with(&[("/v/A.mp4", 60.0), ("/v/B.mp4", 60.0), ("/v/C.mp4", 60.0)]);
    let sampler = FakeSampler::with(vec![
        ("/v/A.mp4", scene_diagonal()),
        ("/v/B.mp4", scene_a()),
        ("/v/C.mp4", scene_b()),
    ]);
    let config = DetectionConfig {
        frame_similarity: 0.6,
        ..DetectionConfig::default()
    };

    let approximate = ApproximateGrouper::with_reporter(config.clone(), quiet());
    let duration_groups = approximate.group_by_duration(&files, &prober).groups;
    let report = VisualRefiner::with_reporter(config, quiet()).refine(&duration_groups, &sampler);

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.kept().path, PathBuf::from("/v/B.mp4"));
    assert!(group.contains(Path::new("/v/C.mp4")));

    let sampled = sampler.sampled_paths();
    assert_eq!(
        sampled,
        [
            PathBuf::from("/v/A.mp4"),
            PathBuf::from("/v/B.mp4"),
            PathBuf::from("/v/C.mp4"),
        ]
    );
}

#[test]
fn test_frames_alone_reports_probe_failures() {
    let files = vec![
        video("/v/a.mp4", 2),
        video("/v/b.mp4", 1),
        video("/v/broken.mp4", 1),
    ];
    let prober = Arc::new(FakeProber::with(&[("/v/a.mp4", 90.0), ("/v/b.mp4", 90.0)]));
    let sampler = Arc::new(FakeSampler::with(vec![
        ("/v/a.mp4", scene_a()),
        ("/v/b.mp4", scene_a()),
    ]));
    let detector = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(quiet())
        .with_prober(prober)
        .with_sampler(sampler);

    let report = detector
        .detect(&inventory(files), &[DetectionMethod::Frames])
        .unwrap();

    let frames = report.get(DetectionMethod::Frames).unwrap();
    assert_eq!(frames.groups.len(), 1);
    assert_eq!(frames.warnings.len(), 1);
    assert_eq!(frames.warnings[0].kind, WarningKind::Timeout);
    assert_eq!(
        report.skipped_counts(),
        [("inventory".to_string(), 0), ("frames".to_string(), 1)]
    );
}

#[test]
fn test_frames_with_duration_does_not_repeat_probe_failures() {
    let files = vec![
        video("/v/a.mp4", 2),
        video("/v/b.mp4", 1),
        video("/v/broken.mp4", 1),
    ];
    let prober = Arc::new(FakeProber::with(&[("/v/a.mp4", 90.0), ("/v/b.mp4", 90.0)]));
    let sampler = Arc::new(FakeSampler::with(vec![
        ("/v/a.mp4", scene_a()),
        ("/v/b.mp4", scene_a()),
    ]));
    let detector = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(quiet())
        .with_prober(prober)
        .with_sampler(sampler);

    let report = detector
        .detect(&inventory(files), &[DetectionMethod::Duration, DetectionMethod::Frames])
        .unwrap();

    assert_eq!(
        report.skipped_counts(),
        [
            ("inventory".to_string(), 0),
            ("duration".to_string(), 1),
            ("frames".to_string(), 0),
        ]
    );
}

#[test]
fn test_frames_reuses_duration_groups() {
    let files = vec![video("/v/a.mp4", 1), video("/v/b.mp4", 1)];
    let prober = Arc::new(FakeProber::with(&[("/v/a.mp4", 30.0), ("/v/b.mp4", 30.0)]));
    let sampler = Arc::new(FakeSampler::with(vec![
        ("/v/a.mp4", scene_a()),
        ("/v/b.mp4", scene_a()),
    ]));
    let detector = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(quiet())
        .with_prober(prober.clone())
        .with_sampler(sampler);

    // requested out of order; duration still runs first
    let report = detector
        .detect(&inventory(files), &[DetectionMethod::Frames, DetectionMethod::Duration])
        .unwrap();

    assert_eq!(prober.call_count(), 2);
    let order: Vec<_> = report.methods.keys().copied().collect();
    assert_eq!(order, [DetectionMethod::Duration, DetectionMethod::Frames]);
    assert_eq!(report.groups(DetectionMethod::Frames).len(), 1);
}

#[test]
fn test_missing_collaborators_are_setup_errors() {
    let detector = DuplicateDetector::new(DetectionConfig::default()).with_reporter(quiet());
    let inv = inventory(vec![video("/v/a.mp4", 1)]);

    assert!(matches!(
        detector.detect(&inv, &[DetectionMethod::Duration]),
        Err(DetectError::MissingProber { .. })
    ));

    let detector = detector.with_prober(Arc::new(FakeProber::default()));
    assert!(matches!(
        detector.detect(&inv, &[DetectionMethod::Frames]),
        Err(DetectError::MissingSampler)
    ));

    assert!(detector.detect(&inv, &[DetectionMethod::Size]).is_ok());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = DetectionConfig {
        frame_similarity: 2.0,
        ..DetectionConfig::default()
    };
    let detector = DuplicateDetector::new(config).with_reporter(quiet());

    let result = detector.detect(&inventory(Vec::new()), &[DetectionMethod::Size]);
    assert!(matches!(result, Err(DetectError::Config(_))));
}

#[test]
fn test_end_to_end_hash_report() {
    let temp = TempDir::new().unwrap();
    let movie: Vec<u8> = (0..500_000u32).map(|i| (i % 253) as u8).collect();
    let files = write_files(
        &temp,
        vec![
            ("A.mp4", movie.clone()),
            ("B.mp4", movie),
            ("C.mp4", vec![1u8; 10_000]),
        ],
    );
    let detector = DuplicateDetector::new(DetectionConfig::default()).with_reporter(quiet());

    let report = detector
        .detect(&Inventory::from_files(temp.path(), files.clone()), &[DetectionMethod::Hash])
        .unwrap();

    let hash = report.get(DetectionMethod::Hash).unwrap();
    assert_eq!(hash.groups.len(), 1);
    assert_eq!(hash.groups[0].kept().path, files[0].path);
    assert_eq!(hash.groups[0].removable()[0].path, files[1].path);
    assert!(!hash.groups[0].contains(&files[2].path));
    assert_eq!(hash.wasted_bytes, 500_000);

    let text = report.render_text();
    assert!(text.contains("[KEEP]"));
    assert!(text.contains("Content hash (hash)"));

    let json = serde_json::to_string_pretty(&report).unwrap();
    assert!(json.contains("\"hash\""));
}
