use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use vidupe_analyze::{DuplicateDetector, DuplicateReport, MethodReport};
use vidupe_core::{
    DetectionConfig, DetectionGroup, DetectionMethod, GroupKey, Inventory, MediaFile,
    NullReporter, RecordingReporter, Stage, WarningKind,
};
use vidupe_ops::{DeletionPlan, DuplicateResolver, RemovalMode, select_for_resolution};

fn resolver() -> DuplicateResolver {
    DuplicateResolver::with_reporter(Arc::new(NullReporter))
}

/// Write files and return their records in the given order.
fn write_files(temp: &TempDir, entries: &[(&str, usize)]) -> Vec<MediaFile> {
    entries
        .iter()
        .map(|(name, size)| {
            let path = temp.path().join(name);
            fs::write(&path, vec![b'x'; *size]).unwrap();
            MediaFile::new(path, *size as u64)
        })
        .collect()
}

fn group(method: DetectionMethod, key: &str, members: Vec<MediaFile>) -> DetectionGroup {
    DetectionGroup::new(method, GroupKey::Cluster(key.to_string()), members).unwrap()
}

#[test]
fn test_dry_run_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let files = write_files(&temp, &[("a.mp4", 10), ("b.mp4", 30), ("c.mp4", 20)]);
    let groups = vec![group(DetectionMethod::Duration, "g", files.clone())];

    let first = resolver().resolve(&groups, RemovalMode::DryRun);
    let second = resolver().resolve(&groups, RemovalMode::DryRun);

    assert_eq!(first.plan, second.plan);
    assert_eq!(first.counts(), (2, 0));
    assert_eq!(first.counts(), second.counts());
    assert_eq!(first.bytes_freed, 30);
    assert!(files.iter().all(|f| f.path.exists()));
}

#[test]
fn test_largest_file_is_never_removed() {
    let temp = TempDir::new().unwrap();
    let files = write_files(&temp, &[("small.mp4", 10), ("large.mp4", 40), ("mid.mp4", 20)]);
    let groups = vec![group(DetectionMethod::Frames, "g", files.clone())];

    let outcome = resolver().resolve(&groups, RemovalMode::Delete);

    assert_eq!(outcome.counts(), (2, 0));
    assert!(outcome.is_success());
    assert!(files[1].path.exists());
    assert!(!files[0].path.exists());
    assert!(!files[2].path.exists());
    assert_eq!(outcome.plan.entries()[0].keep.path, files[1].path);
}

#[test]
fn test_tie_keeps_first_encountered() {
    let temp = TempDir::new().unwrap();
    let files = write_files(&temp, &[("first.mp4", 25), ("second.mp4", 25), ("third.mp4", 5)]);
    let groups = vec![group(DetectionMethod::Duration, "g", files.clone())];

    let plan = DeletionPlan::build(&groups);
    assert_eq!(plan.entries()[0].keep.path, files[0].path);

    let outcome = resolver().resolve(&groups, RemovalMode::Delete);
    assert_eq!(outcome.removed, 2);
    assert!(files[0].path.exists());
    assert!(!files[1].path.exists());
}

#[test]
fn test_failure_does_not_stop_the_batch() {
    let temp = TempDir::new().unwrap();
    let mut files = write_files(&temp, &[("keep.mp4", 50), ("dup.mp4", 10)]);
    files.insert(1, MediaFile::new(temp.path().join("vanished.mp4"), 20));
    let other = write_files(&temp, &[("keep2.mp4", 50), ("dup2.mp4", 5)]);
    let groups = vec![
        group(DetectionMethod::Hash, "g1", files.clone()),
        group(DetectionMethod::Hash, "g2", other.clone()),
    ];

    let recorder = Arc::new(RecordingReporter::new());
    let outcome = DuplicateResolver::with_reporter(recorder.clone())
        .resolve(&groups, RemovalMode::Delete);

    assert_eq!(outcome.counts(), (2, 1));
    assert!(!outcome.is_success());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].path, temp.path().join("vanished.mp4"));
    assert_eq!(outcome.bytes_freed, 15);
    assert!(!files[2].path.exists());
    assert!(!other[1].path.exists());
    assert!(files[0].path.exists() && other[0].path.exists());

    let skipped = recorder.skipped(Stage::Resolution);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].kind, WarningKind::RemoveFailed);
    assert_eq!(outcome.summary(), "Removed 2 files, 1 failed");
}

#[test]
fn test_trash_of_missing_file_is_a_failure() {
    let temp = TempDir::new().unwrap();
    let keep = write_files(&temp, &[("keep.mp4", 10)]);
    let groups = vec![group(
        DetectionMethod::Hash,
        "g",
        vec![keep[0].clone(), MediaFile::new(temp.path().join("gone.mp4"), 10)],
    )];

    let outcome = resolver().resolve(&groups, RemovalMode::Trash);

    assert_eq!(outcome.counts(), (0, 1));
    assert!(keep[0].path.exists());
}

#[test]
fn test_selection_prefers_hash_then_frames_then_duration() {
    let members = || vec![MediaFile::new("/v/a", 2), MediaFile::new("/v/b", 1)];
    let method_report = |method: DetectionMethod, found: bool| {
        let groups = if found {
            vec![group(method, "g", members())]
        } else {
            Vec::new()
        };
        MethodReport::new(method, 2, groups, Vec::new())
    };

    let mut report = DuplicateReport::new("/v", 2);
    report.insert(method_report(DetectionMethod::Size, true));
    report.insert(method_report(DetectionMethod::Name, true));
    assert!(select_for_resolution(&report).is_none());

    report.insert(method_report(DetectionMethod::Duration, true));
    assert_eq!(select_for_resolution(&report).unwrap().0, DetectionMethod::Duration);

    report.insert(method_report(DetectionMethod::Frames, true));
    assert_eq!(select_for_resolution(&report).unwrap().0, DetectionMethod::Frames);

    // an empty hash result does not win
    report.insert(method_report(DetectionMethod::Hash, false));
    assert_eq!(select_for_resolution(&report).unwrap().0, DetectionMethod::Frames);

    report.insert(method_report(DetectionMethod::Hash, true));
    assert_eq!(select_for_resolution(&report).unwrap().0, DetectionMethod::Hash);
}

#[test]
fn test_end_to_end_hash_then_resolve() {
    let temp = TempDir::new().unwrap();
    let movie: Vec<u8> = (0..500_000u32).map(|i| (i % 241) as u8).collect();
    let paths: Vec<PathBuf> = ["A.mp4", "B.mp4", "C.mp4"]
        .iter()
        .map(|n| temp.path().join(n))
        .collect();
    fs::write(&paths[0], &movie).unwrap();
    fs::write(&paths[1], &movie).unwrap();
    fs::write(&paths[2], vec![3u8; 10_000]).unwrap();

    let files = vec![
        MediaFile::new(&paths[0], 500_000),
        MediaFile::new(&paths[1], 500_000),
        MediaFile::new(&paths[2], 10_000),
    ];
    let report = DuplicateDetector::new(DetectionConfig::default())
        .with_reporter(Arc::new(NullReporter))
        .detect(&Inventory::from_files(temp.path(), files), &[DetectionMethod::Hash])
        .unwrap();

    let (method, groups) = select_for_resolution(&report).unwrap();
    assert_eq!(method, DetectionMethod::Hash);
    assert_eq!(groups.len(), 1);
    assert!(!groups[0].contains(&paths[2]));

    let outcome = resolver().resolve(groups, RemovalMode::Delete);

    assert_eq!(outcome.counts(), (1, 0));
    assert!(paths[0].exists());
    assert!(!paths[1].exists());
    assert!(paths[2].exists());
}
