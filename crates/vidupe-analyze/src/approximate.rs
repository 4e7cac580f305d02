//! Approximate grouping by name similarity and by duration.

use std::sync::Arc;

use tracing::debug;

use vidupe_core::{
    DetectionConfig, DetectionEvent, DetectionGroup, DetectionMethod, DurationProber, FileWarning,
    GroupKey, MediaFile, Reporter, Stage, WarningKind, default_reporter,
};

use crate::cluster::greedy_clusters;
use crate::report::MethodReport;
use crate::similarity::ratio;

/// Files with a probed duration plus the files that could not be probed.
#[derive(Debug, Clone, Default)]
pub struct ProbedFiles {
    /// Files with a known positive duration, in input order.
    pub files: Vec<MediaFile>,
    /// One warning per file left out.
    pub warnings: Vec<FileWarning>,
}

/// Groups files whose names or durations are close.
pub struct ApproximateGrouper {
    config: DetectionConfig,
    reporter: Arc<dyn Reporter>,
}

impl ApproximateGrouper {
    /// Create a grouper that reports through `tracing`.
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_reporter(config, default_reporter())
    }

    /// Create a grouper that reports to the given sink.
    pub fn with_reporter(config: DetectionConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self { config, reporter }
    }

    /// Cluster files whose lower-cased names have a similarity ratio at or
    /// above the configured threshold.
    ///
    /// Groups are labelled `name#<i>` where `i` is the representative's
    /// position in `files`.
    pub fn group_by_name(&self, files: &[MediaFile]) -> MethodReport {
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Name,
            total: files.len(),
        });

        let names: Vec<Vec<char>> = files
            .iter()
            .map(|f| f.name.to_lowercase().chars().collect())
            .collect();
        let threshold = self.config.name_similarity;

        let groups: Vec<DetectionGroup> = greedy_clusters(&names, |rep, candidate| {
            ratio(rep, candidate) >= threshold
        })
        .into_iter()
        .filter_map(|cluster| {
            let label = format!("name#{}", cluster[0]);
            let members = cluster.iter().map(|&i| files[i].clone()).collect();
            DetectionGroup::new(DetectionMethod::Name, GroupKey::Cluster(label), members)
        })
        .collect();

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Name,
            groups: groups.len(),
            skipped: 0,
        });

        MethodReport::new(DetectionMethod::Name, files.len(), groups, Vec::new())
    }

    /// Probe every file's duration.
    ///
    /// Files the prober cannot handle are reported as skipped and left out;
    /// no duration sentinel ever reaches the comparison.
    pub fn probe_durations(&self, files: &[MediaFile], prober: &dyn DurationProber) -> ProbedFiles {
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Probe,
            total: files.len(),
        });

        let timeout = self.config.probe_timeout();
        let mut probed = ProbedFiles::default();

        for file in files {
            self.reporter.report(DetectionEvent::Advanced {
                stage: Stage::Probe,
                path: file.path.clone(),
            });

            let warning = match prober.probe_duration(&file.path, timeout) {
                Ok(secs) if secs.is_finite() && secs > 0.0 => {
                    probed.files.push(file.clone().with_duration(secs));
                    continue;
                }
                Ok(secs) => FileWarning::new(
                    &file.path,
                    format!("Unusable duration {secs}"),
                    WarningKind::ProbeFailed,
                ),
                Err(err) => FileWarning::from_signal(&file.path, &err, WarningKind::ProbeFailed),
            };

            self.reporter.report(DetectionEvent::Skipped {
                stage: Stage::Probe,
                warning: warning.clone(),
            });
            probed.warnings.push(warning);
        }

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Probe,
            groups: 0,
            skipped: probed.warnings.len(),
        });

        probed
    }

    /// Cluster files whose durations differ by at most the configured
    /// tolerance from their cluster's representative.
    ///
    /// Files without a known duration are ignored. Groups are labelled
    /// `dur#<i>@<secs>s` where `i` is the representative's position in
    /// `files` and `secs` its duration.
    pub fn cluster_by_duration(&self, files: &[MediaFile]) -> Vec<DetectionGroup> {
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::DurationGrouping,
            total: files.len(),
        });

        let timed: Vec<(usize, f64)> = files
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.known_duration().map(|d| (i, d)))
            .collect();
        let tolerance = self.config.duration_tolerance;

        let groups: Vec<DetectionGroup> = greedy_clusters(&timed, |(_, rep), (_, candidate)| {
            (rep - candidate).abs() <= tolerance
        })
        .into_iter()
        .filter_map(|cluster| {
            let (rep_index, rep_secs) = timed[cluster[0]];
            let label = format!("dur#{rep_index}@{rep_secs:.1}s");
            let members = cluster.iter().map(|&k| files[timed[k].0].clone()).collect();
            DetectionGroup::new(DetectionMethod::Duration, GroupKey::Cluster(label), members)
        })
        .collect();

        debug!(files = timed.len(), groups = groups.len(), tolerance, "duration clusters");
        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::DurationGrouping,
            groups: groups.len(),
            skipped: files.len() - timed.len(),
        });

        groups
    }

    /// Probe durations, then cluster the files that could be probed.
    pub fn group_by_duration(&self, files: &[MediaFile], prober: &dyn DurationProber) -> MethodReport {
        let probed = self.probe_durations(files, prober);
        let groups = self.cluster_by_duration(&probed.files);
        MethodReport::new(DetectionMethod::Duration, files.len(), groups, probed.warnings)
    }
}
