//! Executes or simulates a deletion plan.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{info, warn};

use vidupe_analyze::DuplicateReport;
use vidupe_core::{
    DetectionEvent, DetectionGroup, DetectionMethod, FileWarning, Reporter, Stage, WarningKind,
    default_reporter,
};

use crate::plan::DeletionPlan;

/// How scheduled removals are carried out.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RemovalMode {
    /// Report the plan without touching the filesystem.
    #[default]
    DryRun,
    /// Remove files permanently.
    Delete,
    /// Move files to the system trash.
    Trash,
}

impl RemovalMode {
    /// Check whether this mode leaves the filesystem untouched.
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// A removal that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", path.display())]
pub struct RemovalError {
    /// The path that could not be removed.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl RemovalError {
    /// Create a new removal error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of one resolution call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Mode the plan was carried out in.
    pub mode: RemovalMode,
    /// The plan that was carried out.
    pub plan: DeletionPlan,
    /// Files removed, or that would be removed in a dry run.
    pub removed: usize,
    /// Files that could not be removed.
    pub failed: usize,
    /// Bytes freed, or that would be freed in a dry run.
    pub bytes_freed: u64,
    /// One entry per failed removal.
    pub errors: Vec<RemovalError>,
}

impl ResolutionOutcome {
    /// `(removed, failed)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.removed, self.failed)
    }

    /// Check if every scheduled removal succeeded.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the outcome.
    pub fn summary(&self) -> String {
        let action = match self.mode {
            RemovalMode::DryRun => "Would remove",
            RemovalMode::Delete => "Removed",
            RemovalMode::Trash => "Moved to trash",
        };

        if self.failed == 0 {
            format!("{action} {} files", self.removed)
        } else {
            format!("{action} {} files, {} failed", self.removed, self.failed)
        }
    }
}

/// Pick the group set to resolve when several methods ran.
///
/// Content hash groups win over frame-confirmed groups, which win over plain
/// duration groups. Size and name groups are never chosen. Returns `None`
/// when none of those methods produced a group.
pub fn select_for_resolution(report: &DuplicateReport) -> Option<(DetectionMethod, &[DetectionGroup])> {
    let mut candidates: Vec<(u8, DetectionMethod)> = report
        .methods
        .keys()
        .filter_map(|m| m.resolution_rank().map(|rank| (rank, *m)))
        .collect();
    candidates.sort_unstable();

    candidates
        .into_iter()
        .map(|(_, method)| (method, report.groups(method)))
        .find(|(_, groups)| !groups.is_empty())
}

/// Turns duplicate groups into removals, one file at a time.
///
/// Removals run strictly sequentially so that no two removals touching the
/// same group are ever in flight together. A failed removal is recorded and
/// the remaining removals still run.
pub struct DuplicateResolver {
    reporter: Arc<dyn Reporter>,
}

impl DuplicateResolver {
    /// Create a resolver that reports through `tracing`.
    pub fn new() -> Self {
        Self {
            reporter: default_reporter(),
        }
    }

    /// Create a resolver that reports to the given sink.
    pub fn with_reporter(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    /// Build the plan for `groups` without carrying it out.
    pub fn plan(&self, groups: &[DetectionGroup]) -> DeletionPlan {
        DeletionPlan::build(groups)
    }

    /// Keep the largest member of each group and remove the rest per `mode`.
    pub fn resolve(&self, groups: &[DetectionGroup], mode: RemovalMode) -> ResolutionOutcome {
        let plan = self.plan(groups);
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::Resolution,
            total: plan.removal_count(),
        });

        let mut outcome = ResolutionOutcome {
            mode,
            ..ResolutionOutcome::default()
        };

        for entry in plan.entries() {
            for file in &entry.remove {
                self.reporter.report(DetectionEvent::Advanced {
                    stage: Stage::Resolution,
                    path: file.path.clone(),
                });

                match remove(&file.path, mode) {
                    Ok(()) => {
                        info!(
                            %mode,
                            keep = %entry.keep.path.display(),
                            remove = %file.path.display(),
                            "duplicate removed"
                        );
                        outcome.removed += 1;
                        outcome.bytes_freed += file.size;
                    }
                    Err(err) => {
                        warn!(path = %file.path.display(), error = %err.message, "removal failed");
                        self.reporter.report(DetectionEvent::Skipped {
                            stage: Stage::Resolution,
                            warning: FileWarning::new(
                                &err.path,
                                err.message.clone(),
                                WarningKind::RemoveFailed,
                            ),
                        });
                        outcome.failed += 1;
                        outcome.errors.push(err);
                    }
                }
            }
        }

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::Resolution,
            groups: plan.entries().len(),
            skipped: outcome.failed,
        });

        outcome.plan = plan;
        outcome
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn remove(path: &Path, mode: RemovalMode) -> Result<(), RemovalError> {
    match mode {
        RemovalMode::DryRun => Ok(()),
        RemovalMode::Delete => {
            fs::remove_file(path).map_err(|e| RemovalError::new(path, e.to_string()))
        }
        RemovalMode::Trash => {
            if !path.exists() {
                return Err(RemovalError::new(path, "file no longer exists"));
            }
            trash::delete(path).map_err(|e| RemovalError::new(path, format!("trash error: {e}")))
        }
    }
}
