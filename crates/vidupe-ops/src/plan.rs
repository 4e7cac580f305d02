//! Keep/remove split for a set of duplicate groups.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vidupe_core::{DetectionGroup, DetectionMethod, GroupKey, MediaFile};

/// What happens to one group's members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Method of the source group.
    pub method: DetectionMethod,
    /// Key of the source group.
    pub key: GroupKey,
    /// The member that stays: largest, first encountered on ties.
    pub keep: MediaFile,
    /// Members scheduled for removal, in group order.
    pub remove: Vec<MediaFile>,
}

/// Removal schedule for a set of groups.
///
/// Built and consumed within one resolution; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionPlan {
    entries: Vec<PlanEntry>,
}

impl DeletionPlan {
    /// Split each group into the file to keep and the files to remove.
    ///
    /// Groups with fewer than two members are skipped. A file kept by any
    /// group is never scheduled for removal, even if another group lists it
    /// as redundant, and each path is scheduled at most once.
    pub fn build(groups: &[DetectionGroup]) -> Self {
        let eligible = || groups.iter().filter(|g| g.len() >= 2);
        let kept: HashSet<&Path> = eligible().map(|g| g.kept().path()).collect();
        let mut scheduled: HashSet<PathBuf> = HashSet::new();

        let entries = eligible()
            .map(|group| {
                let remove = group
                    .removable()
                    .iter()
                    .filter(|m| !kept.contains(m.path()) && scheduled.insert(m.path.clone()))
                    .cloned()
                    .collect();

                PlanEntry {
                    method: group.method,
                    key: group.key.clone(),
                    keep: group.kept().clone(),
                    remove,
                }
            })
            .collect();

        Self { entries }
    }

    /// Per-group entries in group order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Every scheduled removal, in order.
    pub fn removals(&self) -> impl Iterator<Item = &MediaFile> {
        self.entries.iter().flat_map(|e| e.remove.iter())
    }

    /// Number of scheduled removals.
    pub fn removal_count(&self) -> usize {
        self.entries.iter().map(|e| e.remove.len()).sum()
    }

    /// Bytes the removals would free.
    pub fn bytes_to_free(&self) -> u64 {
        self.removals().map(|m| m.size).sum()
    }

    /// Check whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.removal_count() == 0
    }

    /// Check whether a path is kept by some entry.
    pub fn keeps(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.keep.path == path)
    }
}
