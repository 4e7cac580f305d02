//! Detection groups and the methods that produce them.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::media::{ContentHash, MediaFile};

/// A duplicate detection method.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DetectionMethod {
    /// Byte-identical size.
    Size,
    /// Identical content digest.
    Hash,
    /// Similar file names.
    Name,
    /// Durations within a tolerance.
    Duration,
    /// Duration candidates confirmed by sampled frames.
    Frames,
}

impl DetectionMethod {
    /// Human-readable title for reports.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Size => "File size",
            Self::Hash => "Content hash",
            Self::Name => "Name similarity",
            Self::Duration => "Duration",
            Self::Frames => "Duration + frames",
        }
    }

    /// Rank used when picking a group set to resolve; lower is more trusted.
    ///
    /// Size and name groups are never resolved automatically.
    pub fn resolution_rank(&self) -> Option<u8> {
        match self {
            Self::Hash => Some(0),
            Self::Frames => Some(1),
            Self::Duration => Some(2),
            Self::Size | Self::Name => None,
        }
    }
}

/// Key shared by all members of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum GroupKey {
    /// The shared byte size.
    Size(u64),
    /// The shared content digest.
    Digest(ContentHash),
    /// Synthetic label naming the cluster's representative.
    Cluster(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "size:{size}"),
            Self::Digest(hash) => write!(f, "blake3:{}", &hash.to_hex()[..16]),
            Self::Cluster(label) => f.write_str(label),
        }
    }
}

/// A set of files judged equivalent under one detection method.
///
/// Members are held in size-descending order; the sort is stable so files of
/// equal size keep their inventory order and the first one is the file to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionGroup {
    /// Method that produced this group.
    pub method: DetectionMethod,

    /// Key shared by the members.
    pub key: GroupKey,

    members: Vec<MediaFile>,

    /// Position in `members` of each member, in encounter order.
    #[serde(default)]
    encounter_order: Vec<usize>,

    /// Size of the first-encountered member.
    reference_size: u64,
}

impl DetectionGroup {
    /// Build a duplicate group from members in encounter order.
    ///
    /// Returns `None` for fewer than two members: singletons are never
    /// duplicate groups.
    pub fn new(method: DetectionMethod, key: GroupKey, members: Vec<MediaFile>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }

        let reference_size = members[0].size;
        let mut indexed: Vec<(usize, MediaFile)> = members.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| b.1.size.cmp(&a.1.size));

        let mut encounter_order = vec![0; indexed.len()];
        for (position, (encountered, _)) in indexed.iter().enumerate() {
            encounter_order[*encountered] = position;
        }

        Some(Self {
            method,
            key,
            members: indexed.into_iter().map(|(_, member)| member).collect(),
            encounter_order,
            reference_size,
        })
    }

    /// Members in size-descending order.
    pub fn members(&self) -> &[MediaFile] {
        &self.members
    }

    /// Members in the order they were handed to [`Self::new`].
    ///
    /// Falls back to size order for groups deserialized without that order.
    pub fn members_in_encounter_order(&self) -> Vec<&MediaFile> {
        if self.encounter_order.len() != self.members.len() {
            return self.members.iter().collect();
        }
        self.encounter_order
            .iter()
            .filter_map(|&position| self.members.get(position))
            .collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a constructed group; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The member to keep: largest size, first encountered on ties.
    pub fn kept(&self) -> &MediaFile {
        &self.members[0]
    }

    /// Members that could be removed while keeping [`Self::kept`].
    pub fn removable(&self) -> &[MediaFile] {
        &self.members[1..]
    }

    /// Number of redundant copies.
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Size of the first-encountered member.
    pub fn reference_size(&self) -> u64 {
        self.reference_size
    }

    /// Wasted space: reference size times redundant copies.
    pub fn wasted_bytes(&self) -> u64 {
        self.reference_size * self.duplicate_count() as u64
    }

    /// Check whether a path is a member.
    pub fn contains(&self, path: &Path) -> bool {
        self.members.iter().any(|m| m.path == path)
    }
}
