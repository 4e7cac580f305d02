//! Media file records and the signals detection methods attach to them.

use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// BLAKE3 content digest over a file's full byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Ordered grayscale thumbnails sampled from the midpoint window of a video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualSignature {
    frames: Vec<GrayImage>,
}

impl VisualSignature {
    /// Wrap an ordered sequence of thumbnails.
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self { frames }
    }

    /// The thumbnails in sampling order.
    pub fn frames(&self) -> &[GrayImage] {
        &self.frames
    }

    /// Number of sampled thumbnails.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no thumbnail was sampled.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Identity record for one candidate file.
///
/// The inventory hands out records with only `path`, `size` and `name`
/// populated. Detection methods work on their own clones and fill in the
/// optional signals they compute, so the inventory itself stays read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path; unique within an inventory.
    pub path: PathBuf,

    /// Size in bytes.
    pub size: u64,

    /// Bare file name used for display and name similarity.
    pub name: CompactString,

    /// Content digest, set by the hash method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentHash>,

    /// Duration in seconds, set by the duration method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Sampled thumbnails, set by the visual refiner.
    #[serde(skip)]
    pub signature: Option<VisualSignature>,
}

impl MediaFile {
    /// Create a record for a file with unknown signals.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));

        Self {
            path,
            size,
            name,
            digest: None,
            duration: None,
            signature: None,
        }
    }

    /// Attach a content digest.
    pub fn with_digest(mut self, digest: ContentHash) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Attach a duration in seconds.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Attach a visual signature.
    pub fn with_signature(mut self, signature: VisualSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Borrow the path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in seconds when it is known and positive.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}
