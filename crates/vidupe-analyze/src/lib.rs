//! Duplicate detection methods for vidupe.
//!
//! - **Exact grouping** - identical byte size, identical BLAKE3 digest
//! - **Approximate grouping** - similar file names, durations within a tolerance
//! - **Visual refinement** - duration candidates confirmed by sampled frames
//!
//! Name, duration and frame clustering are greedy: the first unclustered
//! file becomes a representative and later files are compared to it alone.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vidupe_analyze::{DetectionMethod, DuplicateDetector};
//! use vidupe_core::DetectionConfig;
//! use vidupe_media::FfprobeProber;
//! use vidupe_scan::{InventoryConfig, InventoryScanner};
//!
//! let inventory = InventoryScanner::new().scan(&InventoryConfig::new("/videos"))?;
//! let detector = DuplicateDetector::new(DetectionConfig::default())
//!     .with_prober(Arc::new(FfprobeProber::new()?));
//!
//! let report = detector.detect(&inventory, &[DetectionMethod::Hash, DetectionMethod::Duration])?;
//! println!("{report}");
//! ```

mod approximate;
mod cluster;
mod detector;
mod exact;
mod report;
pub mod similarity;
mod visual;

pub use approximate::{ApproximateGrouper, ProbedFiles};
pub use cluster::greedy_clusters;
pub use detector::{DetectError, DuplicateDetector};
pub use exact::{ExactGrouper, compute_digest};
pub use report::{DuplicateReport, MethodReport, format_duration, format_size};
pub use visual::{VisualRefiner, frame_correlation, normalize_frame, signature_similarity};

// Re-export core types
pub use vidupe_core::{DetectionGroup, DetectionMethod, GroupKey, MediaFile};
