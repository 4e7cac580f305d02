//! Frame-based refinement of duration groups.
//!
//! Each candidate gets a signature of grayscale thumbnails sampled from the
//! window starting at the middle of the video. Two signatures are compared
//! frame by frame with a zero-mean normalized cross-correlation; negative
//! correlations count as zero and the scores are averaged over the aligned
//! pairs.

use std::sync::Arc;

use image::GrayImage;
use image::imageops::{self, FilterType};

use vidupe_core::{
    DetectionConfig, DetectionEvent, DetectionGroup, DetectionMethod, FileWarning, FrameSampler,
    GroupKey, MediaFile, Reporter, Stage, VisualSignature, WarningKind, default_reporter,
};

use crate::cluster::greedy_clusters;
use crate::report::MethodReport;

/// Means closer than this count as equal when both frames are flat.
const FLAT_MEAN_EPSILON: f64 = 0.5;

/// Splits duration groups into visually confirmed groups.
pub struct VisualRefiner {
    config: DetectionConfig,
    reporter: Arc<dyn Reporter>,
}

impl VisualRefiner {
    /// Create a refiner that reports through `tracing`.
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_reporter(config, default_reporter())
    }

    /// Create a refiner that reports to the given sink.
    pub fn with_reporter(config: DetectionConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self { config, reporter }
    }

    /// Refine each duration group by visual similarity.
    ///
    /// Members are visited in the order they were encountered, as in the
    /// duration pass, so the first sampled member of each visual cluster is
    /// its representative. Files that are too short or
    /// cannot be decoded are reported as skipped and left out. Groups are
    /// labelled `<duration label>/frames#<n>`, numbering the surviving
    /// clusters of each duration group from zero.
    pub fn refine(&self, duration_groups: &[DetectionGroup], sampler: &dyn FrameSampler) -> MethodReport {
        let total: usize = duration_groups.iter().map(DetectionGroup::len).sum();
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::FrameExtraction,
            total,
        });

        let mut warnings = Vec::new();
        let mut sampled_groups: Vec<Vec<(MediaFile, VisualSignature)>> =
            Vec::with_capacity(duration_groups.len());

        for group in duration_groups {
            let mut sampled = Vec::with_capacity(group.len());
            for member in group.members_in_encounter_order() {
                self.reporter.report(DetectionEvent::Advanced {
                    stage: Stage::FrameExtraction,
                    path: member.path.clone(),
                });
                match self.extract_signature(member, sampler) {
                    Ok(signature) => sampled.push((member.clone(), signature)),
                    Err(warning) => {
                        self.reporter.report(DetectionEvent::Skipped {
                            stage: Stage::FrameExtraction,
                            warning: warning.clone(),
                        });
                        warnings.push(warning);
                    }
                }
            }
            sampled_groups.push(sampled);
        }

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::FrameExtraction,
            groups: 0,
            skipped: warnings.len(),
        });
        self.reporter.report(DetectionEvent::StageStarted {
            stage: Stage::FrameComparison,
            total: sampled_groups.iter().map(Vec::len).sum(),
        });

        let threshold = self.config.frame_similarity;
        let mut groups = Vec::new();

        for (group, sampled) in duration_groups.iter().zip(&sampled_groups) {
            let clusters = greedy_clusters(sampled, |(left, left_sig), (right, right_sig)| {
                let score = signature_similarity(left_sig, right_sig);
                self.reporter.report(DetectionEvent::Compared {
                    left: left.path.clone(),
                    right: right.path.clone(),
                    score,
                });
                score >= threshold
            });

            let mut ordinal = 0;
            for cluster in clusters {
                let members: Vec<MediaFile> = cluster
                    .iter()
                    .map(|&i| {
                        let (file, signature) = &sampled[i];
                        file.clone().with_signature(signature.clone())
                    })
                    .collect();
                let label = format!("{}/frames#{ordinal}", group.key);
                if let Some(refined) =
                    DetectionGroup::new(DetectionMethod::Frames, GroupKey::Cluster(label), members)
                {
                    groups.push(refined);
                    ordinal += 1;
                }
            }
        }

        self.reporter.report(DetectionEvent::StageFinished {
            stage: Stage::FrameComparison,
            groups: groups.len(),
            skipped: 0,
        });

        MethodReport::new(DetectionMethod::Frames, total, groups, warnings)
    }

    /// Sample and normalize the thumbnails of one file.
    pub fn extract_signature(
        &self,
        file: &MediaFile,
        sampler: &dyn FrameSampler,
    ) -> Result<VisualSignature, FileWarning> {
        let floor = self.config.min_visual_duration;
        let duration = file
            .known_duration()
            .ok_or_else(|| FileWarning::too_short(&file.path, None, floor))?;
        if duration < floor {
            return Err(FileWarning::too_short(&file.path, Some(duration), floor));
        }

        let frames = sampler
            .sample_frames(
                &file.path,
                duration / 2.0,
                self.config.extract_seconds,
                self.config.decode_timeout(),
            )
            .map_err(|e| FileWarning::from_signal(&file.path, &e, WarningKind::DecodeFailed))?;

        if frames.is_empty() {
            return Err(FileWarning::new(
                &file.path,
                "No frames decoded in sampling window",
                WarningKind::DecodeFailed,
            ));
        }

        let size = self.config.thumbnail_size;
        Ok(VisualSignature::new(
            frames.iter().map(|f| normalize_frame(f, size)).collect(),
        ))
    }
}

/// Resize a frame to a `size`×`size` thumbnail unless it already is one.
pub fn normalize_frame(frame: &GrayImage, size: u32) -> GrayImage {
    if frame.dimensions() == (size, size) {
        frame.clone()
    } else {
        imageops::resize(frame, size, size, FilterType::Triangle)
    }
}

/// Zero-mean normalized cross-correlation of two equally sized frames, in `[-1, 1]`.
///
/// Frames of different sizes score 0. A flat frame has no variance to
/// correlate: two flat frames of the same brightness score 1, any other
/// pairing with a flat frame scores 0.
pub fn frame_correlation(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.dimensions() != b.dimensions() {
        return 0.0;
    }
    let a = a.as_raw();
    let b = b.as_raw();
    if a.is_empty() {
        return 0.0;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
    let mean_b = b.iter().map(|&p| f64::from(p)).sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&pa, &pb) in a.iter().zip(b) {
        let da = f64::from(pa) - mean_a;
        let db = f64::from(pb) - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        let both_flat = var_a == 0.0 && var_b == 0.0;
        return if both_flat && (mean_a - mean_b).abs() < FLAT_MEAN_EPSILON {
            1.0
        } else {
            0.0
        };
    }

    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}

/// Mean clamped correlation over the aligned frame pairs of two signatures.
///
/// Only the first `min(len_a, len_b)` frames are compared. Returns 0 when
/// either signature is empty.
pub fn signature_similarity(a: &VisualSignature, b: &VisualSignature) -> f64 {
    let pairs = a.len().min(b.len());
    if pairs == 0 {
        return 0.0;
    }

    let total: f64 = a
        .frames()
        .iter()
        .zip(b.frames())
        .map(|(fa, fb)| frame_correlation(fa, fb).max(0.0))
        .sum();
    total / pairs as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(size: u32, shift: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| Luma([((x * 7 + y * 3 + shift) % 256) as u8]))
    }

    fn inverted(frame: &GrayImage) -> GrayImage {
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            Luma([255 - frame.get_pixel(x, y).0[0]])
        })
    }

    #[test]
    fn test_identical_frames_correlate_fully() {
        let frame = gradient(16, 0);
        assert!((frame_correlation(&frame, &frame) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_frames_are_clamped() {
        let frame = gradient(16, 0);
        let score = frame_correlation(&frame, &inverted(&frame));
        assert!(score < -0.99);

        let a = VisualSignature::new(vec![frame.clone()]);
        let b = VisualSignature::new(vec![inverted(&frame)]);
        assert_eq!(signature_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_flat_frames() {
        let black = GrayImage::new(8, 8);
        let white = GrayImage::from_pixel(8, 8, Luma([255]));
        assert_eq!(frame_correlation(&black, &black), 1.0);
        assert_eq!(frame_correlation(&black, &white), 0.0);
        assert_eq!(frame_correlation(&black, &gradient(8, 0)), 0.0);
    }

    #[test]
    fn test_signature_uses_shorter_length() {
        let frame = gradient(16, 0);
        let a = VisualSignature::new(vec![frame.clone(), frame.clone(), frame.clone()]);
        let b = VisualSignature::new(vec![frame.clone()]);
        assert!((signature_similarity(&a, &b) - 1.0).abs() < 1e-9);
        assert_eq!(signature_similarity(&a, &VisualSignature::default()), 0.0);
    }

    #[test]
    fn test_normalize_frame() {
        let frame = gradient(100, 0);
        assert_eq!(normalize_frame(&frame, 64).dimensions(), (64, 64));
        let thumb = gradient(64, 0);
        assert_eq!(normalize_frame(&thumb, 64), thumb);
    }
}
