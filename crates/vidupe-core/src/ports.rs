//! Ports to the external media tools.
//!
//! Detection code only talks to these traits; `vidupe-media` provides the
//! ffprobe/ffmpeg adapters and tests provide deterministic doubles.

use std::path::Path;
use std::time::Duration;

use image::GrayImage;

use crate::error::SignalError;

/// Obtains the playback duration of a media file.
pub trait DurationProber: Send + Sync {
    /// Probe the duration in seconds, giving up after `timeout`.
    ///
    /// A missing or non-positive duration is an error, never a sentinel.
    fn probe_duration(&self, path: &Path, timeout: Duration) -> Result<f64, SignalError>;
}

/// Decodes a contiguous run of frames as grayscale images.
pub trait FrameSampler: Send + Sync {
    /// Decode frames from `start_secs` covering `window_secs`, in order.
    ///
    /// Frames may be of any size; callers normalize them.
    fn sample_frames(
        &self,
        path: &Path,
        start_secs: f64,
        window_secs: f64,
        timeout: Duration,
    ) -> Result<Vec<GrayImage>, SignalError>;
}
