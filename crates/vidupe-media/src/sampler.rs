//! Frame sampling through ffmpeg.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use image::GrayImage;

use vidupe_core::{FrameSampler, SignalError};

use crate::FFMPEG;
use crate::process::{MediaToolError, ToolRunner};

/// Decodes a time window to raw square grayscale frames with ffmpeg.
///
/// Scaling happens inside ffmpeg so only `frame_size`² bytes per frame cross
/// the pipe.
pub struct FfmpegSampler {
    runner: ToolRunner,
    frame_size: u32,
}

impl FfmpegSampler {
    /// Use `ffmpeg` from `PATH`, producing `frame_size`×`frame_size` frames.
    pub fn new(frame_size: u32) -> Result<Self, MediaToolError> {
        Self::with_tool(FFMPEG, frame_size)
    }

    /// Use a specific ffmpeg binary.
    pub fn with_tool(tool: impl Into<String>, frame_size: u32) -> Result<Self, MediaToolError> {
        Ok(Self {
            runner: ToolRunner::new(tool)?,
            frame_size: frame_size.max(1),
        })
    }

    /// Edge length of produced frames.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    fn args(&self, path: &Path, start_secs: f64, window_secs: f64) -> Vec<OsString> {
        let size = self.frame_size;
        vec![
            "-nostdin".into(),
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{start_secs:.3}").into(),
            "-i".into(),
            path.as_os_str().to_owned(),
            "-t".into(),
            format!("{window_secs:.3}").into(),
            "-an".into(),
            "-vf".into(),
            format!("scale={size}:{size}:flags=area,format=gray").into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "gray".into(),
            "-".into(),
        ]
    }
}

impl FrameSampler for FfmpegSampler {
    fn sample_frames(
        &self,
        path: &Path,
        start_secs: f64,
        window_secs: f64,
        timeout: Duration,
    ) -> Result<Vec<GrayImage>, SignalError> {
        let stdout = self
            .runner
            .run(self.args(path, start_secs, window_secs), path, timeout)?;
        split_frames(stdout, self.frame_size, path)
    }
}

/// Cut a raw gray8 stream into square frames; a trailing partial frame is dropped.
pub(crate) fn split_frames(raw: Vec<u8>, size: u32, path: &Path) -> Result<Vec<GrayImage>, SignalError> {
    let frame_len = (size as usize) * (size as usize);
    let frames: Vec<GrayImage> = raw
        .chunks_exact(frame_len)
        .filter_map(|chunk| GrayImage::from_raw(size, size, chunk.to_vec()))
        .collect();

    if frames.is_empty() {
        return Err(SignalError::parse(path, "no frames decoded in sampling window"));
    }
    Ok(frames)
}
