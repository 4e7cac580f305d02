//! External media tool adapters for vidupe.
//!
//! Implements the [`DurationProber`] and [`FrameSampler`] ports by running
//! `ffprobe` and `ffmpeg` as child processes. Every invocation is bounded by
//! the timeout passed through the port; an expired child is killed and the
//! file is reported as having an unknown signal.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use vidupe_media::{DurationProber, FfprobeProber};
//!
//! let prober = FfprobeProber::new().unwrap();
//! let secs = prober.probe_duration(Path::new("movie.mkv"), Duration::from_secs(30));
//! ```

mod probe;
mod process;
mod sampler;

pub use probe::FfprobeProber;
pub use process::{MediaToolError, tool_available};
pub use sampler::FfmpegSampler;

pub use vidupe_core::{DurationProber, FrameSampler, SignalError};

/// Default name of the probing tool.
pub const FFPROBE: &str = "ffprobe";

/// Default name of the decoding tool.
pub const FFMPEG: &str = "ffmpeg";
