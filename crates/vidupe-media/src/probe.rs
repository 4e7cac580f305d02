//! Duration probing through ffprobe.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use vidupe_core::{DurationProber, SignalError};

use crate::FFPROBE;
use crate::process::{MediaToolError, ToolRunner};

/// Reads the container duration reported by `ffprobe -show_format`.
pub struct FfprobeProber {
    runner: ToolRunner,
}

impl FfprobeProber {
    /// Use `ffprobe` from `PATH`.
    pub fn new() -> Result<Self, MediaToolError> {
        Self::with_tool(FFPROBE)
    }

    /// Use a specific ffprobe binary.
    pub fn with_tool(tool: impl Into<String>) -> Result<Self, MediaToolError> {
        Ok(Self {
            runner: ToolRunner::new(tool)?,
        })
    }

    /// Name or path of the tool in use.
    pub fn tool(&self) -> &str {
        self.runner.tool()
    }
}

impl DurationProber for FfprobeProber {
    fn probe_duration(&self, path: &Path, timeout: Duration) -> Result<f64, SignalError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "quiet".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            path.as_os_str().to_owned(),
        ];
        let stdout = self.runner.run(args, path, timeout)?;
        parse_duration(&stdout, path)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<serde_json::Value>,
}

/// Extract `format.duration` from ffprobe's JSON output.
pub(crate) fn parse_duration(stdout: &[u8], path: &Path) -> Result<f64, SignalError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| SignalError::parse(path, format!("invalid ffprobe JSON: {e}")))?;

    let value = output
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| SignalError::parse(path, "no format duration reported"))?;

    // ffprobe prints the duration as a string; accept plain numbers too
    let seconds = match &value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| SignalError::parse(path, format!("unreadable duration {value}")))?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(SignalError::parse(path, format!("non-positive duration {seconds}")));
    }

    Ok(seconds)
}
