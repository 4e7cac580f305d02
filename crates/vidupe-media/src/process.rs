//! Bounded execution of external tools.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use vidupe_core::SignalError;

/// Longest stderr excerpt kept in a failure message.
const STDERR_EXCERPT: usize = 240;

/// Failure to set up an adapter.
#[derive(Debug, Error)]
pub enum MediaToolError {
    /// The private runtime used to supervise child processes could not start.
    #[error("Failed to start process runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Runs one external tool with a deadline per invocation.
pub(crate) struct ToolRunner {
    tool: String,
    runtime: Runtime,
}

impl ToolRunner {
    /// Create a runner for `tool` (a program name or path).
    pub(crate) fn new(tool: impl Into<String>) -> Result<Self, MediaToolError> {
        let runtime = Builder::new_current_thread()
            .thread_name("vidupe-media")
            .enable_all()
            .build()?;

        Ok(Self {
            tool: tool.into(),
            runtime,
        })
    }

    pub(crate) fn tool(&self) -> &str {
        &self.tool
    }

    /// Run the tool against `path` and return its stdout.
    ///
    /// The child is killed when `timeout` expires.
    pub(crate) fn run(
        &self,
        args: Vec<OsString>,
        path: &Path,
        timeout: Duration,
    ) -> Result<Vec<u8>, SignalError> {
        debug!(tool = %self.tool, path = %path.display(), ?timeout, "running");

        self.runtime.block_on(async {
            let child = Command::new(&self.tool)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| SignalError::ToolMissing {
                    tool: self.tool.clone(),
                    source,
                })?;

            // Dropping the timed-out future drops the child, which kills it.
            let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(result) => result.map_err(|e| SignalError::io(path, e))?,
                Err(_) => {
                    return Err(SignalError::Timeout {
                        path: path.to_path_buf(),
                        after: timeout,
                    });
                }
            };

            if !output.status.success() {
                let stderr: String = String::from_utf8_lossy(&output.stderr)
                    .trim()
                    .chars()
                    .take(STDERR_EXCERPT)
                    .collect();
                return Err(SignalError::ToolFailed {
                    tool: self.tool.clone(),
                    path: path.to_path_buf(),
                    status: output.status.to_string(),
                    stderr,
                });
            }

            Ok(output.stdout)
        })
    }
}

/// Check whether a tool can be started (`<tool> -version` succeeds).
pub fn tool_available(tool: &str) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
