//! The bd subprocess.
//!
//! Arguments pass through verbatim, output is captured and then forwarded
//! unmodified, and the tracker's exit code becomes the wrapper's (unless an
//! un-overridden pre-flight rejection forces it non-zero afterwards).

use std::io::Write;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Name of the tracker binary on `PATH`.
pub const TRACKER_BIN: &str = "bd";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to run `{TRACKER_BIN}`: {0} (is bd installed and on PATH?)")]
    Spawn(#[from] std::io::Error),
}

/// Captured tracker output.
#[derive(Debug)]
pub struct TrackerOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl TrackerOutput {
    /// Forward captured output to this process's own streams.
    pub fn forward(&self) {
        let mut out = std::io::stdout();
        let _ = out.write_all(&self.stdout);
        let _ = out.flush();
        let mut err = std::io::stderr();
        let _ = err.write_all(&self.stderr);
        let _ = err.flush();
    }
}

/// Run the tracker with the given argument vector.
pub async fn run_tracker(args: &[String]) -> Result<TrackerOutput, TrackerError> {
    debug!(?args, "running tracker");
    let output = Command::new(TRACKER_BIN).args(args).output().await?;

    Ok(TrackerOutput {
        stdout: output.stdout,
        stderr: output.stderr,
        // Termination by signal has no code; report it as failure.
        exit_code: output.status.code().unwrap_or(1),
    })
}
