//! Viewer invocation (Step 2 in the pipeline).
//! Runs the external viewer with no arguments, blocking until it exits, and
//! captures everything it wrote to stdout. Stderr stays attached to the
//! terminal so the viewer's own interactive messages remain visible.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Runs the viewer to completion and returns its full stdout as text.
pub fn capture(viewer: &Path) -> Result<String> {
    info!("running {}", viewer.display());
    let output = Command::new(viewer)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("failed to run {}", viewer.display()))?;

    if !output.status.success() {
        // The report may still be complete; validation decides, not the
        // viewer's exit code.
        warn!("{} exited with {}", viewer.display(), output.status);
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    info!("captured {} bytes of viewer output", text.len());
    Ok(text)
}
