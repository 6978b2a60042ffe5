use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::process::Command;

/// Hands an image to a manual labeling tool when no candidate was usable.
/// Whatever the tool produces is outside this crate's control.
pub trait ManualFallback {
    fn launch(&mut self, image_path: &Path) -> Result<()>;
}

/// Runs `<program> <image>` and waits for it to exit (e.g. `labelImg`).
pub struct ExternalTool {
    program: String,
}

impl ExternalTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl ManualFallback for ExternalTool {
    fn launch(&mut self, image_path: &Path) -> Result<()> {
        info!("Opening {} for manual labeling of {}", self.program, image_path.display());
        let status = Command::new(&self.program)
            .arg(image_path)
            .status()
            .with_context(|| format!("failed to start manual labeling tool '{}'", self.program))?;
        if !status.success() {
            warn!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// No external tool configured; the image is simply skipped.
pub struct NoFallback;

impl ManualFallback for NoFallback {
    fn launch(&mut self, image_path: &Path) -> Result<()> {
        info!("No manual labeling tool configured; skipping {}", image_path.display());
        Ok(())
    }
}
