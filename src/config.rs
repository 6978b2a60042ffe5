use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::annotation::OverwritePolicy;
use crate::capture::PALETTE_SIZE;
use crate::fallback::{ExternalTool, ManualFallback, NoFallback};
use crate::proposal::{CommandEngine, EdgeRegionEngine, ProposalParams, SegmentationEngine};
use crate::ranking::DEFAULT_MAX_CANDIDATES;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_true")]
    pub manual_capture: bool,
    #[serde(default = "default_overlay_dir")]
    pub overlay_dir: PathBuf,
    /// Font used to write rank numbers on the overlay
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Builtin,
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_checkpoint")]
    pub checkpoint: PathBuf,
    #[serde(flatten)]
    pub params: ProposalParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_tool")]
    pub tool: Option<String>,
}

// Default value functions
fn default_input_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./voc_output")
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

fn default_true() -> bool {
    true
}

fn default_overlay_dir() -> PathBuf {
    PathBuf::from("./review")
}

fn default_checkpoint() -> PathBuf {
    PathBuf::from("./sam_vit_b_01ec64.pth")
}

fn default_fallback_tool() -> Option<String> {
    Some("labelImg".to_string())
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            extensions: default_extensions(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            skip_existing: false,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            manual_capture: true,
            overlay_dir: default_overlay_dir(),
            font: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            command: None,
            checkpoint: default_checkpoint(),
            params: ProposalParams::default(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            tool: default_fallback_tool(),
        }
    }
}

impl AppConfig {
    pub fn overwrite_policy(&self) -> OverwritePolicy {
        if self.output.skip_existing {
            OverwritePolicy::SkipExisting
        } else {
            OverwritePolicy::Overwrite
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.review.max_candidates == 0 {
            bail!("max_candidates must be at least 1");
        }
        if self.review.font.is_none() && self.review.max_candidates > PALETTE_SIZE {
            bail!(
                "max_candidates above {} needs review.font (or --font) so overlays can be numbered",
                PALETTE_SIZE
            );
        }
        if self.input.extensions.is_empty() {
            bail!("at least one image extension is required");
        }
        if self.engine.kind == EngineKind::Command && self.engine.command.is_none() {
            bail!("engine kind 'command' needs engine.command (or --engine-command)");
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Construct the configured engine. The external engine checks its
    /// checkpoint here, so missing weights stop the run before any image.
    pub fn build(&self, debug_out: Option<PathBuf>) -> Result<Box<dyn SegmentationEngine>> {
        match self.kind {
            EngineKind::Builtin => {
                let mut engine = EdgeRegionEngine::new(&self.params);
                if let Some(dir) = debug_out {
                    engine = engine.with_debug(dir)?;
                }
                Ok(Box::new(engine))
            }
            EngineKind::Command => {
                let Some(program) = &self.command else {
                    bail!("engine kind 'command' needs a program to run");
                };
                Ok(Box::new(CommandEngine::new(
                    program.clone(),
                    self.checkpoint.clone(),
                    self.params.clone(),
                )?))
            }
        }
    }
}

impl FallbackConfig {
    pub fn build(&self) -> Box<dyn ManualFallback> {
        match &self.tool {
            Some(program) if !program.trim().is_empty() => Box::new(ExternalTool::new(program.clone())),
            _ => Box::new(NoFallback),
        }
    }
}

/// Load configuration from a TOML file; defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    Ok(toml::from_str(content)?)
}
