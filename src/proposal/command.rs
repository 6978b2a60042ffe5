use anyhow::{Context, Result, bail};
use image::RgbImage;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::rle::{CocoRle, decode_rle};
use super::{ProposalParams, RawProposal, SegmentationEngine};

/// One record of the JSON array an external segmenter prints on stdout
#[derive(Debug, Deserialize)]
pub struct CommandProposal {
    pub area: f64,
    pub segmentation: CocoRle,
    #[serde(default)]
    pub predicted_iou: Option<f32>,
    #[serde(default)]
    pub stability_score: Option<f32>,
}

/// Out-of-process segmenter (e.g. a SAM wrapper script) driven through its CLI
pub struct CommandEngine {
    program: String,
    checkpoint: PathBuf,
    params: ProposalParams,
}

impl CommandEngine {
    /// Fails when the model checkpoint is missing.
    pub fn new(program: impl Into<String>, checkpoint: PathBuf, params: ProposalParams) -> Result<Self> {
        if !checkpoint.is_file() {
            bail!(
                "Model weights not found at {}. Download them and place them at that location.",
                checkpoint.display()
            );
        }

        Ok(Self {
            program: program.into(),
            checkpoint,
            params,
        })
    }

    pub fn args_for(&self, image_path: &Path) -> Vec<String> {
        vec![
            "--checkpoint".to_string(),
            self.checkpoint.display().to_string(),
            "--points-per-side".to_string(),
            self.params.points_per_side.to_string(),
            "--pred-iou-thresh".to_string(),
            self.params.pred_iou_thresh.to_string(),
            "--stability-score-thresh".to_string(),
            self.params.stability_score_thresh.to_string(),
            "--min-mask-region-area".to_string(),
            self.params.min_mask_region_area.to_string(),
            image_path.display().to_string(),
        ]
    }
}

/// Parse the segmenter's stdout into raw proposals for a `width` x `height`
/// image. Records whose RLE cannot be decoded are skipped with a warning.
pub fn parse_proposals(json: &str, width: u32, height: u32) -> Result<Vec<RawProposal>> {
    let records: Vec<CommandProposal> =
        serde_json::from_str(json).context("segmenter output is not a JSON array of masks")?;

    let mut proposals = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        match decode_rle(&record.segmentation, width, height) {
            Ok(mask) => proposals.push(RawProposal {
                mask,
                area: record.area,
                predicted_iou: record.predicted_iou,
                stability_score: record.stability_score,
            }),
            Err(e) => warn!("Skipping mask {}: {}", i + 1, e),
        }
    }

    Ok(proposals)
}

impl SegmentationEngine for CommandEngine {
    fn generate(&self, image: &RgbImage, source: &Path) -> Result<Vec<RawProposal>> {
        let args = self.args_for(source);
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("failed to start segmenter '{}'", self.program))?;

        if !output.status.success() {
            bail!(
                "segmenter '{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let (width, height) = image.dimensions();
        parse_proposals(&String::from_utf8_lossy(&output.stdout), width, height)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
