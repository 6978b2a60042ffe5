pub mod command;
pub mod rle;
pub mod segments;
pub mod steps;

use anyhow::Result;
use image::{DynamicImage, RgbImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{BoxCoords, CandidateRegion, Mask};
use crate::pipeline::Pipeline;
use steps::*;

pub use command::CommandEngine;

/// Knobs handed to the segmentation engine without reinterpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalParams {
    pub points_per_side: u32,
    pub pred_iou_thresh: f32,
    pub stability_score_thresh: f32,
    pub min_mask_region_area: u64,
}

impl Default for ProposalParams {
    fn default() -> Self {
        Self {
            points_per_side: 8,
            pred_iou_thresh: 0.85,
            stability_score_thresh: 0.88,
            min_mask_region_area: 800,
        }
    }
}

/// One mask as produced by a segmentation engine.
#[derive(Debug, Clone)]
pub struct RawProposal {
    pub mask: Mask,
    pub area: f64,
    pub predicted_iou: Option<f32>,
    pub stability_score: Option<f32>,
}

/// Anything that turns an RGB image into region masks.
///
/// `source` is the file the image was decoded from, for engines that run out
/// of process and read the file themselves.
pub trait SegmentationEngine {
    fn generate(&self, image: &RgbImage, source: &Path) -> Result<Vec<RawProposal>>;

    fn name(&self) -> &str;
}

/// Runs an engine and normalizes its masks into candidate regions.
pub struct RegionProposalAdapter {
    engine: Box<dyn SegmentationEngine>,
}

impl RegionProposalAdapter {
    pub fn new(engine: Box<dyn SegmentationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Candidate regions for one image, in the order the engine produced them.
    ///
    /// Zero proposals is a normal result. Masks that do not match the image
    /// size, are empty, or collapse to a zero-width/height box are dropped.
    pub fn propose(&self, image: &RgbImage, source: &Path) -> Result<Vec<CandidateRegion>> {
        let raw = self.engine.generate(image, source)?;
        let (width, height) = image.dimensions();
        debug!("{} returned {} raw proposals", self.engine.name(), raw.len());

        let mut candidates = Vec::with_capacity(raw.len());
        for (i, proposal) in raw.into_iter().enumerate() {
            if proposal.mask.width() != width || proposal.mask.height() != height {
                warn!(
                    "Proposal {} mask is {}x{}, image is {}x{}; dropped",
                    i + 1,
                    proposal.mask.width(),
                    proposal.mask.height(),
                    width,
                    height
                );
                continue;
            }
            if let Some(candidate) = candidate_from_mask(proposal.mask, proposal.area) {
                candidates.push(candidate);
            } else {
                debug!("Proposal {} has an empty or degenerate mask; dropped", i + 1);
            }
        }

        Ok(candidates)
    }
}

/// Tight axis-aligned box around a mask's member pixels.
pub fn candidate_from_mask(mask: Mask, area: f64) -> Option<CandidateRegion> {
    let (min_x, min_y, max_x, max_y) = mask.bounds()?;
    let bbox = BoxCoords::new(min_x, min_y, max_x, max_y)?;
    Some(CandidateRegion {
        bbox,
        area,
        mask: Some(Arc::new(mask)),
    })
}

/// Built-in segmenter: edge-delimited regions filtered like an automatic mask generator.
pub struct EdgeRegionEngine {
    pipeline: Pipeline,
    debug_counter: std::cell::Cell<usize>,
}

impl EdgeRegionEngine {
    pub fn new(params: &ProposalParams) -> Self {
        let pipeline = Pipeline::new()
            .add_step_boxed(Box::new(GrayscaleStep))
            .add_step_boxed(Box::new(BlurStep { sigma: 1.5 }))
            .add_step_boxed(Box::new(EdgeDetectionStep {
                low_threshold: 50.0,
                high_threshold: 100.0,
                dilation: 1,
            }))
            .add_step_boxed(Box::new(RegionSegmentationStep {
                min_mask_region_area: params.min_mask_region_area,
            }))
            .add_step_boxed(Box::new(PromptGridStep {
                points_per_side: params.points_per_side,
            }))
            .add_step_boxed(Box::new(MaskQualityStep {
                pred_iou_thresh: params.pred_iou_thresh,
                stability_score_thresh: params.stability_score_thresh,
            }));

        Self {
            pipeline,
            debug_counter: std::cell::Cell::new(0),
        }
    }

    /// Dump every intermediate step image under `output_dir` (must be empty).
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl SegmentationEngine for EdgeRegionEngine {
    fn generate(&self, image: &RgbImage, _source: &Path) -> Result<Vec<RawProposal>> {
        let run = self.debug_counter.get() + 1;
        self.debug_counter.set(run);

        let results = self
            .pipeline
            .run(DynamicImage::ImageRgb8(image.clone()), &format!("image_{:03}", run))?;

        Ok(results
            .into_iter()
            .filter_map(|item| {
                let mask = Mask::clone(item.mask.as_ref()?);
                let area = item
                    .get_int("area")
                    .map(|a| a as f64)
                    .unwrap_or_else(|| mask.pixel_count() as f64);
                Some(RawProposal {
                    mask,
                    area,
                    predicted_iou: item.get_float("predicted_iou"),
                    stability_score: item.get_float("stability_score"),
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "edge-region segmenter"
    }
}
