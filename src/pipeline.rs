use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::Mask;

/// Data that flows through the pipeline.
/// Starts as the whole image; segmentation steps split it into one item per region.
#[derive(Clone)]
pub struct PipelineData {
    /// The working image (grayscale, edges, ...)
    pub image: DynamicImage,

    /// The decoded input image, shared by every item
    pub original: Arc<DynamicImage>,

    /// Region membership once a segmentation step has run
    pub mask: Option<Arc<Mask>>,

    /// Per-item measurements (e.g. "area", "predicted_iou")
    pub metadata: HashMap<String, MetadataValue>,
}

#[derive(Debug, Clone)]
pub enum MetadataValue {
    Float(f32),
    Int(i64),
}

impl PipelineData {
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            mask: None,
            metadata: HashMap::new(),
        }
    }

    /// Item for one segmented region of `original`
    pub fn from_region(image: DynamicImage, original: Arc<DynamicImage>, mask: Mask) -> Self {
        Self {
            image,
            original,
            mask: Some(Arc::new(mask)),
            metadata: HashMap::new(),
        }
    }

    /// Same item with a new working image
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            mask: self.mask.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order on one input image.
    ///
    /// `run_label` names the debug sub-directory so several images can share
    /// one debug root.
    pub fn run(&self, input: DynamicImage, run_label: &str) -> Result<Vec<PipelineData>> {
        let mut data = vec![PipelineData::from_image(input)];
        self.dump_debug(run_label, 0, "input", &data);

        for (step_idx, step) in self.steps.iter().enumerate() {
            debug!("Running step: {} (processing {} items)", step.name(), data.len());
            data = step
                .process(data, &self.context)
                .with_context(|| format!("pipeline step '{}' failed", step.name()))?;
            debug!("  → {} items", data.len());

            self.dump_debug(run_label, step_idx + 1, step.name(), &data);
        }

        Ok(data)
    }

    /// Debug dumps never fail the run; a write error is only reported.
    fn dump_debug(&self, run_label: &str, step_idx: usize, step_name: &str, data: &[PipelineData]) {
        if let Err(e) = self.save_debug(run_label, step_idx, step_name, data) {
            warn!("Debug output for {} step '{}' not saved: {:#}", run_label, step_name, e);
        }
    }

    fn save_debug(
        &self,
        run_label: &str,
        step_idx: usize,
        step_name: &str,
        data: &[PipelineData],
    ) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let step_dir_name = format!("{:02}_{}", step_idx, step_name.to_lowercase().replace(' ', "_"));
        let step_dir = debug_config.output_dir.join(run_label).join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        for (idx, item) in data.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            item.image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        }

        debug!("  Debug: saved {} images to {}/{}/", data.len(), run_label, step_dir_name);
        Ok(())
    }
}
