#![allow(dead_code)]

use anyhow::bail;
use image::{ImageBuffer, Rgb, RgbImage};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use voclabel::capture::{Drag, ReviewSurface};
use voclabel::fallback::ManualFallback;
use voclabel::prompt::Prompter;
use voclabel::ranking::RankedCandidate;
use voclabel::{
    BoxCoords, CandidateRegion, ImageEntry, Mask, RawProposal, RegionProposalAdapter, SegmentationEngine,
};

/// Writes a solid grey test image into `dir` and returns its entry.
pub fn create_test_image(dir: &Path, filename: &str, width: u32, height: u32) -> ImageEntry {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([128u8, 128u8, 128u8]));
    let path = dir.join(filename);
    img.save(&path).expect("Failed to save test image");
    ImageEntry {
        path,
        filename: filename.to_string(),
    }
}

/// A file with an image extension that no decoder accepts.
pub fn create_corrupt_image(dir: &Path, filename: &str) -> ImageEntry {
    let path = dir.join(filename);
    std::fs::write(&path, b"definitely not a jpeg").expect("Failed to write corrupt image");
    ImageEntry {
        path,
        filename: filename.to_string(),
    }
}

pub fn bbox(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> BoxCoords {
    BoxCoords::new(xmin, ymin, xmax, ymax).expect("test box must be non-empty")
}

/// Mask covering the inclusive rectangle.
pub fn rect_mask(width: u32, height: u32, b: BoxCoords) -> Mask {
    let mut mask = Mask::empty(width, height);
    for y in b.ymin..=b.ymax {
        for x in b.xmin..=b.xmax {
            mask.set(x, y, true);
        }
    }
    mask
}

pub fn region_with_area(xmin: u32, area: f64) -> CandidateRegion {
    CandidateRegion {
        bbox: bbox(xmin, 0, xmin + 1, 1),
        area,
        mask: None,
    }
}

/// Engine that returns rectangles configured per file name.
#[derive(Default)]
pub struct StubEngine {
    boxes: HashMap<String, Vec<BoxCoords>>,
    fail_for: Vec<String>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boxes(mut self, filename: &str, boxes: Vec<BoxCoords>) -> Self {
        self.boxes.insert(filename.to_string(), boxes);
        self
    }

    pub fn failing_for(mut self, filename: &str) -> Self {
        self.fail_for.push(filename.to_string());
        self
    }
}

impl SegmentationEngine for StubEngine {
    fn generate(&self, image: &RgbImage, source: &Path) -> anyhow::Result<Vec<RawProposal>> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_for.contains(&name) {
            bail!("stub engine told to fail for {}", name);
        }
        let (width, height) = image.dimensions();
        Ok(self
            .boxes
            .get(&name)
            .into_iter()
            .flatten()
            .map(|b| {
                let mask = rect_mask(width, height, *b);
                RawProposal {
                    area: mask.pixel_count() as f64,
                    mask,
                    predicted_iou: None,
                    stability_score: None,
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn stub_adapter(engine: StubEngine) -> RegionProposalAdapter {
    RegionProposalAdapter::new(Box::new(engine))
}

/// Answers prompts from a fixed script and records everything shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn saw(&self, line: &str) -> bool {
        self.transcript.iter().any(|l| l == line)
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        self.transcript.push(prompt.to_string());
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("input closed"),
        }
    }

    fn say(&mut self, line: &str) -> anyhow::Result<()> {
        self.transcript.push(line.to_string());
        Ok(())
    }
}

/// Records shown candidates and replays scripted drags.
#[derive(Default)]
pub struct RecordingSurface {
    pub shown: Vec<(String, Vec<BoxCoords>)>,
    pub drags: VecDeque<Option<Drag>>,
    pub capture_requests: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drag(mut self, drag: Option<Drag>) -> Self {
        self.drags.push_back(drag);
        self
    }
}

impl ReviewSurface for RecordingSurface {
    fn show_candidates(
        &mut self,
        _prompter: &mut dyn Prompter,
        image_name: &str,
        _image: &RgbImage,
        ranked: &[RankedCandidate],
    ) -> anyhow::Result<()> {
        self.shown.push((
            image_name.to_string(),
            ranked.iter().map(|c| c.region.bbox).collect(),
        ));
        Ok(())
    }

    fn capture_drag(
        &mut self,
        _prompter: &mut dyn Prompter,
        _image_name: &str,
        _image: &RgbImage,
    ) -> anyhow::Result<Option<Drag>> {
        self.capture_requests += 1;
        Ok(self.drags.pop_front().flatten())
    }
}

#[derive(Default)]
pub struct RecordingFallback {
    pub launched: Vec<PathBuf>,
}

impl ManualFallback for RecordingFallback {
    fn launch(&mut self, image_path: &Path) -> anyhow::Result<()> {
        self.launched.push(image_path.to_path_buf());
        Ok(())
    }
}
