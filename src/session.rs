//! Per-image review loop: proposals → ranked review → selection → labeling → file.
//!
//! The vocabulary is not owned here. Callers pass it into every image so the
//! labels created on one image are offered again on the next.

use anyhow::Result;
use image::RgbImage;
use log::{debug, error, info, warn};
use std::fmt;
use std::path::PathBuf;

use crate::annotation::AnnotationWriter;
use crate::capture::{ReviewSurface, region_from_drag};
use crate::fallback::ManualFallback;
use crate::models::{CandidateRegion, ImageAnnotation, ImageEntry, LabeledBox};
use crate::prompt::Prompter;
use crate::proposal::RegionProposalAdapter;
use crate::ranking::{CandidateRanker, RankedCandidate};
use crate::vocabulary::{Resolution, Vocabulary};

/// Why an image produced no annotation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyAnnotated,
    DecodeFailed,
    ProposalFailed,
    NoProposals,
    Declined,
    NoLabels,
    WriteFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::AlreadyAnnotated => "annotation already exists",
            SkipReason::DecodeFailed => "image could not be decoded",
            SkipReason::ProposalFailed => "proposal engine failed",
            SkipReason::NoProposals => "no proposals",
            SkipReason::Declined => "all candidates declined",
            SkipReason::NoLabels => "no box was labeled",
            SkipReason::WriteFailed => "annotation could not be written",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Written(PathBuf),
    Skipped(SkipReason),
}

/// Where the per-image state machine currently is.
#[derive(Debug)]
pub enum ReviewStage {
    AwaitingProposals,
    Reviewing(Vec<RankedCandidate>),
    Declining(SkipReason),
    Labeling(Vec<CandidateRegion>),
    Finalizing(Vec<LabeledBox>),
}

impl ReviewStage {
    fn name(&self) -> &'static str {
        match self {
            ReviewStage::AwaitingProposals => "AwaitingProposals",
            ReviewStage::Reviewing(_) => "Reviewing",
            ReviewStage::Declining(_) => "Declining",
            ReviewStage::Labeling(_) => "Labeling",
            ReviewStage::Finalizing(_) => "Finalizing",
        }
    }
}

/// Parse "1,3" style input into 1-based ranks.
///
/// Tokens are trimmed; anything that is not a number in `1..=count` is
/// dropped. Repeated ranks count once, first occurrence order is kept.
pub fn parse_selection(input: &str, count: usize) -> Vec<usize> {
    let mut chosen = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(rank) = token.parse::<usize>() else {
            continue;
        };
        if (1..=count).contains(&rank) && !chosen.contains(&rank) {
            chosen.push(rank);
        }
    }
    chosen
}

/// Totals for one run over the input directory.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(String, ImageOutcome)>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ImageOutcome::Written(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.written()
    }
}

pub struct Session<'a> {
    adapter: &'a RegionProposalAdapter,
    ranker: CandidateRanker,
    writer: &'a AnnotationWriter,
    prompter: &'a mut dyn Prompter,
    surface: &'a mut dyn ReviewSurface,
    fallback: &'a mut dyn ManualFallback,
    folder: String,
    manual_capture: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        adapter: &'a RegionProposalAdapter,
        writer: &'a AnnotationWriter,
        prompter: &'a mut dyn Prompter,
        surface: &'a mut dyn ReviewSurface,
        fallback: &'a mut dyn ManualFallback,
    ) -> Self {
        Self {
            adapter,
            ranker: CandidateRanker::default(),
            writer,
            prompter,
            surface,
            fallback,
            folder: String::new(),
            manual_capture: true,
        }
    }

    pub fn with_ranker(mut self, ranker: CandidateRanker) -> Self {
        self.ranker = ranker;
        self
    }

    /// Value written to each document's `folder` element
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Whether declining offers a hand-drawn box before the external tool
    pub fn with_manual_capture(mut self, enabled: bool) -> Self {
        self.manual_capture = enabled;
        self
    }

    /// Process images strictly one after another in the given order.
    /// Only prompt I/O failures abort the run.
    pub fn run(&mut self, images: &[ImageEntry], vocabulary: &mut Vocabulary) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for entry in images {
            info!("=== Processing: {} ===", entry.path.display());
            let outcome = self.process_image(entry, vocabulary)?;
            match &outcome {
                ImageOutcome::Written(path) => info!("{} → {}", entry.filename, path.display()),
                ImageOutcome::Skipped(reason) => info!("{} skipped: {}", entry.filename, reason),
            }
            summary.outcomes.push((entry.filename.clone(), outcome));
        }

        Ok(summary)
    }

    /// Take one image from proposals to a written file (or a skip).
    pub fn process_image(&mut self, entry: &ImageEntry, vocabulary: &mut Vocabulary) -> Result<ImageOutcome> {
        if self.writer.keeps_existing(&entry.filename) {
            return Ok(ImageOutcome::Skipped(SkipReason::AlreadyAnnotated));
        }

        let image = match image::open(&entry.path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                error!("Could not open {}: {}", entry.path.display(), e);
                return Ok(ImageOutcome::Skipped(SkipReason::DecodeFailed));
            }
        };

        let mut stage = ReviewStage::AwaitingProposals;
        loop {
            debug!("{}: {}", entry.filename, stage.name());
            stage = match stage {
                ReviewStage::AwaitingProposals => {
                    info!("Generating masks...");
                    match self.adapter.propose(&image, &entry.path) {
                        Ok(candidates) if candidates.is_empty() => {
                            warn!("No masks detected with the current settings.");
                            ReviewStage::Declining(SkipReason::NoProposals)
                        }
                        Ok(candidates) => ReviewStage::Reviewing(self.ranker.rank(candidates)),
                        Err(e) => {
                            error!("Proposal engine failed on {}: {:#}", entry.path.display(), e);
                            return Ok(ImageOutcome::Skipped(SkipReason::ProposalFailed));
                        }
                    }
                }
                ReviewStage::Reviewing(ranked) => self.review(entry, &image, ranked)?,
                ReviewStage::Declining(reason) => match self.decline(entry, &image)? {
                    Some(region) => ReviewStage::Labeling(vec![region]),
                    None => return Ok(ImageOutcome::Skipped(reason)),
                },
                ReviewStage::Labeling(regions) => {
                    let labeled = self.label_regions(&regions, vocabulary)?;
                    if labeled.is_empty() {
                        return Ok(ImageOutcome::Skipped(SkipReason::NoLabels));
                    }
                    ReviewStage::Finalizing(labeled)
                }
                ReviewStage::Finalizing(objects) => return Ok(self.finalize(entry, &image, objects)),
            };
        }
    }

    fn review(&mut self, entry: &ImageEntry, image: &RgbImage, ranked: Vec<RankedCandidate>) -> Result<ReviewStage> {
        self.surface
            .show_candidates(&mut *self.prompter, &entry.filename, image, &ranked)?;

        let answer = self
            .prompter
            .ask("Which bounding boxes to keep? (e.g. 1,3) or Enter to skip all: ")?;
        let chosen = parse_selection(&answer, ranked.len());

        if chosen.is_empty() {
            if answer.trim().is_empty() {
                self.prompter.say("Skipping all candidates.")?;
            } else {
                self.prompter.say("No valid box numbers were given.")?;
            }
            return Ok(ReviewStage::Declining(SkipReason::Declined));
        }

        let accepted = chosen
            .into_iter()
            .filter_map(|rank| ranked.iter().find(|c| c.rank == rank))
            .map(|c| c.region.clone())
            .collect();
        Ok(ReviewStage::Labeling(accepted))
    }

    /// Manual capture first (when enabled), then the external tool.
    fn decline(&mut self, entry: &ImageEntry, image: &RgbImage) -> Result<Option<CandidateRegion>> {
        if self.manual_capture {
            if let Some(drag) = self
                .surface
                .capture_drag(&mut *self.prompter, &entry.filename, image)?
            {
                match region_from_drag(&drag, image.width(), image.height()) {
                    Some(region) => {
                        self.prompter
                            .say(&format!("Manually selected box: {}", region.bbox))?;
                        return Ok(Some(region));
                    }
                    None => self.prompter.say("The drawn box is empty.")?,
                }
            } else {
                self.prompter.say("No box was drawn.")?;
            }
        }

        if let Err(e) = self.fallback.launch(&entry.path) {
            warn!("Manual labeling fallback failed for {}: {:#}", entry.path.display(), e);
        }
        Ok(None)
    }

    fn label_regions(&mut self, regions: &[CandidateRegion], vocabulary: &mut Vocabulary) -> Result<Vec<LabeledBox>> {
        let mut labeled = Vec::with_capacity(regions.len());

        for region in regions {
            self.prompter.say("")?;
            self.prompter.say(&format!("Box: {}", region.bbox))?;
            self.prompter.say("Available labels:")?;
            for (idx, label) in vocabulary.list_labels().iter().enumerate() {
                self.prompter.say(&format!("{}. {}", idx + 1, label))?;
            }
            self.prompter
                .say(&format!("{}. [Create new label]", vocabulary.len() + 1))?;

            let answer = self
                .prompter
                .ask("Choose a label (number) or type a new one: ")?;
            let mut resolution = vocabulary.resolve(&answer);
            if resolution == Resolution::NeedsName {
                let name = self.prompter.ask("New label: ")?;
                resolution = vocabulary.resolve_new_name(&name);
            }

            match resolution {
                Resolution::Reused(label) | Resolution::Added(label) => {
                    labeled.push(LabeledBox {
                        label,
                        bbox: region.bbox,
                    });
                }
                Resolution::NeedsName | Resolution::Skipped => {
                    self.prompter.say("No label given; box dropped.")?;
                }
            }
        }

        Ok(labeled)
    }

    fn finalize(&mut self, entry: &ImageEntry, image: &RgbImage, objects: Vec<LabeledBox>) -> ImageOutcome {
        let annotation = ImageAnnotation {
            folder: self.folder.clone(),
            filename: entry.filename.clone(),
            path: entry.path.display().to_string(),
            width: image.width(),
            height: image.height(),
            depth: 3,
            objects,
        };

        match self.writer.write(&annotation) {
            Ok(path) => ImageOutcome::Written(path),
            Err(e) => {
                error!("Annotation for {} lost: {:#}", entry.filename, e);
                if let Err(say_err) = self
                    .prompter
                    .say(&format!("Could not save the annotation for {}: {:#}", entry.filename, e))
                {
                    warn!("{}", say_err);
                }
                ImageOutcome::Skipped(SkipReason::WriteFailed)
            }
        }
    }
}
