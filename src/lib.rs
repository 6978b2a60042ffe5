pub mod annotation;
pub mod capture;
pub mod config;
pub mod dataset;
pub mod fallback;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod proposal;
pub mod ranking;
pub mod session;
pub mod vocabulary;

pub use annotation::{AnnotationWriter, OverwritePolicy};
pub use models::{BoxCoords, CandidateRegion, ImageAnnotation, ImageEntry, Label, LabeledBox, Mask};
pub use pipeline::{Pipeline, PipelineContext, PipelineData, PipelineStep};
pub use proposal::{ProposalParams, RawProposal, RegionProposalAdapter, SegmentationEngine};
pub use ranking::{CandidateRanker, RankedCandidate};
pub use session::{ImageOutcome, RunSummary, Session, SkipReason};
pub use vocabulary::Vocabulary;
