mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from voclabel for tests
pub use voclabel::capture::Drag;
pub use voclabel::{
    AnnotationWriter, BoxCoords, CandidateRanker, CandidateRegion, ImageEntry, ImageOutcome, Label, Mask,
    OverwritePolicy, RegionProposalAdapter, Session, SkipReason, Vocabulary,
};
