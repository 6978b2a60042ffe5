use crate::models::CandidateRegion;

pub const DEFAULT_MAX_CANDIDATES: usize = 6;

/// A candidate together with the 1-based number shown to the annotator.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub rank: usize,
    pub region: CandidateRegion,
}

/// Orders candidates by area, largest first, and keeps the top `max_candidates`.
#[derive(Debug, Clone, Copy)]
pub struct CandidateRanker {
    max_candidates: usize,
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CANDIDATES)
    }
}

impl CandidateRanker {
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Stable sort: equal areas keep their input order.
    pub fn rank(&self, mut candidates: Vec<CandidateRegion>) -> Vec<RankedCandidate> {
        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
        candidates.truncate(self.max_candidates);

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, region)| RankedCandidate { rank: i + 1, region })
            .collect()
    }
}
