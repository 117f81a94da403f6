pub mod candidates;
pub mod contribution;
mod engine;
pub mod ranking;

pub use candidates::{enumerate_candidates, FailureModeCandidate};
pub use contribution::{
    pair_contribution, score_mode, CatalogAnomalyView, Contribution, ObservedAnomalyView,
};
pub use engine::{run_analysis, AnalysisOutcome, AnalysisReport};
pub use ranking::{normalize, RankedMode, ScoredMode};
