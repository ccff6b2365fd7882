pub mod blend;
pub mod eligibility;
pub mod explanation;
pub mod pipeline;
pub mod rule_score;
pub mod weights;

pub use explanation::{DegradedReason, DegradedSignal, ScoreBreakdown, Signal, SignalScore};
pub use pipeline::{MatchResult, MatchRunMeta, RankedResultSet, RankingEngine, RejectedCandidate};
pub use weights::BlendWeights;
