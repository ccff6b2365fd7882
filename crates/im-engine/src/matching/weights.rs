use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tolerance for the sum-to-one check. Weights are configuration; small
/// floating-point drift from serialized configs is acceptable.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Default blend: semantic signal slightly ahead of the lexical one.
pub const DEFAULT_WEIGHTS: BlendWeights = BlendWeights {
    rule: 0.4,
    embedding: 0.6,
};

/// Relative weight of the rule-based and embedding scores in the blended
/// `match_score`. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub rule: f64,
    pub embedding: f64,
}

impl BlendWeights {
    /// Effective weights applied when the embedding signal is unavailable
    /// and the blend falls back to the rule score alone.
    pub const RULE_ONLY: BlendWeights = BlendWeights {
        rule: 1.0,
        embedding: 0.0,
    };

    pub fn sum(&self) -> f64 {
        self.rule + self.embedding
    }

    /// Fail fast on weights that do not sum to 1.0 or carry negative parts.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = self.rule < 0.0
            || self.embedding < 0.0
            || (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE;
        if invalid {
            return Err(EngineError::InvalidWeights {
                rule: self.rule,
                embedding: self.embedding,
            });
        }
        Ok(())
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}
