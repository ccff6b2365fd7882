use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use super::{EmbeddingError, EmbeddingProvider};

/// Fixed seeds for deterministic hashing.
/// Changing either value changes every embedding; bump `version()` with it.
const HASH_SEED_K0: u64 = 0x5157_a3f0_9c4d_22b1;
const HASH_SEED_K1: u64 = 0x0e86_44db_71c9_fa38;

/// Feature-hashing embedder over the canonical entity text.
///
/// - No model, no I/O; O(n) in token count
/// - SipHash-1-3 with fixed seeds keeps vectors stable across Rust versions
/// - Sign hashing spreads collisions across positive and negative weights
///
/// The default provider for offline deployments and tests: skill overlap in
/// the input texts shows up as cosine similarity without a remote model.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }

    fn embed_tokens<'a>(&self, tokens: impl Iterator<Item = &'a str>) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokens {
            let idx = self.hash_token(token);
            let sign = if self.hash_token(&format!("{token}_sign")) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign;
        }

        // L2 normalization
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn version(&self) -> &str {
        "v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric() && !matches!(c, '#' | '+'))
            .filter(|t| !t.is_empty());
        Ok(self.embed_tokens(tokens))
    }
}
