//! Offline bag-of-words embedder.
//!
//! Each token is hashed with blake3 into one of `dimension` buckets; bucket
//! counts are then L2-normalized. Deterministic across runs and platforms.

use crate::{l2_normalize, EmbedResponse, EmbeddingProvider, ProviderError};

/// Matches the MiniLM sentence embedders usually swapped in for this one.
pub const DEFAULT_DIMENSION: usize = 384;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "of", "on", "or",
    "said", "that", "the", "to", "using", "wherein", "which", "with",
];

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimension: usize,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed one text. Text without usable tokens maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in tokens(text) {
            vector[self.bucket(&token)] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }
}

/// Lowercased alphanumeric runs of at least two characters, minus stop words.
/// Single characters are mostly enumerator letters such as the `b` in `(b)`.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_text(t)).collect(),
        })
    }
}
