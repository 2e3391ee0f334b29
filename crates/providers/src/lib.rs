//! Provider abstractions for embeddings, claim feature extraction and
//! classification-code prediction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

pub mod hashed;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

/// Turns text into unit-length vectors of one fixed dimension.
///
/// Implementations must return exactly one vector per input, in input order,
/// already L2-normalized. Callers trust this and never renormalize.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;
}

/// Distills a claim into short technical phrases. An empty set is a valid answer.
#[async_trait::async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, claim: &str) -> Result<BTreeSet<String>, ProviderError>;
}

/// Predicts classification codes for a claim.
///
/// The answer is never empty: implementations fall back to a default code
/// when nothing matches.
#[async_trait::async_trait]
pub trait ClassificationPredictor: Send + Sync {
    async fn predict(&self, claim: &str) -> Result<BTreeSet<String>, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    extractors: HashMap<String, Arc<dyn FeatureExtractor>>,
    pub preferred_embedding: Option<String>,
    pub preferred_extractor: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn with_extractor(mut self, name: &str, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractors.insert(name.to_string(), extractor);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn set_preferred_extractor(mut self, name: &str) -> Self {
        self.preferred_extractor = Some(name.to_string());
        self
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_embedding.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no embedding provider configured".into())
            })?;
        self.embeddings
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }

    pub fn extractor(&self, name: Option<&str>) -> Result<Arc<dyn FeatureExtractor>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_extractor.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no feature extractor configured".into())
            })?;
        self.extractors
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }

    pub fn embedding_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.embeddings.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
