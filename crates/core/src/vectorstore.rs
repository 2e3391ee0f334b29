use crate::error::{Result, SearchError};
use crate::models::ScoredResult;

/// Append-only exact k-NN index over pre-normalized vectors.
///
/// Scores are raw inner products; with unit-length inputs this is cosine
/// similarity. Vectors are stored as given and never renormalized.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index whose dimension is fixed up front.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append a batch. The batch is checked as a whole first, so a failed add
    /// leaves the index unchanged.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<String>) -> Result<()> {
        if vectors.len() != ids.len() {
            return Err(SearchError::InvalidInput(format!(
                "got {} vectors for {} ids",
                vectors.len(),
                ids.len()
            )));
        }
        let Some(expected) = self.dimension.or_else(|| vectors.first().map(Vec::len)) else {
            return Ok(());
        };
        if expected == 0 {
            return Err(SearchError::InvalidInput(
                "vectors must have at least one dimension".into(),
            ));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        self.dimension = Some(expected);
        self.ids.extend(ids);
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Top `k` entries by inner product, best first. Equal scores keep
    /// insertion order. An empty index answers with nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, inner_product(query, v)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredResult {
                patent_id: self.ids[pos].clone(),
                score,
            })
            .collect())
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    // Adding +0.0 folds -0.0 into +0.0 so zero scores tie under total_cmp.
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() + 0.0
}
