use crate::error::{Result, SearchError, Stage};
use providers::{EmbeddingProvider, ProviderError};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct EmbeddingResult {
    pub vectors: Vec<Vec<f32>>,
    /// Shared dimension of `vectors`; `None` when there are none.
    pub dimension: Option<usize>,
}

/// One provider call, checked for length and a uniform dimension.
pub async fn embed(provider: &dyn EmbeddingProvider, texts: &[String]) -> Result<EmbeddingResult> {
    let resp = provider
        .embed(texts)
        .await
        .map_err(SearchError::collaborator(Stage::Embed))?;

    if resp.vectors.len() != texts.len() {
        return Err(SearchError::collaborator(Stage::Embed)(
            ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                resp.vectors.len()
            )),
        ));
    }

    if let Some(pos) = resp
        .vectors
        .iter()
        .position(|v| v.iter().any(|x| !x.is_finite()))
    {
        return Err(SearchError::collaborator(Stage::Embed)(
            ProviderError::InvalidResponse(format!("embedding {pos} has non-finite components")),
        ));
    }

    let dimension = uniform_dimension(&resp.vectors, None)?;
    Ok(EmbeddingResult {
        vectors: resp.vectors,
        dimension,
    })
}

/// Embed `texts` in provider calls of at most `batch_size`, keeping input
/// order. Every batch must agree on the dimension.
pub async fn embed_batched(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<EmbeddingResult> {
    let mut out = EmbeddingResult::default();
    for batch in texts.chunks(batch_size.max(1)) {
        let result = embed(provider, batch).await?;
        out.dimension = uniform_dimension(&result.vectors, out.dimension)?;
        out.vectors.extend(result.vectors);
        debug!(embedded = out.vectors.len(), total = texts.len(), "embedding batch done");
    }
    Ok(out)
}

/// Embed a single text and return its vector.
pub async fn embed_one(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let result = embed(provider, &[text.to_string()]).await?;
    result.vectors.into_iter().next().ok_or_else(|| {
        SearchError::collaborator(Stage::Embed)(ProviderError::InvalidResponse(
            "empty embedding response".into(),
        ))
    })
}

fn uniform_dimension(vectors: &[Vec<f32>], expected: Option<usize>) -> Result<Option<usize>> {
    let mut dimension = expected;
    for v in vectors {
        match dimension {
            Some(d) if d != v.len() => {
                return Err(SearchError::DimensionMismatch {
                    expected: d,
                    actual: v.len(),
                })
            }
            Some(_) => {}
            None => dimension = Some(v.len()),
        }
    }
    Ok(dimension)
}
