use providers::ProviderError;
use std::fmt;
use thiserror::Error;

/// The collaborator call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embed,
    Extract,
    Predict,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embed => "embedding",
            Stage::Extract => "feature extraction",
            Stage::Predict => "classification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index not built: call build_index before search")]
    NotReady,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("{stage} collaborator failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: ProviderError,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SearchError {
    /// Collaborator failures may succeed on retry; everything else is misuse.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Collaborator { .. })
    }

    pub(crate) fn collaborator(stage: Stage) -> impl FnOnce(ProviderError) -> Self {
        move |source| SearchError::Collaborator { stage, source }
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
