use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A corpus document: one claim plus its classification codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patent {
    pub id: String,
    pub claim: String,
    #[serde(default, alias = "cpc")]
    pub codes: BTreeSet<String>,
}

impl Patent {
    pub fn new<I, S>(id: impl Into<String>, claim: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            claim: claim.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub patent_id: String,
    pub score: f32,
}

/// One ranked answer to a query, with the per-channel breakdown that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub patent_id: String,
    pub claim: String,
    pub codes: BTreeSet<String>,
    pub score: f32,
    pub fused: f32,
    pub claim_score: f32,
    pub feature_score: f32,
    pub code_overlap: usize,
}

/// Reject corpora with duplicate ids or blank claims.
pub fn validate_corpus(patents: &[Patent]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(patents.len());
    for patent in patents {
        if patent.claim.trim().is_empty() {
            return Err(SearchError::InvalidInput(format!(
                "patent {} has empty claim text",
                patent.id
            )));
        }
        if !seen.insert(patent.id.as_str()) {
            return Err(SearchError::InvalidInput(format!(
                "duplicate patent id {}",
                patent.id
            )));
        }
    }
    Ok(())
}
