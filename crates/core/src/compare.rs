//! Side-by-side comparison of two claims' features.
//!
//! Features are compared by token-level Jaccard similarity. Each feature of
//! claim A is paired with its best-scoring feature of claim B (first one wins
//! on ties); several A features may share one B feature. B features that are
//! never anyone's best match are reported as unmatched.

use crate::error::{Result, SearchError, Stage};
use providers::FeatureExtractor;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatch {
    pub feature_a: String,
    pub feature_b: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureComparison {
    pub features_a: Vec<String>,
    pub features_b: Vec<String>,
    pub matches: Vec<FeatureMatch>,
    /// Mean of the per-feature best scores; 0 when either side is empty.
    pub overall_similarity: f32,
    pub unmatched_a: Vec<String>,
    pub unmatched_b: Vec<String>,
    /// Jaccard over the two feature sets as whole strings.
    pub set_overlap: f32,
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard similarity of the whitespace tokens of `a` and `b`.
/// Two token-less texts count as identical.
pub fn token_jaccard(a: &str, b: &str) -> f32 {
    let ta = tokens(a);
    let tb = tokens(b);
    match (ta.is_empty(), tb.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    shared as f32 / union as f32
}

/// Jaccard similarity of two feature sets; 0 when both are empty.
pub fn feature_set_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

pub fn compare_features(features_a: &[String], features_b: &[String]) -> FeatureComparison {
    let set_overlap = feature_set_overlap(
        &features_a.iter().cloned().collect(),
        &features_b.iter().cloned().collect(),
    );

    if features_a.is_empty() || features_b.is_empty() {
        return FeatureComparison {
            features_a: features_a.to_vec(),
            features_b: features_b.to_vec(),
            matches: Vec::new(),
            overall_similarity: 0.0,
            unmatched_a: features_a.to_vec(),
            unmatched_b: features_b.to_vec(),
            set_overlap,
        };
    }

    let mut matched_b: HashSet<usize> = HashSet::new();
    let matches: Vec<FeatureMatch> = features_a
        .iter()
        .map(|fa| {
            let mut best = (0, token_jaccard(fa, &features_b[0]));
            for (idx, fb) in features_b.iter().enumerate().skip(1) {
                let score = token_jaccard(fa, fb);
                if score > best.1 {
                    best = (idx, score);
                }
            }
            matched_b.insert(best.0);
            FeatureMatch {
                feature_a: fa.clone(),
                feature_b: features_b[best.0].clone(),
                score: best.1,
            }
        })
        .collect();

    let overall_similarity =
        matches.iter().map(|m| m.score).sum::<f32>() / matches.len() as f32;
    let unmatched_b = features_b
        .iter()
        .enumerate()
        .filter(|(idx, _)| !matched_b.contains(idx))
        .map(|(_, f)| f.clone())
        .collect();

    FeatureComparison {
        features_a: features_a.to_vec(),
        features_b: features_b.to_vec(),
        matches,
        overall_similarity,
        unmatched_a: Vec::new(),
        unmatched_b,
        set_overlap,
    }
}

/// Extract features from both claims and compare them.
pub async fn compare_claims(
    extractor: &dyn FeatureExtractor,
    claim_a: &str,
    claim_b: &str,
) -> Result<FeatureComparison> {
    if claim_a.trim().is_empty() || claim_b.trim().is_empty() {
        return Err(SearchError::InvalidInput("both claims must be non-empty".into()));
    }
    let features_a = extractor
        .extract(claim_a)
        .await
        .map_err(SearchError::collaborator(Stage::Extract))?;
    let features_b = extractor
        .extract(claim_b)
        .await
        .map_err(SearchError::collaborator(Stage::Extract))?;
    debug!(?features_a, ?features_b, "claims parsed");

    let features_a: Vec<String> = features_a.into_iter().collect();
    let features_b: Vec<String> = features_b.into_iter().collect();
    Ok(compare_features(&features_a, &features_b))
}
