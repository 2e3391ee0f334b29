//! Two-channel score fusion and classification-overlap rerank.
//!
//! Candidates are the union of both channels' hits. A candidate missing from
//! one channel scores zero there. The final order is total score, then fused
//! score, then the order in which candidates were first seen (claim channel
//! before feature channel), so equal inputs always give equal output.

use crate::config::FusionWeights;
use crate::models::{Patent, ScoredResult};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub patent_id: String,
    pub claim_score: f32,
    pub feature_score: f32,
    pub fused: f32,
    /// Position of first appearance across the claim then feature channel.
    pub discovery: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub code_overlap: usize,
    pub total: f32,
}

/// Union both channels and combine their scores linearly.
pub fn fuse_channels(
    claim_hits: &[ScoredResult],
    feature_hits: &[ScoredResult],
    weights: &FusionWeights,
) -> Vec<Candidate> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for (from_claim, hits) in [(true, claim_hits), (false, feature_hits)] {
        for hit in hits {
            let slot = *slots.entry(hit.patent_id.as_str()).or_insert_with(|| {
                let discovery = candidates.len();
                candidates.push(Candidate {
                    patent_id: hit.patent_id.clone(),
                    claim_score: 0.0,
                    feature_score: 0.0,
                    fused: 0.0,
                    discovery,
                });
                discovery
            });
            let candidate = &mut candidates[slot];
            if from_claim {
                candidate.claim_score = hit.score;
            } else {
                candidate.feature_score = hit.score;
            }
        }
    }

    for c in &mut candidates {
        c.fused = weights.claim * c.claim_score + weights.feature * c.feature_score;
    }
    candidates
}

/// Number of a patent's codes inside the expanded query code set.
///
/// Deliberately a raw count: a patent tagged with many related codes collects
/// one bonus per code.
pub fn code_overlap(codes: &BTreeSet<String>, expanded: &BTreeSet<String>) -> usize {
    codes.intersection(expanded).count()
}

/// Add the classification bonus and sort into final order.
pub fn rerank(
    candidates: Vec<Candidate>,
    patents: &HashMap<String, Patent>,
    expanded: &BTreeSet<String>,
    weights: &FusionWeights,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let Some(patent) = patents.get(&candidate.patent_id) else {
                debug!("candidate {} missing from lookup", candidate.patent_id);
                return None;
            };
            let overlap = code_overlap(&patent.codes, expanded);
            let total = candidate.fused + weights.cpc_overlap * overlap as f32;
            Some(RankedCandidate {
                candidate,
                code_overlap: overlap,
                total,
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| b.candidate.fused.total_cmp(&a.candidate.fused))
        .then_with(|| a.candidate.discovery.cmp(&b.candidate.discovery))
}
