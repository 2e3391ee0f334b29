//! Rendering helpers shared by the `priorart` subcommands.

use anyhow::{bail, Context, Result};
use priorart_core::compare::FeatureComparison;
use priorart_core::SearchHit;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Query claim from the positional argument or a file; exactly one is allowed.
pub fn read_claim(claim: Option<String>, claim_file: Option<&Path>) -> Result<String> {
    let text = match (claim, claim_file) {
        (Some(_), Some(_)) => bail!("pass either a claim or --claim-file, not both"),
        (Some(c), None) => c,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("read claim file {}", path.display()))?,
        (None, None) => bail!("no query claim given"),
    };
    Ok(text.trim().to_string())
}

pub fn hits_to_json(hits: &[SearchHit]) -> Vec<serde_json::Value> {
    hits.iter()
        .enumerate()
        .map(|(rank, hit)| {
            serde_json::json!({
                "rank": rank + 1,
                "id": hit.patent_id,
                "score": hit.score,
                "fused": hit.fused,
                "claim_score": hit.claim_score,
                "feature_score": hit.feature_score,
                "code_overlap": hit.code_overlap,
                "codes": hit.codes,
                "claim": hit.claim,
            })
        })
        .collect()
}

/// Keep only the named keys of each result object; empty keeps everything.
pub fn filter_fields(mut results: Vec<serde_json::Value>, fields: &[String]) -> Vec<serde_json::Value> {
    if fields.is_empty() {
        return results;
    }
    let want: HashSet<String> = fields.iter().map(|s| s.to_lowercase()).collect();
    for r in results.iter_mut() {
        if let Some(obj) = r.as_object_mut() {
            obj.retain(|k, _| want.contains(&k.to_lowercase()));
        }
    }
    results
}

pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matching patents.".to_string();
    }
    let mut out = String::new();
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. {:<12} score={:.4} (claim={:.4} feature={:.4} overlap={}) [{}]\n",
            rank + 1,
            hit.patent_id,
            hit.score,
            hit.claim_score,
            hit.feature_score,
            hit.code_overlap,
            join_codes(&hit.codes),
        ));
        out.push_str(&format!("    {}\n", truncate(&hit.claim, 100)));
    }
    out.trim_end().to_string()
}

/// Markdown report of a claim comparison.
pub fn render_comparison(result: &FeatureComparison) -> String {
    let mut lines = vec![
        "# Claim Comparison".to_string(),
        String::new(),
        format!("Overall similarity: {:.2}", result.overall_similarity),
        format!("Feature set overlap: {:.2}", result.set_overlap),
        String::new(),
        "## Feature Matches".to_string(),
    ];
    if result.matches.is_empty() {
        lines.push("(none)".to_string());
    }
    for m in &result.matches {
        lines.push(format!("- {:.2}", m.score));
        lines.push(format!("  - A: {}", m.feature_a));
        lines.push(format!("  - B: {}", m.feature_b));
    }
    for (title, features) in [
        ("Unmatched in A", &result.unmatched_a),
        ("Unmatched in B", &result.unmatched_b),
    ] {
        if features.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("## {title}"));
        lines.extend(features.iter().map(|f| format!("- {f}")));
    }
    lines.join("\n")
}

pub fn join_codes(codes: &BTreeSet<String>) -> String {
    codes.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
