//! Rule-based claim feature extraction.
//!
//! A claim body is a list of limitations separated by semicolons. The preamble
//! (everything up to the first colon) is dropped, each limitation is stripped
//! of enumerators and a leading "and" on either side of them, and the
//! remainder is lowercased.

use providers::{FeatureExtractor, ProviderError};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static ENUMERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:\d+|[a-zA-Z])[.)]|\([a-zA-Z0-9]+\))\s*").expect("valid enumerator regex")
});

static LEADING_AND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*and\s+").expect("valid conjunction regex"));

#[derive(Debug, Clone, Default)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_features(&self, claim: &str) -> BTreeSet<String> {
        let text = claim.trim();
        let body = match text.split_once(':') {
            Some((_preamble, body)) => body,
            None => text,
        };

        body.split(';')
            .filter_map(|raw| {
                let feature = raw.trim();
                let feature = feature.strip_suffix('.').unwrap_or(feature);
                let feature = LEADING_AND.replace(feature, "");
                let feature = ENUMERATOR.replace(&feature, "");
                let feature = LEADING_AND.replace(&feature, "");
                let feature = feature.trim().to_lowercase();
                (!feature.is_empty()).then_some(feature)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl FeatureExtractor for RuleBasedExtractor {
    async fn extract(&self, claim: &str) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.extract_features(claim))
    }
}
