use crate::config::ClassificationConfig;
use providers::{ClassificationPredictor, ProviderError};
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_CODE: &str = "G06F9/50";

pub const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("consensus", "G06F9/50"),
    ("leader election", "G06F9/54"),
    ("distributed", "G06F9/52"),
    ("lock", "G06F9/48"),
];

/// Lookup-table predictor: a code is predicted when its keyword occurs in the
/// lowercased claim. Stand-in for a trained classifier behind the same trait.
#[derive(Debug, Clone)]
pub struct KeywordPredictor {
    table: Vec<(String, String)>,
    default_code: String,
}

impl Default for KeywordPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied(), DEFAULT_CODE)
    }
}

impl KeywordPredictor {
    pub fn new<I, K, C>(table: I, default_code: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<String>,
    {
        let default_code = default_code.into();
        Self {
            table: table
                .into_iter()
                .map(|(k, c)| (k.into().to_lowercase(), c.into()))
                .filter(|(k, _)| !k.trim().is_empty())
                .collect(),
            default_code: if default_code.trim().is_empty() {
                DEFAULT_CODE.to_string()
            } else {
                default_code
            },
        }
    }

    pub fn from_config(cfg: &ClassificationConfig) -> Self {
        Self::new(
            cfg.keywords
                .iter()
                .map(|rule| (rule.keyword.clone(), rule.code.clone())),
            cfg.default_code.clone(),
        )
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    pub fn predict_codes(&self, claim: &str) -> BTreeSet<String> {
        let text = claim.to_lowercase();
        let mut codes: BTreeSet<String> = self
            .table
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, code)| code.clone())
            .collect();

        if codes.is_empty() {
            debug!("no keyword matched, using default code {}", self.default_code);
            codes.insert(self.default_code.clone());
        }
        codes
    }
}

#[async_trait::async_trait]
impl ClassificationPredictor for KeywordPredictor {
    async fn predict(&self, claim: &str) -> Result<BTreeSet<String>, ProviderError> {
        Ok(self.predict_codes(claim))
    }
}
