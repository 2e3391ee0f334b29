use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embeddings: EmbeddingConfig,
    pub search: SearchConfig,
    pub classification: ClassificationConfig,
    pub features: FeatureConfig,
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: providers::hashed::DEFAULT_DIMENSION,
            batch_size: 32,
        }
    }
}

/// Per-channel weights applied during fusion and rerank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub claim: f32,
    pub feature: f32,
    pub cpc_overlap: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            claim: 0.55,
            feature: 0.30,
            cpc_overlap: 0.15,
        }
    }
}

/// Knobs for a single `search` call. The defaults reproduce the reference
/// ranking; the pool size is a heuristic and may be tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub weights: FusionWeights,
    pub candidate_pool_size: usize,
    pub expansion_hops: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            candidate_pool_size: 100,
            expansion_hops: 2,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.candidate_pool_size == 0 {
            return Err(SearchError::InvalidInput(
                "candidate_pool_size must be at least 1".into(),
            ));
        }
        let w = &self.weights;
        if ![w.claim, w.feature, w.cpc_overlap]
            .iter()
            .all(|x| x.is_finite())
        {
            return Err(SearchError::InvalidInput(
                "fusion weights must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRelation {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub default_code: String,
    pub keywords: Vec<KeywordRule>,
    pub relations: Vec<CodeRelation>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            default_code: crate::classifier::DEFAULT_CODE.to_string(),
            keywords: crate::classifier::DEFAULT_KEYWORDS
                .iter()
                .map(|(keyword, code)| KeywordRule {
                    keyword: keyword.to_string(),
                    code: code.to_string(),
                })
                .collect(),
            relations: crate::graph::DEFAULT_RELATIONS
                .iter()
                .map(|(from, to)| CodeRelation {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// `rules` or `openai`.
    pub extractor: String,
    pub chat_model: String,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            extractor: "rules".to_string(),
            chat_model: "gpt-4o".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: Option<String>,
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("PRIORART")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_defaults_match_reference_ranking() {
        let cfg = SearchConfig::default();
        assert!((cfg.weights.claim - 0.55).abs() < 1e-6);
        assert!((cfg.weights.feature - 0.30).abs() < 1e-6);
        assert!((cfg.weights.cpc_overlap - 0.15).abs() < 1e-6);
        assert_eq!(cfg.candidate_pool_size, 100);
        assert_eq!(cfg.expansion_hops, 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"search": {"weights": {"feature": 0.0}}}"#).unwrap();
        assert_eq!(cfg.search.weights.feature, 0.0);
        assert!((cfg.search.weights.claim - 0.55).abs() < 1e-6);
        assert_eq!(cfg.search.candidate_pool_size, 100);
        assert_eq!(cfg.embeddings.provider, "hashed");
        assert_eq!(cfg.classification.keywords.len(), 4);
    }

    #[test]
    fn validate_rejects_zero_pool() {
        let cfg = SearchConfig {
            candidate_pool_size: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SearchError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_nan_weights() {
        let cfg = SearchConfig {
            weights: FusionWeights {
                claim: f32::NAN,
                ..FusionWeights::default()
            },
            ..SearchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let cfg = load(None).unwrap();
        assert_eq!(cfg.search, SearchConfig::default());
    }
}
