use crate::classifier::KeywordPredictor;
use crate::config::AppConfig;
use crate::engine::{BuildSummary, Collaborators, RetrievalEngine};
use crate::extractor::RuleBasedExtractor;
use crate::graph::ClassificationGraph;
use crate::models::Patent;
use anyhow::Context;
use providers::hashed::HashedEmbedder;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new()
        .with_embedding(
            "hashed",
            Arc::new(HashedEmbedder::new(config.embeddings.dimension)),
        )
        .with_extractor("rules", Arc::new(RuleBasedExtractor::new()));

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: config.embeddings.model.clone(),
            chat_model: config.features.chat_model.clone(),
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_extractor("openai", Arc::new(provider));
    } else if config.embeddings.provider == "openai" || config.features.extractor == "openai" {
        warn!("openai requested but OPENAI_API_KEY/OPENAI_BASE_URL are not set");
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_extractor(&config.features.extractor)
}

/// Wire collaborators from config into an unbuilt engine.
pub fn build_engine(config: &AppConfig) -> anyhow::Result<RetrievalEngine> {
    let registry = build_registry(config);
    let embedder = registry
        .embedding(None)
        .context("resolve embedding provider")?;
    let extractor = registry
        .extractor(None)
        .context("resolve feature extractor")?;
    let predictor = KeywordPredictor::from_config(&config.classification);
    let graph = ClassificationGraph::from_relations(&config.classification.relations);

    Ok(RetrievalEngine::new(
        Collaborators {
            embedder,
            extractor,
            predictor: Arc::new(predictor),
        },
        Arc::new(graph),
    )
    .with_search_config(config.search.clone())
    .with_batch_size(config.embeddings.batch_size))
}

/// Read a JSON array of `{id, claim, codes}` records.
pub fn load_corpus(path: &Path) -> anyhow::Result<Vec<Patent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read corpus {}", path.display()))?;
    let patents: Vec<Patent> = serde_json::from_str(&raw)
        .with_context(|| format!("parse corpus {}", path.display()))?;
    Ok(patents)
}

/// Build an engine and index the corpus at `corpus_path`.
pub async fn prepare_engine(
    config: &AppConfig,
    corpus_path: &Path,
) -> anyhow::Result<(RetrievalEngine, BuildSummary)> {
    let engine = build_engine(config)?;
    let patents = load_corpus(corpus_path)?;
    info!("Indexing {} patents from {}", patents.len(), corpus_path.display());
    let summary = engine.build_index(patents).await.context("build index")?;
    Ok((engine, summary))
}
