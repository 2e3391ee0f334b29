//! Retrieval engine: index a corpus once, then answer claim queries.
//!
//! The published index and its id lookup live together in one immutable
//! snapshot. `build_index` prepares a new snapshot while holding the writer
//! lock and swaps it in as its last step; `search` loads the current snapshot
//! once and never sees a half-built state.

use crate::config::SearchConfig;
use crate::embeddings;
use crate::error::{Result, SearchError, Stage};
use crate::graph::CodeExpander;
use crate::models::{validate_corpus, Patent, SearchHit};
use crate::search;
use crate::vectorstore::VectorIndex;
use arc_swap::ArcSwapOption;
use providers::{ClassificationPredictor, EmbeddingProvider, FeatureExtractor, ProviderError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Handles to the external models the engine calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub extractor: Arc<dyn FeatureExtractor>,
    pub predictor: Arc<dyn ClassificationPredictor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub indexed: usize,
    pub dimension: Option<usize>,
}

struct IndexSnapshot {
    index: VectorIndex,
    patents: HashMap<String, Patent>,
}

pub struct RetrievalEngine {
    collaborators: Collaborators,
    graph: Arc<dyn CodeExpander>,
    config: SearchConfig,
    batch_size: usize,
    state: ArcSwapOption<IndexSnapshot>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    pub fn new(collaborators: Collaborators, graph: Arc<dyn CodeExpander>) -> Self {
        Self {
            collaborators,
            graph,
            config: SearchConfig::default(),
            batch_size: 32,
            state: ArcSwapOption::empty(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.state.load().is_some()
    }

    /// Indexed patent count; zero before the first build.
    pub fn len(&self) -> usize {
        self.state
            .load_full()
            .map_or(0, |snapshot| snapshot.index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expand_codes(&self, codes: &BTreeSet<String>, hops: usize) -> BTreeSet<String> {
        self.graph.expand(codes, hops)
    }

    /// Embed and index `patents`, replacing any previous index.
    ///
    /// On error the previously published index, if any, stays in place.
    pub async fn build_index(&self, patents: Vec<Patent>) -> Result<BuildSummary> {
        validate_corpus(&patents)?;
        let _writer = self.writer.lock().await;

        let claims: Vec<String> = patents.iter().map(|p| p.claim.clone()).collect();
        let embedded = embeddings::embed_batched(
            self.collaborators.embedder.as_ref(),
            &claims,
            self.batch_size,
        )
        .await?;

        let mut index = match embedded.dimension {
            Some(dimension) => VectorIndex::with_dimension(dimension),
            None => VectorIndex::new(),
        };
        index.add(
            embedded.vectors,
            patents.iter().map(|p| p.id.clone()).collect(),
        )?;

        let summary = BuildSummary {
            indexed: index.len(),
            dimension: index.dimension(),
        };
        let patents = patents.into_iter().map(|p| (p.id.clone(), p)).collect();
        self.state
            .store(Some(Arc::new(IndexSnapshot { index, patents })));

        info!(
            indexed = summary.indexed,
            dimension = ?summary.dimension,
            "index published"
        );
        Ok(summary)
    }

    /// Rank indexed patents against `claim` using the engine's configuration.
    pub async fn search(&self, claim: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.search_with(claim, k, &self.config).await
    }

    /// Rank indexed patents against `claim` with explicit weights and pool size.
    pub async fn search_with(
        &self,
        claim: &str,
        k: usize,
        options: &SearchConfig,
    ) -> Result<Vec<SearchHit>> {
        let snapshot = self.state.load_full().ok_or(SearchError::NotReady)?;
        if k == 0 {
            return Err(SearchError::InvalidInput("k must be at least 1".into()));
        }
        if claim.trim().is_empty() {
            return Err(SearchError::InvalidInput("query claim is empty".into()));
        }
        options.validate()?;
        if snapshot.index.is_empty() {
            return Ok(Vec::new());
        }

        let features = self
            .collaborators
            .extractor
            .extract(claim)
            .await
            .map_err(SearchError::collaborator(Stage::Extract))?;

        let codes = self
            .collaborators
            .predictor
            .predict(claim)
            .await
            .map_err(SearchError::collaborator(Stage::Predict))?;
        if codes.is_empty() {
            warn!("classification predictor returned no codes");
            return Err(SearchError::collaborator(Stage::Predict)(
                ProviderError::InvalidResponse("empty code prediction".into()),
            ));
        }
        let expanded = self.graph.expand(&codes, options.expansion_hops);
        debug!(?features, ?codes, ?expanded, "query prepared");

        let embedder = self.collaborators.embedder.as_ref();
        let claim_vector = embeddings::embed_one(embedder, claim).await?;
        let feature_text = features
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let feature_vector = embeddings::embed_one(embedder, &feature_text).await?;

        let claim_hits = snapshot
            .index
            .search(&claim_vector, options.candidate_pool_size)?;
        let feature_hits = snapshot
            .index
            .search(&feature_vector, options.candidate_pool_size)?;
        debug!(
            claim_hits = claim_hits.len(),
            feature_hits = feature_hits.len(),
            "channels searched"
        );

        let candidates = search::fuse_channels(&claim_hits, &feature_hits, &options.weights);
        let ranked = search::rerank(candidates, &snapshot.patents, &expanded, &options.weights);

        Ok(ranked
            .into_iter()
            .take(k)
            .filter_map(|r| {
                let patent = snapshot.patents.get(&r.candidate.patent_id)?;
                Some(SearchHit {
                    patent_id: patent.id.clone(),
                    claim: patent.claim.clone(),
                    codes: patent.codes.clone(),
                    score: r.total,
                    fused: r.candidate.fused,
                    claim_score: r.candidate.claim_score,
                    feature_score: r.candidate.feature_score,
                    code_overlap: r.code_overlap,
                })
            })
            .collect())
    }
}
