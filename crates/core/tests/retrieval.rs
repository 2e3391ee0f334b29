use async_trait::async_trait;
use priorart_core::classifier::KeywordPredictor;
use priorart_core::config::{FusionWeights, SearchConfig};
use priorart_core::error::Stage;
use priorart_core::extractor::RuleBasedExtractor;
use priorart_core::graph::ClassificationGraph;
use priorart_core::{Collaborators, Patent, RetrievalEngine, SearchError};
use providers::hashed::HashedEmbedder;
use providers::{ClassificationPredictor, EmbedResponse, EmbeddingProvider, ProviderError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

const QUERY: &str = "A fault-tolerant distributed system for leader election using consensus";

fn corpus() -> Vec<Patent> {
    vec![
        Patent::new(
            "P1",
            "A distributed consensus protocol comprising: leader election among replicas; and quorum voting on log entries.",
            ["G06F9/50", "G06F9/54"],
        ),
        Patent::new(
            "P2",
            "A distributed locking service comprising: time-bounded leases; and fencing tokens.",
            ["G06F9/48"],
        ),
        Patent::new("P3", "A centralized scheduling system.", ["G06F9/52"]),
    ]
}

fn collaborators(embedder: Arc<dyn EmbeddingProvider>) -> Collaborators {
    Collaborators {
        embedder,
        extractor: Arc::new(RuleBasedExtractor::new()),
        predictor: Arc::new(KeywordPredictor::default()),
    }
}

fn default_engine() -> RetrievalEngine {
    RetrievalEngine::new(
        collaborators(Arc::new(HashedEmbedder::default())),
        Arc::new(ClassificationGraph::with_default_relations()),
    )
}

fn ids(hits: &[priorart_core::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.patent_id.as_str()).collect()
}

#[tokio::test]
async fn consensus_patent_outranks_unrelated_scheduler() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();

    let hits = engine.search(QUERY, 3).await.unwrap();
    let score = |id: &str| hits.iter().find(|h| h.patent_id == id).unwrap().score;
    assert!(score("P1") > score("P3"));
    assert_eq!(hits[0].patent_id, "P1");

    let p1 = hits.iter().find(|h| h.patent_id == "P1").unwrap();
    assert_eq!(p1.code_overlap, 2);
    let p3 = hits.iter().find(|h| h.patent_id == "P3").unwrap();
    assert_eq!(p3.code_overlap, 1);
}

#[tokio::test]
async fn one_hop_neighbours_both_collect_bonus() {
    // Deterministic predictor so the seed is exactly {A}.
    struct Fixed;
    #[async_trait]
    impl ClassificationPredictor for Fixed {
        async fn predict(&self, _claim: &str) -> Result<BTreeSet<String>, ProviderError> {
            Ok(["A".to_string()].into_iter().collect())
        }
    }

    let engine = RetrievalEngine::new(
        Collaborators {
            embedder: Arc::new(HashedEmbedder::new(64)),
            extractor: Arc::new(RuleBasedExtractor::new()),
            predictor: Arc::new(Fixed),
        },
        Arc::new(ClassificationGraph::build([("A", "B")])),
    )
    .with_search_config(SearchConfig {
        expansion_hops: 1,
        ..SearchConfig::default()
    });
    engine
        .build_index(vec![
            Patent::new("P1", "first widget", ["A"]),
            Patent::new("P2", "second gadget", ["B"]),
        ])
        .await
        .unwrap();

    let hits = engine.search("a gizmo", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert_eq!(hit.code_overlap, 1);
        assert!((hit.score - (hit.fused + 0.15)).abs() < 1e-6);
    }
}

#[tokio::test]
async fn large_k_returns_every_patent_once_in_order() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();

    let hits = engine.search(QUERY, 50).await.unwrap();
    let mut seen = ids(&hits);
    assert_eq!(seen.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen, vec!["P1", "P2", "P3"]);
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();

    let first = engine.search(QUERY, 3).await.unwrap();
    for _ in 0..5 {
        assert_eq!(engine.search(QUERY, 3).await.unwrap(), first);
    }

    let rebuilt = default_engine();
    rebuilt.build_index(corpus()).await.unwrap();
    assert_eq!(rebuilt.search(QUERY, 3).await.unwrap(), first);
}

#[tokio::test]
async fn claim_only_weights_rank_by_claim_similarity() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();
    let options = SearchConfig {
        weights: FusionWeights {
            claim: 0.55,
            feature: 0.0,
            cpc_overlap: 0.0,
        },
        ..SearchConfig::default()
    };

    let hits = engine.search_with(QUERY, 3, &options).await.unwrap();
    for hit in &hits {
        assert!((hit.score - 0.55 * hit.claim_score).abs() < 1e-6);
    }
    for pair in hits.windows(2) {
        assert!(pair[0].claim_score >= pair[1].claim_score);
    }
}

#[tokio::test]
async fn feature_only_weights_rank_by_feature_similarity() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();
    let options = SearchConfig {
        weights: FusionWeights {
            claim: 0.0,
            feature: 0.30,
            cpc_overlap: 0.0,
        },
        ..SearchConfig::default()
    };

    let hits = engine.search_with(QUERY, 3, &options).await.unwrap();
    assert_eq!(hits.len(), 3);
    for hit in &hits {
        assert!((hit.score - 0.30 * hit.feature_score).abs() < 1e-6);
    }
    for pair in hits.windows(2) {
        assert!(pair[0].feature_score >= pair[1].feature_score);
    }
}

#[tokio::test]
async fn smaller_pool_limits_candidates() {
    let engine = default_engine();
    engine.build_index(corpus()).await.unwrap();
    let options = SearchConfig {
        candidate_pool_size: 1,
        ..SearchConfig::default()
    };
    let hits = engine.search_with(QUERY, 3, &options).await.unwrap();
    assert!(!hits.is_empty() && hits.len() <= 2);

    let zero = SearchConfig {
        candidate_pool_size: 0,
        ..SearchConfig::default()
    };
    assert!(matches!(
        engine.search_with(QUERY, 3, &zero).await,
        Err(SearchError::InvalidInput(_))
    ));
}

/// Delegates to the hashed embedder until switched off.
struct FlakyEmbedder {
    inner: HashedEmbedder,
    failing: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::RequestFailed("connection reset".into()));
        }
        self.inner.embed(texts).await
    }
}

#[tokio::test]
async fn embedding_outage_is_transient_and_keeps_index() {
    let embedder = Arc::new(FlakyEmbedder {
        inner: HashedEmbedder::default(),
        failing: AtomicBool::new(false),
    });
    let engine = RetrievalEngine::new(
        collaborators(embedder.clone()),
        Arc::new(ClassificationGraph::with_default_relations()),
    );
    engine.build_index(corpus()).await.unwrap();
    let before = engine.search(QUERY, 3).await.unwrap();

    embedder.failing.store(true, Ordering::SeqCst);
    let err = engine
        .build_index(vec![Patent::new("P9", "a new claim", ["G06F9/50"])])
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(
        err,
        SearchError::Collaborator {
            stage: Stage::Embed,
            ..
        }
    ));

    let err = engine.search(QUERY, 3).await.unwrap_err();
    assert!(err.is_transient());

    embedder.failing.store(false, Ordering::SeqCst);
    assert_eq!(engine.len(), 3);
    assert_eq!(engine.search(QUERY, 3).await.unwrap(), before);
}

/// Answers every text with a vector containing NaN.
struct NanEmbedder;

#[async_trait]
impl EmbeddingProvider for NanEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: vec![vec![f32::NAN; 8]; texts.len()],
        })
    }
}

#[tokio::test]
async fn nan_embeddings_fail_build_with_typed_error() {
    let engine = RetrievalEngine::new(
        collaborators(Arc::new(NanEmbedder)),
        Arc::new(ClassificationGraph::with_default_relations()),
    );
    let err = engine.build_index(corpus()).await.unwrap_err();
    assert!(matches!(
        err,
        SearchError::Collaborator {
            stage: Stage::Embed,
            source: ProviderError::InvalidResponse(_),
        }
    ));
    assert!(!engine.is_ready());
}

#[tokio::test]
async fn empty_prediction_is_a_collaborator_error() {
    struct Silent;
    #[async_trait]
    impl ClassificationPredictor for Silent {
        async fn predict(&self, _claim: &str) -> Result<BTreeSet<String>, ProviderError> {
            Ok(BTreeSet::new())
        }
    }

    let engine = RetrievalEngine::new(
        Collaborators {
            embedder: Arc::new(HashedEmbedder::default()),
            extractor: Arc::new(RuleBasedExtractor::new()),
            predictor: Arc::new(Silent),
        },
        Arc::new(ClassificationGraph::with_default_relations()),
    );
    engine.build_index(corpus()).await.unwrap();
    let err = engine.search(QUERY, 3).await.unwrap_err();
    assert!(matches!(
        err,
        SearchError::Collaborator {
            stage: Stage::Predict,
            ..
        }
    ));
}

/// Blocks any batch containing `GATE` until released.
struct GatedEmbedder {
    inner: HashedEmbedder,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl EmbeddingProvider for GatedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        if texts.iter().any(|t| t.contains("GATE")) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.embed(texts).await
    }
}

#[tokio::test]
async fn search_during_rebuild_sees_previous_index() {
    let embedder = Arc::new(GatedEmbedder {
        inner: HashedEmbedder::default(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let engine = Arc::new(RetrievalEngine::new(
        collaborators(embedder.clone()),
        Arc::new(ClassificationGraph::with_default_relations()),
    ));
    engine.build_index(corpus()).await.unwrap();
    let before = engine.search(QUERY, 3).await.unwrap();

    let rebuild = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut next = corpus();
            next.push(Patent::new("P4", "GATE consensus appliance", ["G06F9/50"]));
            engine.build_index(next).await
        })
    };
    embedder.entered.notified().await;

    assert_eq!(engine.len(), 3);
    assert_eq!(engine.search(QUERY, 3).await.unwrap(), before);

    embedder.release.notify_one();
    let summary = rebuild.await.unwrap().unwrap();
    assert_eq!(summary.indexed, 4);
    assert_eq!(engine.len(), 4);
    let ids_after: Vec<String> = engine
        .search(QUERY, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.patent_id)
        .collect();
    assert!(ids_after.contains(&"P4".to_string()));
}
