//! Core library: vector index, classification graph, claim features,
//! score fusion, the retrieval engine and claim-to-claim comparison.

pub mod classifier;
pub mod compare;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod vectorstore;

pub use engine::{BuildSummary, Collaborators, RetrievalEngine};
pub use error::SearchError;
pub use models::{Patent, SearchHit};
