//! Multimodal search pipeline.
//!
//! This module contains the query-understanding and ranking core:
//!
//! - `query`: free text -> structured semantic intent
//! - `keywords`: statistical keyword extraction for logging
//! - `fusion`: text/image embedding fusion into one query vector
//! - `index`: in-memory inner-product index over catalog embeddings
//! - `storage`: binary persistence for the index (products.bin)
//! - `retrieve`: oversampled candidate retrieval
//! - `filter`: soft semantic filtering of candidates
//! - `patch`: image patch localization and visual tags
//! - `explain`: per-result match explanations
//! - `results`: final ranked-result assembly
//! - `service`: the pipeline orchestrator

pub mod explain;
pub mod filter;
pub mod fusion;
pub mod index;
pub mod keywords;
pub mod patch;
pub mod query;
pub mod results;
pub mod retrieve;
pub mod service;
pub mod storage;

pub use index::ProductIndex;
pub use query::SemanticQuery;
pub use results::SearchResult;
pub use service::{SearchService, ServiceError};
pub use storage::IndexStorage;

/// Default number of results per search request.
pub const DEFAULT_RESULT_LIMIT: usize = 9;
