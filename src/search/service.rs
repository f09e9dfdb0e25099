//! High-level search service.
//!
//! Owns the process-lifetime state (embedding model, product index,
//! catalog, tag vocabulary) and runs the per-request pipeline:
//! parse → embed → localize patch → fuse → retrieve → filter → assemble.
//!
//! The request path is fail-soft: each stage's failure is logged and
//! replaced with its documented default, so a degraded ranking beats a
//! failed request. The only hard stop is having no input vector at all.

use std::sync::Arc;

use crate::catalog::{CatalogError, CatalogStore};
use crate::config::Config;
use crate::embedding::{ClipEmbedding, Embedder, EmbeddingError};
use crate::images;
use crate::search::filter::filter_candidates;
use crate::search::fusion::{self, FusionError};
use crate::search::index::ProductIndex;
use crate::search::keywords;
use crate::search::patch::{self, TagVocabulary};
use crate::search::query::SemanticQuery;
use crate::search::results::{assemble, SearchResult};
use crate::search::retrieve;
use crate::search::storage::{IndexStorage, IndexStorageError};

/// Result cap for the search-backed category browse route.
pub const CATEGORY_SEARCH_LIMIT: usize = 50;

/// Startup errors. There is no recovery path besides restart: a service
/// that cannot load its model, catalog or index has nothing to serve.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Index storage error: {0}")]
    Storage(#[from] IndexStorageError),

    #[error("Index file not found: {0}")]
    MissingIndex(String),
}

/// Read-only after construction; shared across requests behind an Arc.
pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    index: ProductIndex,
    catalog: CatalogStore,
    vocabulary: TagVocabulary,
}

impl SearchService {
    /// Load everything from the configured data directory: embedding model
    /// (downloading on first run), catalog JSONL, and the binary index
    /// written by the offline embedding job.
    pub fn open(config: &Config) -> Result<Self, ServiceError> {
        let embedding_config = &config.embedding;
        let timeout = std::time::Duration::from_secs(embedding_config.download_timeout_secs);
        let embedder = ClipEmbedding::new(
            &embedding_config.model,
            config.base_dir(),
            Some(timeout),
        )?;
        log::info!(
            "embedding model '{}' ready ({} dims)",
            embedder.name(),
            embedder.dimensions()
        );

        let catalog = CatalogStore::load(&config.products_path())?;

        let storage = IndexStorage::new(config.index_path());
        if !storage.exists() {
            return Err(ServiceError::MissingIndex(
                storage.path().display().to_string(),
            ));
        }
        let index = storage.load(&embedder.model_id_hash(), embedder.dimensions())?;
        log::info!("loaded {} index entries", index.len());

        Self::with_components(Arc::new(embedder), index, catalog)
    }

    /// Wire a service from pre-built components. The tag vocabulary is
    /// embedded here, once.
    pub fn with_components(
        embedder: Arc<dyn Embedder>,
        index: ProductIndex,
        catalog: CatalogStore,
    ) -> Result<Self, ServiceError> {
        let vocabulary = TagVocabulary::build(embedder.as_ref())?;
        Ok(Self {
            embedder,
            index,
            catalog,
            vocabulary,
        })
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    /// Run a search. Never errors: any internal failure degrades per the
    /// fail-soft policy, and no usable input yields an empty list.
    pub fn search(
        &self,
        text: Option<&str>,
        image_bytes: Option<&[u8]>,
        limit: usize,
    ) -> Vec<SearchResult> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());

        let query = text.map(SemanticQuery::parse).unwrap_or_default();
        let has_intent = query.has_intent();
        if has_intent {
            log::debug!("parsed intent: {:?}", query);
        }

        // Text embedding; a failure degrades to an image-only query.
        let text_vec = text.and_then(|t| match self.embedder.embed_text(t) {
            Ok(vec) => Some(vec),
            Err(err) => {
                log::warn!("text embedding failed: {}", err);
                None
            }
        });

        if let Some(t) = text {
            log::debug!("query keywords: {:?}", keywords::keyword_set(t, &query));
        }

        // Image: locate the best patch, keep its embedding and a preview.
        let mut image_vec: Option<Vec<f32>> = None;
        let mut patch_preview: Option<String> = None;
        if let Some(bytes) = image_bytes {
            match images::decode_image(bytes) {
                Ok(image) => {
                    let selection = patch::locate(
                        self.embedder.as_ref(),
                        &image,
                        text_vec.as_deref(),
                        &query,
                        &self.vocabulary,
                    );
                    if !selection.tags.is_empty() {
                        log::debug!("patch tags: {:?}", selection.tags);
                    }
                    match images::jpeg_data_url(&selection.image) {
                        Ok(url) => patch_preview = Some(url),
                        Err(err) => log::warn!("patch preview encoding failed: {:#}", err),
                    }
                    image_vec = selection.embedding;
                }
                Err(err) => {
                    log::warn!("image decoding failed: {:#}", err);
                }
            }
        }

        let mut vectors: Vec<Vec<f32>> = Vec::new();
        if let Some(vec) = text_vec {
            vectors.push(vec);
        }
        if let Some(vec) = image_vec {
            vectors.push(vec);
        }

        let query_vec = match fusion::fuse(&vectors, has_intent) {
            Ok(vec) => vec,
            Err(FusionError::NoInput) => {
                log::info!("no searchable input; returning empty result list");
                return vec![];
            }
            Err(err) => {
                log::error!("fusion failed: {}", err);
                return vec![];
            }
        };

        let candidates = match retrieve::retrieve(&self.index, &query_vec, limit) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::error!("index search failed: {}", err);
                return vec![];
            }
        };
        log::debug!("retrieved {} raw candidates", candidates.len());

        let filtered = filter_candidates(candidates, &query, &self.index, &self.catalog);

        let capped: Vec<usize> = filtered.into_iter().take(limit).collect();
        assemble(
            &capped,
            &self.index,
            &self.catalog,
            &query,
            patch_preview.as_deref(),
        )
    }

    /// Catalog browse by article-type category; no embedding involved.
    pub fn browse_category(&self, category: &str) -> Vec<SearchResult> {
        self.catalog
            .browse(category)
            .into_iter()
            .enumerate()
            .map(|(i, product)| SearchResult {
                id: product.id,
                rank: i + 1,
                name: product.display_name.clone(),
                image: product.image_ref().map(|s| s.to_string()),
                rating: product.rating_or_zero(),
                num_reviews: product.num_reviews_or_zero(),
                price: product.price,
                discount: product.discount_percent,
                why: String::new(),
                patch: None,
            })
            .collect()
    }

    /// Search-backed category browse: run the category name as a text
    /// query, then (when an alias target exists) hold results to an exact
    /// master/subcategory match.
    pub fn category_search(&self, category: &str) -> Vec<SearchResult> {
        let results = self.search(Some(category), None, CATEGORY_SEARCH_LIMIT);

        let Some(target) = CatalogStore::category_target(category) else {
            return results;
        };

        results
            .into_iter()
            .filter(|result| {
                self.catalog.get(result.id).is_some_and(|p| {
                    p.master_category == target.master_category
                        && (target.sub_categories.contains(&p.sub_category.as_str())
                            || target.sub_categories.contains(&p.article_type.as_str()))
                })
            })
            .collect()
    }
}
