//! Embedding model wrapper for fastembed.
//!
//! The search pipeline talks to the embedding service through the
//! [`Embedder`] trait so tests can substitute a deterministic stub. The
//! production implementation wraps fastembed's CLIP ViT-B/32 text and vision
//! models, the one pair that shares a vector space, which multimodal
//! retrieval requires:
//! - Lazy model download with configurable cache directory
//! - Batch embedding for grid-search cells
//! - Unit-norm enforcement on every returned vector

use fastembed::{
    ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions, TextEmbedding,
};
use image::{DynamicImage, ImageFormat};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// The embedding service seam.
///
/// Implementations must return L2-normalized vectors of a fixed dimension
/// and be deterministic for identical inputs; fusion, retrieval and patch
/// scoring all assume unit vectors.
pub trait Embedder: Send + Sync {
    /// Embedding dimensions for this model.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed multiple texts in one call.
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single decoded image.
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed multiple decoded images in one call. Grid search depends on
    /// this being a single batch: cell evaluation order must not matter.
    fn embed_images(&self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// CLIP text+vision model pair behind Mutexes, because fastembed's embed()
/// requires &mut self.
pub struct ClipEmbedding {
    text: Mutex<TextEmbedding>,
    vision: Mutex<ImageEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl ClipEmbedding {
    /// Create the model pair, downloading weights on first use.
    ///
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    ///
    /// # Arguments
    /// * `model_name` - Name of the model (e.g., "clip-vit-b-32")
    /// * `cache_dir` - Directory to cache downloaded models
    /// * `download_timeout` - Optional timeout for model download
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let (text_model, vision_model) = Self::parse_model_name(model_name)?;
        let _timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        let text_options = InitOptions::new(text_model)
            .with_cache_dir(models_dir.clone())
            .with_show_download_progress(true);
        let mut text = TextEmbedding::try_new(text_options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let vision_options = ImageInitOptions::new(vision_model)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);
        let vision = ImageEmbedding::try_new(vision_options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = Self::probe_dimensions(&mut text)?;

        Ok(Self {
            text: Mutex::new(text),
            vision: Mutex::new(vision),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    /// Get the model name
    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Compute SHA256 hash of the model name for storage identification.
    pub fn model_id_hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.model_name.as_bytes());
        hasher.finalize().into()
    }

    /// Parse model name string to the fastembed text/vision enum pair.
    fn parse_model_name(
        name: &str,
    ) -> Result<(fastembed::EmbeddingModel, ImageEmbeddingModel), EmbeddingError> {
        match name.to_lowercase().as_str() {
            "clip-vit-b-32" | "clipvitb32" => Ok((
                fastembed::EmbeddingModel::ClipVitB32,
                ImageEmbeddingModel::ClipVitB32,
            )),
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: clip-vit-b-32 (text and image queries share one vector space)",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }

    /// Write images to transient PNG files for fastembed's path-based API.
    fn temp_image_files(
        images: &[DynamicImage],
    ) -> Result<Vec<tempfile::NamedTempFile>, EmbeddingError> {
        images
            .iter()
            .map(|img| {
                let file = tempfile::Builder::new()
                    .prefix("vitrine-embed-")
                    .suffix(".png")
                    .tempfile()
                    .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
                img.save_with_format(file.path(), ImageFormat::Png)
                    .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
                Ok(file)
            })
            .collect()
    }
}

impl Embedder for ClipEmbedding {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_texts(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.text.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        Ok(embeddings.into_iter().map(unit_normalized).collect())
    }

    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_images(std::slice::from_ref(image))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    fn embed_images(&self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if images.is_empty() {
            return Ok(vec![]);
        }

        // Files must outlive the embed call.
        let files = Self::temp_image_files(images)?;
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path().to_path_buf()).collect();

        let mut model = self.vision.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        let embeddings = model
            .embed(paths, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        Ok(embeddings.into_iter().map(unit_normalized).collect())
    }
}

/// Scale a vector to unit L2 norm. Zero vectors pass through untouched
/// rather than becoming NaN.
fn unit_normalized(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
