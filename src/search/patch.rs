//! Image patch localization.
//!
//! Finds the sub-region of an uploaded photo that best matches the query,
//! so the image's contribution to the fused query vector comes from the
//! relevant object rather than the whole scene:
//!
//! - Without structured intent: a 5x5 grid of overlapping cells scored by
//!   cosine similarity to the text embedding, with a centered square-crop
//!   fallback when every cell scores below [`LOW_CONFIDENCE_THRESHOLD`].
//! - With structured intent: a 6x6 grid evaluated at half-cell stride, with
//!   per-item embedding boosts and an optional material-focused target.
//!
//! All cells of a pass are embedded in one batch call; the max reduction
//! scans raster order with a strict comparison, so the first cell reaching
//! the maximum wins regardless of how the batch was computed.
//!
//! Localization never fails outward: any internal error falls back to the
//! unmodified input image with no tags.

use image::DynamicImage;

use crate::embedding::{Embedder, EmbeddingError};
use crate::search::query::SemanticQuery;

/// Cells per side for the no-intent pass.
pub const STANDARD_GRID: u32 = 5;

/// Base cells per side for the intent pass (scanned at half-cell stride).
pub const FINE_GRID: u32 = 6;

/// Below this best-cell score the standard pass distrusts the grid and
/// falls back to a centered square crop.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.15;

/// A cell this similar to an item embedding counts as showing that item.
pub const ITEM_MATCH_THRESHOLD: f32 = 0.2;

/// Additive score boost per matching item embedding. Deliberately uncapped:
/// boosted scores may exceed 1.0.
pub const ITEM_MATCH_BOOST: f32 = 0.1;

/// Minimum base cell side for the standard pass; smaller images skip the
/// grid and return whole.
pub const STANDARD_MIN_CELL: u32 = 50;

/// Minimum base cell side for the fine pass.
pub const FINE_MIN_CELL: u32 = 40;

/// Minimum clipped crop side in the fine pass; smaller crops are skipped.
pub const FINE_MIN_CROP: u32 = 30;

/// Material/text blend weights for the fine-pass search target.
pub const MATERIAL_WEIGHT: f32 = 0.7;
pub const MATERIAL_TEXT_WEIGHT: f32 = 0.3;

/// Number of visual tags attached to a located patch.
pub const TAG_TOP_K: usize = 3;

/// Fixed vocabulary the chosen patch is projected onto for tagging.
pub const VISUAL_TAGS: &[&str] = &[
    "shoe", "sneaker", "boot", "heel", "pant", "trouser", "chino", "shirt", "dress", "jacket",
    "watch", "pattern", "plain",
];

/// The outcome of localization: the chosen region, its embedding (when one
/// could be computed) and up to [`TAG_TOP_K`] visual tags.
pub struct PatchSelection {
    pub image: DynamicImage,
    pub embedding: Option<Vec<f32>>,
    pub tags: Vec<String>,
}

/// Visual-tag vocabulary embeddings, computed once at startup.
pub struct TagVocabulary {
    entries: Vec<(String, Vec<f32>)>,
}

impl TagVocabulary {
    /// Embed the fixed tag vocabulary.
    pub fn build(embedder: &dyn Embedder) -> Result<Self, EmbeddingError> {
        let words: Vec<String> = VISUAL_TAGS.iter().map(|t| t.to_string()).collect();
        let embeddings = embedder.embed_texts(&words)?;
        Ok(Self {
            entries: words.into_iter().zip(embeddings).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top tags for a patch embedding, by cosine similarity. Equal scores
    /// keep vocabulary order.
    pub fn top_tags(&self, embedding: &[f32]) -> Vec<String> {
        let mut scored: Vec<(&str, f32)> = self
            .entries
            .iter()
            .map(|(word, vec)| (word.as_str(), cosine(embedding, vec)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(TAG_TOP_K)
            .map(|(word, _)| word.to_string())
            .collect()
    }
}

/// A grid cell with its embedding and score.
struct ScoredCell {
    image: DynamicImage,
    embedding: Vec<f32>,
    score: f32,
}

/// Locate the best-matching patch for the query.
///
/// `text_embedding` is the full-query text vector, absent for image-only
/// requests or when text embedding failed upstream.
pub fn locate(
    embedder: &dyn Embedder,
    image: &DynamicImage,
    text_embedding: Option<&[f32]>,
    query: &SemanticQuery,
    vocabulary: &TagVocabulary,
) -> PatchSelection {
    let located = if query.has_intent() {
        fine_grid_search(embedder, image, text_embedding, query)
    } else {
        standard_grid_search(embedder, image, text_embedding)
    };

    match located {
        Ok(Some(cell)) => {
            log::debug!("patch selected with score {:.4}", cell.score);
            let tags = vocabulary.top_tags(&cell.embedding);
            PatchSelection {
                image: cell.image,
                embedding: Some(cell.embedding),
                tags,
            }
        }
        // No usable search target or the image is too small for the grid:
        // the whole image is the selection.
        Ok(None) => whole_image(embedder, image, Some(vocabulary)),
        Err(err) => {
            log::warn!("patch localization failed: {}; returning full image", err);
            whole_image(embedder, image, None)
        }
    }
}

/// The degenerate selection: the unmodified input, embedded best-effort.
/// Tags are only attached on non-error paths.
fn whole_image(
    embedder: &dyn Embedder,
    image: &DynamicImage,
    vocabulary: Option<&TagVocabulary>,
) -> PatchSelection {
    let embedding = match embedder.embed_image(image) {
        Ok(v) => Some(v),
        Err(err) => {
            log::warn!("whole-image embedding failed: {}", err);
            None
        }
    };
    let tags = match (&embedding, vocabulary) {
        (Some(embedding), Some(vocabulary)) => vocabulary.top_tags(embedding),
        _ => Vec::new(),
    };
    PatchSelection {
        image: image.clone(),
        embedding,
        tags,
    }
}

/// 5x5 overlapping grid scored against the text embedding, with the
/// low-confidence center-crop fallback.
fn standard_grid_search(
    embedder: &dyn Embedder,
    image: &DynamicImage,
    text_embedding: Option<&[f32]>,
) -> Result<Option<ScoredCell>, EmbeddingError> {
    let Some(target) = text_embedding else {
        return Ok(None);
    };

    let (w, h) = (image.width(), image.height());
    let pw = w / STANDARD_GRID;
    let ph = h / STANDARD_GRID;
    if pw < STANDARD_MIN_CELL || ph < STANDARD_MIN_CELL {
        return Ok(None);
    }

    // Each cell grows a quarter cell on each side, clipped to bounds.
    let mut cells = Vec::with_capacity((STANDARD_GRID * STANDARD_GRID) as usize);
    for gy in 0..STANDARD_GRID {
        for gx in 0..STANDARD_GRID {
            let x1 = (gx * pw).saturating_sub(pw / 4);
            let y1 = (gy * ph).saturating_sub(ph / 4);
            let x2 = (x1 + pw + pw / 2).min(w);
            let y2 = (y1 + ph + ph / 2).min(h);
            cells.push(image.crop_imm(x1, y1, x2 - x1, y2 - y1));
        }
    }

    let embeddings = embedder.embed_images(&cells)?;

    let mut best: Option<ScoredCell> = None;
    for (cell, embedding) in cells.into_iter().zip(embeddings) {
        let score = cosine(&embedding, target);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(ScoredCell {
                image: cell,
                embedding,
                score,
            });
        }
    }
    let best = match best {
        Some(best) => best,
        None => return Ok(None),
    };

    if best.score < LOW_CONFIDENCE_THRESHOLD {
        log::debug!(
            "best cell score {:.4} below {}; using center-crop fallback",
            best.score,
            LOW_CONFIDENCE_THRESHOLD
        );
        let crop = center_square_crop(image);
        let embedding = embedder.embed_image(&crop)?;
        return Ok(Some(ScoredCell {
            image: crop,
            embedding,
            score: best.score,
        }));
    }

    Ok(Some(best))
}

/// 6x6 grid at half-cell stride (11x11 positions) scored against a
/// material/text blend, boosted per matching item embedding. No
/// low-confidence fallback on this branch.
fn fine_grid_search(
    embedder: &dyn Embedder,
    image: &DynamicImage,
    text_embedding: Option<&[f32]>,
    query: &SemanticQuery,
) -> Result<Option<ScoredCell>, EmbeddingError> {
    let (w, h) = (image.width(), image.height());
    let pw = w / FINE_GRID;
    let ph = h / FINE_GRID;
    if pw < FINE_MIN_CELL || ph < FINE_MIN_CELL {
        return Ok(None);
    }

    // One focused embedding per matched item word; individual failures only
    // lose that item's boost.
    let mut item_vecs: Vec<Vec<f32>> = Vec::new();
    for item in &query.items {
        match embedder.embed_text(item.word) {
            Ok(vec) => item_vecs.push(vec),
            Err(err) => {
                log::warn!("item embedding for '{}' failed: {}", item.word, err);
            }
        }
    }

    let material_vec = match query.wanted.materials.first() {
        Some(material) => match embedder.embed_text(material) {
            Ok(vec) => Some(vec),
            Err(err) => {
                log::warn!("material embedding for '{}' failed: {}", material, err);
                None
            }
        },
        None => None,
    };

    // Search target: material-weighted blend when both are present. The
    // blend is not re-normalized; cosine scoring absorbs the scale.
    let target: Option<Vec<f32>> = match (material_vec, text_embedding) {
        (Some(material), Some(text)) => Some(
            material
                .iter()
                .zip(text.iter())
                .map(|(m, t)| MATERIAL_WEIGHT * m + MATERIAL_TEXT_WEIGHT * t)
                .collect(),
        ),
        (Some(material), None) => Some(material),
        (None, Some(text)) => Some(text.to_vec()),
        (None, None) => None,
    };
    let Some(target) = target else {
        return Ok(None);
    };

    let positions = 2 * FINE_GRID - 1;
    let mut cells = Vec::new();
    for gy in 0..positions {
        for gx in 0..positions {
            let x1 = gx * pw / 2;
            let y1 = gy * ph / 2;
            let x2 = (x1 + pw).min(w);
            let y2 = (y1 + ph).min(h);
            if x2 - x1 < FINE_MIN_CROP || y2 - y1 < FINE_MIN_CROP {
                continue;
            }
            cells.push(image.crop_imm(x1, y1, x2 - x1, y2 - y1));
        }
    }
    if cells.is_empty() {
        return Ok(None);
    }

    let embeddings = embedder.embed_images(&cells)?;

    let mut best: Option<ScoredCell> = None;
    for (cell, embedding) in cells.into_iter().zip(embeddings) {
        let mut score = cosine(&embedding, &target);
        for item_vec in &item_vecs {
            if cosine(&embedding, item_vec) > ITEM_MATCH_THRESHOLD {
                score += ITEM_MATCH_BOOST;
            }
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(ScoredCell {
                image: cell,
                embedding,
                score,
            });
        }
    }

    Ok(best)
}

/// Centered square crop covering the image's shorter dimension.
fn center_square_crop(image: &DynamicImage) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let side = w.min(h);
    let x = (w - side) / 2;
    let y = (h - side) / 2;
    image.crop_imm(x, y, side, side)
}

/// Cosine similarity; zero-norm operands score 0.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
