//! Query-vector fusion.
//!
//! Merges the text embedding and the image-patch embedding into one query
//! vector. When the parser found structured intent the text side carries
//! more weight; otherwise the image contributes closer to parity.

/// Text/image weights when structured intent was detected.
pub const TEXT_WEIGHT_WITH_INTENT: f32 = 0.65;
pub const IMAGE_WEIGHT_WITH_INTENT: f32 = 0.35;

/// Text/image weights for a plain text+image query.
pub const TEXT_WEIGHT: f32 = 0.55;
pub const IMAGE_WEIGHT: f32 = 0.45;

#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// No searchable input at all; the caller answers with an empty result
    /// list instead of querying the index.
    #[error("no input vectors to fuse")]
    NoInput,

    #[error("fusion takes at most two vectors, got {0}")]
    TooManyInputs(usize),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("fused vector has zero norm")]
    ZeroNorm,
}

/// Fuse 1–2 unit vectors (text first, image second) into one unit query
/// vector.
///
/// A single vector passes through unchanged. Two vectors are averaged with
/// intent-dependent weights and re-normalized.
pub fn fuse(vectors: &[Vec<f32>], has_structured_intent: bool) -> Result<Vec<f32>, FusionError> {
    match vectors {
        [] => Err(FusionError::NoInput),
        [single] => Ok(single.clone()),
        [text, image] => {
            if text.len() != image.len() {
                return Err(FusionError::DimensionMismatch {
                    expected: text.len(),
                    got: image.len(),
                });
            }

            let (text_weight, image_weight) = if has_structured_intent {
                (TEXT_WEIGHT_WITH_INTENT, IMAGE_WEIGHT_WITH_INTENT)
            } else {
                (TEXT_WEIGHT, IMAGE_WEIGHT)
            };

            let mut fused: Vec<f32> = text
                .iter()
                .zip(image.iter())
                .map(|(t, i)| text_weight * t + image_weight * i)
                .collect();

            let norm = l2_norm(&fused);
            if norm < f32::EPSILON {
                return Err(FusionError::ZeroNorm);
            }
            for x in &mut fused {
                *x /= norm;
            }
            Ok(fused)
        }
        more => Err(FusionError::TooManyInputs(more.len())),
    }
}

/// Compute L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
