//! In-memory product vector index with inner-product search.
//!
//! Holds the catalog's fused embeddings as a flat row-major matrix plus a
//! parallel product-id array, mirroring the offline build artifacts (vector
//! table + identifier list). The offline job normalizes rows before writing,
//! so inner products against a unit query vector are cosine scores.

/// A search hit: a row position (convertible to a product id via
/// [`ProductIndex::id_at`]) and its similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    pub position: usize,
    pub score: f32,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot search with zero-norm vector")]
    ZeroNormVector,
}

/// Read-only after load; one row per catalog product.
pub struct ProductIndex {
    ids: Vec<u64>,
    vectors: Vec<f32>,
    dimensions: usize,
}

impl ProductIndex {
    /// Create a new empty index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            dimensions,
        }
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity * dimensions),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed rows; also the length of the identifier array.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append a row. Rows are positional; the offline build writes them in
    /// identifier-array order.
    pub fn push(&mut self, id: u64, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        self.ids.push(id);
        self.vectors.extend(embedding);
        Ok(())
    }

    /// Product id for a row position.
    pub fn id_at(&self, position: usize) -> Option<u64> {
        self.ids.get(position).copied()
    }

    /// Row vector at a position.
    pub fn vector_at(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimensions;
        Some(&self.vectors[start..start + self.dimensions])
    }

    /// Iterate `(id, row)` pairs in position order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.ids
            .iter()
            .copied()
            .zip(self.vectors.chunks_exact(self.dimensions))
    }

    /// Inner-product search: the `n` highest-scoring positions in
    /// decreasing score order.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<IndexHit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }
        let query_norm: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut hits: Vec<IndexHit> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, row)| IndexHit {
                position,
                score: dot(query, row),
            })
            .collect();

        // Sort by score descending; equal scores keep position order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(n);

        Ok(hits)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index() {
        let index = ProductIndex::new(4);
        assert_eq!(index.dimensions(), 4);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_push_and_lookup() {
        let mut index = ProductIndex::new(3);
        index.push(42, vec![1.0, 0.0, 0.0]).unwrap();
        index.push(7, vec![0.0, 1.0, 0.0]).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.id_at(0), Some(42));
        assert_eq!(index.id_at(1), Some(7));
        assert_eq!(index.id_at(2), None);
        assert_eq!(index.vector_at(1), Some(&[0.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_push_dimension_mismatch() {
        let mut index = ProductIndex::new(3);
        let result = index.push(1, vec![1.0, 0.0]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_ordering() {
        let mut index = ProductIndex::new(3);
        index.push(1, vec![1.0, 0.0, 0.0]).unwrap();
        index.push(2, vec![0.0, 1.0, 0.0]).unwrap();
        index.push(3, vec![0.9, 0.1, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_search_truncates_to_n() {
        let mut index = ProductIndex::new(2);
        for i in 0..10 {
            index.push(i, vec![1.0, i as f32 * 0.01]).unwrap();
        }
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = ProductIndex::new(3);
        let result = index.search(&[1.0, 0.0], 5);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_zero_norm_query() {
        let mut index = ProductIndex::new(2);
        index.push(1, vec![1.0, 0.0]).unwrap();
        let result = index.search(&[0.0, 0.0], 5);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_equal_scores_keep_position_order() {
        let mut index = ProductIndex::new(2);
        index.push(10, vec![0.0, 1.0]).unwrap();
        index.push(20, vec![0.0, 1.0]).unwrap();
        let hits = index.search(&[0.0, 1.0], 10).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
    }
}
