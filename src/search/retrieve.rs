//! Candidate retrieval: thin adapter over the vector index.
//!
//! Oversamples so the filter stages have headroom, and drops any position
//! the identifier array cannot resolve. No metadata ranking happens here.

use crate::search::index::{IndexError, ProductIndex};

/// Neighbors requested per result slot.
pub const CANDIDATE_MULTIPLIER: usize = 8;

/// Hard cap on the neighbor request.
pub const MAX_CANDIDATES: usize = 500;

/// Retrieve an oversized, ordered candidate set for `k` final results.
pub fn retrieve(
    index: &ProductIndex,
    query: &[f32],
    k: usize,
) -> Result<Vec<usize>, IndexError> {
    let n = candidate_count(k);
    let hits = index.search(query, n)?;
    Ok(clamp_positions(
        hits.into_iter().map(|h| h.position),
        index.len(),
    ))
}

/// `min(8k, 500)`: enough headroom for soft filtering without unbounded
/// scans.
pub fn candidate_count(k: usize) -> usize {
    (k.saturating_mul(CANDIDATE_MULTIPLIER)).min(MAX_CANDIDATES)
}

/// Keep only positions the identifier array can resolve. Out-of-range
/// positions are dropped silently per the index contract.
fn clamp_positions(positions: impl Iterator<Item = usize>, id_count: usize) -> Vec<usize> {
    positions.filter(|&p| p < id_count).collect()
}
