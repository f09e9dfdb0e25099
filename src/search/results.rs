//! Final result assembly.
//!
//! Joins filtered candidate positions with catalog records into the ranked
//! response list. Candidates whose identifier the catalog does not know are
//! skipped; survivors are numbered from 1 in output order.

use serde::Serialize;

use crate::catalog::CatalogStore;
use crate::search::explain::explain;
use crate::search::index::ProductIndex;
use crate::search::query::SemanticQuery;

/// One ranked search result, serialized camelCase for the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: u64,
    pub rank: usize,
    pub name: String,
    pub image: Option<String>,
    pub rating: f32,
    pub num_reviews: u32,
    pub price: Option<f32>,
    pub discount: Option<f32>,
    pub why: String,
    /// Base64 JPEG preview of the located patch; present only for
    /// image-driven queries.
    pub patch: Option<String>,
}

/// Assemble the response from candidate positions already capped to the
/// requested count.
pub fn assemble(
    positions: &[usize],
    index: &ProductIndex,
    catalog: &CatalogStore,
    query: &SemanticQuery,
    patch_preview: Option<&str>,
) -> Vec<SearchResult> {
    let mut results = Vec::with_capacity(positions.len());

    for &position in positions {
        let Some(id) = index.id_at(position) else {
            continue;
        };
        let Some(product) = catalog.get(id) else {
            log::debug!("candidate id {} missing from catalog; skipping", id);
            continue;
        };

        results.push(SearchResult {
            id,
            rank: results.len() + 1,
            name: product.display_name.clone(),
            image: product.image_ref().map(|s| s.to_string()),
            rating: product.rating_or_zero(),
            num_reviews: product.num_reviews_or_zero(),
            price: product.price,
            discount: product.discount_percent,
            why: explain(product, query),
            patch: patch_preview.map(|s| s.to_string()),
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;

    fn product(id: u64, name: &str) -> Product {
        Product {
            id,
            display_name: name.to_string(),
            master_category: "Apparel".to_string(),
            sub_category: "Jackets".to_string(),
            article_type: "Jackets".to_string(),
            base_colour: "Blue".to_string(),
            rating: Some(4.1),
            num_reviews: Some(7),
            price: Some(49.0),
            discount_percent: None,
            image_url: Some(format!("http://img/{id}.jpg")),
            image_filename: None,
        }
    }

    fn fixture() -> (ProductIndex, CatalogStore) {
        let mut index = ProductIndex::new(2);
        index.push(10, vec![1.0, 0.0]).unwrap();
        index.push(999, vec![0.0, 1.0]).unwrap(); // not in catalog
        index.push(30, vec![0.0, 1.0]).unwrap();
        let catalog =
            CatalogStore::from_products(vec![product(10, "Alpha Jacket"), product(30, "Gamma Jacket")]);
        (index, catalog)
    }

    #[test]
    fn test_ranks_are_one_based_and_contiguous() {
        let (index, catalog) = fixture();
        let query = SemanticQuery::default();

        // Position 1 resolves to an unknown id and is skipped; ranks stay
        // contiguous.
        let results = assemble(&[0, 1, 2], &index, &catalog, &query, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 10);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].id, 30);
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn test_numeric_defaults() {
        let mut bare = product(10, "Bare");
        bare.rating = None;
        bare.num_reviews = None;
        bare.price = None;

        let mut index = ProductIndex::new(2);
        index.push(10, vec![1.0, 0.0]).unwrap();
        let catalog = CatalogStore::from_products(vec![bare]);

        let results = assemble(&[0], &index, &catalog, &SemanticQuery::default(), None);
        assert_eq!(results[0].rating, 0.0);
        assert_eq!(results[0].num_reviews, 0);
        assert!(results[0].price.is_none());
        assert!(results[0].discount.is_none());
    }

    #[test]
    fn test_patch_preview_attached_to_every_result() {
        let (index, catalog) = fixture();
        let results = assemble(
            &[0, 2],
            &index,
            &catalog,
            &SemanticQuery::default(),
            Some("data:image/jpeg;base64,xyz"),
        );
        assert!(results.iter().all(|r| r.patch.as_deref()
            == Some("data:image/jpeg;base64,xyz")));
    }

    #[test]
    fn test_serializes_camel_case() {
        let (index, catalog) = fixture();
        let results = assemble(&[0], &index, &catalog, &SemanticQuery::default(), None);
        let json = serde_json::to_value(&results[0]).unwrap();
        assert!(json.get("numReviews").is_some());
        assert!(json.get("num_reviews").is_none());
        assert_eq!(json["rank"], 1);
    }
}
