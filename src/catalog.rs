//! Product catalog store.
//!
//! Loads the product catalog from a JSONL file (one product per line) and
//! serves immutable lookups by product id for the search pipeline. Also
//! exposes article-type enumeration and a normalized category-browse table
//! for the web surface.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One catalog browse target: a master category plus the subcategory names
/// that count as a match for it.
pub struct CategoryTarget {
    pub master_category: &'static str,
    pub sub_categories: &'static [&'static str],
}

/// Browse aliases for the web surface, keyed by normalized category name.
pub const CATEGORY_MAPPING: &[(&str, CategoryTarget)] = &[
    (
        "sneakers",
        CategoryTarget {
            master_category: "Footwear",
            sub_categories: &["Sports Shoes", "Casual Shoes", "Sneakers"],
        },
    ),
    (
        "tshirts",
        CategoryTarget {
            master_category: "Apparel",
            sub_categories: &["Tshirts", "T-Shirts", "Tops"],
        },
    ),
    (
        "bags",
        CategoryTarget {
            master_category: "Accessories",
            sub_categories: &["Bags", "Handbags", "Backpacks"],
        },
    ),
    (
        "pants",
        CategoryTarget {
            master_category: "Apparel",
            sub_categories: &["Pants", "Trousers", "Jeans"],
        },
    ),
    (
        "dresses",
        CategoryTarget {
            master_category: "Apparel",
            sub_categories: &["Dresses"],
        },
    ),
    (
        "shirts",
        CategoryTarget {
            master_category: "Apparel",
            sub_categories: &["Shirts"],
        },
    ),
    (
        "jackets",
        CategoryTarget {
            master_category: "Apparel",
            sub_categories: &["Jackets"],
        },
    ),
];

/// A single catalog product. Field names mirror the catalog JSONL schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,

    #[serde(rename = "productDisplayName", default)]
    pub display_name: String,

    #[serde(rename = "masterCategory", default)]
    pub master_category: String,

    #[serde(rename = "subCategory", default)]
    pub sub_category: String,

    #[serde(rename = "articleType", default)]
    pub article_type: String,

    #[serde(rename = "baseColour", default)]
    pub base_colour: String,

    #[serde(default)]
    pub rating: Option<f32>,

    #[serde(rename = "numReviews", default)]
    pub num_reviews: Option<u32>,

    #[serde(default)]
    pub price: Option<f32>,

    #[serde(rename = "discountPercent", default)]
    pub discount_percent: Option<f32>,

    #[serde(rename = "image_url", default)]
    pub image_url: Option<String>,

    #[serde(rename = "image_filename", default)]
    pub image_filename: Option<String>,
}

impl Product {
    /// Rating with the documented default of 0 when absent.
    pub fn rating_or_zero(&self) -> f32 {
        self.rating.unwrap_or(0.0)
    }

    /// Review count with the documented default of 0 when absent.
    pub fn num_reviews_or_zero(&self) -> u32 {
        self.num_reviews.unwrap_or(0)
    }

    /// Image reference, preferring the URL over the local filename.
    pub fn image_ref(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or(self.image_filename.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog is empty: {0}")]
    Empty(String),
}

/// Read-only catalog, loaded once at startup.
pub struct CatalogStore {
    products: HashMap<u64, Product>,
}

impl CatalogStore {
    /// Load the catalog from a JSONL file.
    ///
    /// Malformed lines are logged and skipped so one bad record cannot take
    /// the whole catalog down. An empty or fully-malformed file is an error:
    /// there is nothing to search.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;

        let mut products = HashMap::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Product>(line) {
                Ok(product) => {
                    products.insert(product.id, product);
                }
                Err(err) => {
                    log::warn!(
                        "skipping malformed catalog line {}: {}",
                        line_no + 1,
                        err
                    );
                }
            }
        }

        if products.is_empty() {
            return Err(CatalogError::Empty(path.display().to_string()));
        }

        log::info!("loaded {} catalog products", products.len());
        Ok(Self { products })
    }

    /// Build a store from in-memory products.
    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn get(&self, id: u64) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All distinct article types, sorted.
    pub fn article_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .products
            .values()
            .filter(|p| !p.article_type.is_empty())
            .map(|p| p.article_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Products matching a browse category, via the alias table first and
    /// exact normalized article type second.
    pub fn browse(&self, category: &str) -> Vec<&Product> {
        let norm = normalize_category(category);

        let mut matches: Vec<&Product> = Vec::new();
        if let Some((_, target)) = CATEGORY_MAPPING.iter().find(|(name, _)| *name == norm) {
            matches = self
                .products
                .values()
                .filter(|p| {
                    p.master_category == target.master_category
                        && target.sub_categories.iter().any(|sub| {
                            normalize_category(&p.article_type)
                                .contains(&normalize_category(sub))
                        })
                })
                .collect();
        }

        if matches.is_empty() {
            matches = self
                .products
                .values()
                .filter(|p| normalize_category(&p.article_type) == norm)
                .collect();
        }

        matches.sort_by_key(|p| p.id);
        matches
    }

    /// Browse target for a normalized category name, if it has an alias.
    pub fn category_target(category: &str) -> Option<&'static CategoryTarget> {
        let norm = normalize_category(category);
        CATEGORY_MAPPING
            .iter()
            .find(|(name, _)| *name == norm)
            .map(|(_, target)| target)
    }
}

/// Normalize a category name for comparison: trim, lowercase, strip
/// spaces/hyphens/underscores.
pub fn normalize_category(category: &str) -> String {
    category
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect()
}
