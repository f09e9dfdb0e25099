//! Post-retrieval semantic filtering.
//!
//! Narrows the oversized candidate set using the parsed intent and catalog
//! attributes, in fixed stage order: category, inclusion descriptors,
//! exclusion descriptors, minimum rating. Every stage is soft: a stage that
//! would eliminate every candidate is discarded and the previous set kept,
//! so an over-aggressive intent match can never empty the response on its
//! own.

use std::collections::HashSet;

use crate::catalog::{CatalogStore, Product};
use crate::search::index::ProductIndex;
use crate::search::query::{ItemCategory, SemanticQuery};

/// Category targets for one matched item category.
fn category_target(category: ItemCategory) -> (&'static str, &'static [&'static str]) {
    match category {
        ItemCategory::Dress => ("Apparel", &["Dresses"]),
        ItemCategory::Jacket => ("Apparel", &["Jackets", "Blazers", "Coats"]),
        ItemCategory::Shirt => ("Apparel", &["Shirts", "Tops", "T-shirts"]),
        ItemCategory::Pants => ("Apparel", &["Trousers", "Jeans", "Pants"]),
        ItemCategory::Shoes => ("Footwear", &["Shoes", "Sneakers", "Boots"]),
        // Accessories map to a master category only; with no subcategory
        // targets the category stage does not run for them.
        ItemCategory::Accessories => ("Accessories", &[]),
    }
}

/// Apply the soft filter stages to an ordered candidate-position list.
///
/// Relative order within the surviving set is preserved: stages only
/// drop, never reorder.
pub fn filter_candidates(
    candidates: Vec<usize>,
    query: &SemanticQuery,
    index: &ProductIndex,
    catalog: &CatalogStore,
) -> Vec<usize> {
    if candidates.is_empty() {
        return candidates;
    }

    let lookup = |position: &usize| -> Option<&Product> {
        index.id_at(*position).and_then(|id| catalog.get(id))
    };

    let mut current = candidates;

    // Stage 1: category. Runs only when matched items produced both master
    // and subcategory targets.
    let mut masters: HashSet<&'static str> = HashSet::new();
    let mut subcats: HashSet<&'static str> = HashSet::new();
    for item in &query.items {
        let (master, subs) = category_target(item.category);
        masters.insert(master);
        subcats.extend(subs);
    }
    if !masters.is_empty() && !subcats.is_empty() {
        let survivors: Vec<usize> = current
            .iter()
            .copied()
            .filter(|pos| {
                lookup(pos).is_some_and(|p| matches_category(p, &masters, &subcats))
            })
            .collect();
        current = keep_if_nonempty(current, survivors, "category");
    }

    // Stage 2: inclusion descriptors (materials, patterns, colors).
    let mut wanted_words: Vec<&'static str> = Vec::new();
    wanted_words.extend(&query.wanted.materials);
    wanted_words.extend(&query.wanted.patterns);
    wanted_words.extend(&query.wanted.colors);
    if !wanted_words.is_empty() {
        let survivors: Vec<usize> = current
            .iter()
            .copied()
            .filter(|pos| {
                lookup(pos).is_some_and(|p| {
                    matches_descriptors(p, &wanted_words, &query.wanted.colors)
                })
            })
            .collect();
        current = keep_if_nonempty(current, survivors, "inclusion");
    }

    // Stage 3: exclusion descriptors (colors, materials).
    let mut excluded_words: Vec<&'static str> = Vec::new();
    excluded_words.extend(&query.excluded.colors);
    excluded_words.extend(&query.excluded.materials);
    if !excluded_words.is_empty() {
        let survivors: Vec<usize> = current
            .iter()
            .copied()
            .filter(|pos| {
                lookup(pos).map_or(true, |p| !matches_exclusion(p, &excluded_words))
            })
            .collect();
        current = keep_if_nonempty(current, survivors, "exclusion");
    }

    // Stage 4: minimum rating.
    if let Some(min_rating) = query.min_rating {
        let survivors: Vec<usize> = current
            .iter()
            .copied()
            .filter(|pos| lookup(pos).is_some_and(|p| p.rating_or_zero() >= min_rating))
            .collect();
        current = keep_if_nonempty(current, survivors, "rating");
    }

    current
}

/// Master category membership plus a subcategory test: exact sub-category
/// membership is case-sensitive, the article-type substring test is not.
/// The asymmetry is intentional.
fn matches_category(
    product: &Product,
    masters: &HashSet<&'static str>,
    subcats: &HashSet<&'static str>,
) -> bool {
    if !masters.contains(product.master_category.as_str()) {
        return false;
    }
    if subcats.contains(product.sub_category.as_str()) {
        return true;
    }
    let article = product.article_type.to_lowercase();
    subcats.iter().any(|sub| article.contains(&sub.to_lowercase()))
}

/// Display-name substring match on any wanted word, or base-colour equality
/// with a wanted colour word.
fn matches_descriptors(
    product: &Product,
    wanted_words: &[&'static str],
    wanted_colors: &[&'static str],
) -> bool {
    let name = product.display_name.to_lowercase();
    let colour = product.base_colour.to_lowercase();
    wanted_words.iter().any(|word| name.contains(word))
        || wanted_colors.iter().any(|color| colour == *color)
}

/// True when the product carries an excluded word in its display name or as
/// its base colour.
fn matches_exclusion(product: &Product, excluded_words: &[&'static str]) -> bool {
    let name = product.display_name.to_lowercase();
    let colour = product.base_colour.to_lowercase();
    excluded_words
        .iter()
        .any(|word| name.contains(word) || colour == *word)
}

/// Soft-filter policy: a stage only applies if it leaves survivors.
fn keep_if_nonempty(previous: Vec<usize>, survivors: Vec<usize>, stage: &str) -> Vec<usize> {
    if survivors.is_empty() {
        log::debug!(
            "{} stage would eliminate all {} candidates; keeping previous set",
            stage,
            previous.len()
        );
        previous
    } else {
        log::debug!(
            "{} stage kept {} of {} candidates",
            stage,
            survivors.len(),
            previous.len()
        );
        survivors
    }
}
