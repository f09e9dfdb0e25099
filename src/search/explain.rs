//! Per-result match explanations.
//!
//! Turns the parsed intent and a product's attributes into the short `why`
//! string shown next to each result.

use crate::catalog::Product;
use crate::search::query::SemanticQuery;

/// Explanation used when no structured intent was parsed.
pub const GENERIC_EXPLANATION: &str = "Matched based on your search criteria";

/// Build the explanation for one product.
///
/// Reasons are collected in order: item words found in the article type or
/// display name, then descriptor words equal to the base colour or found in
/// the display name (deduplicated). With no reasons the explanation names
/// the product's colour and article type instead.
pub fn explain(product: &Product, query: &SemanticQuery) -> String {
    if !query.has_intent() {
        return GENERIC_EXPLANATION.to_string();
    }

    let article = product.article_type.to_lowercase();
    let name = product.display_name.to_lowercase();
    let colour = product.base_colour.to_lowercase();

    let mut reasons: Vec<&str> = Vec::new();

    for item in &query.items {
        if article.contains(item.word) || name.contains(item.word) {
            reasons.push(item.word);
        }
    }

    for word in query.wanted.words() {
        if (word == colour || name.contains(word)) && !reasons.contains(&word) {
            reasons.push(word);
        }
    }

    if reasons.is_empty() {
        format!("Matched: {} {} similar to your query", colour, article)
    } else {
        format!("Matched: {} {}", reasons.join(" "), article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, article: &str, colour: &str) -> Product {
        Product {
            id: 1,
            display_name: name.to_string(),
            master_category: "Apparel".to_string(),
            sub_category: "Jackets".to_string(),
            article_type: article.to_string(),
            base_colour: colour.to_string(),
            rating: None,
            num_reviews: None,
            price: None,
            discount_percent: None,
            image_url: None,
            image_filename: None,
        }
    }

    #[test]
    fn test_no_intent_generic() {
        let query = SemanticQuery::default();
        let product = product("Red Bomber Jacket", "Jackets", "Red");
        assert_eq!(explain(&product, &query), GENERIC_EXPLANATION);
    }

    #[test]
    fn test_item_and_descriptor_reasons() {
        let query = SemanticQuery::parse("red jacket");
        let product = product("Red Bomber Jacket", "Jackets", "Red");
        assert_eq!(explain(&product, &query), "Matched: jacket red jackets");
    }

    #[test]
    fn test_descriptor_from_base_colour_only() {
        // "red" is the base colour but not in the display name.
        let query = SemanticQuery::parse("red jacket");
        let product = product("Bomber Classic", "Jackets", "Red");
        assert_eq!(explain(&product, &query), "Matched: jacket red jackets");
    }

    #[test]
    fn test_no_reasons_falls_back_to_colour_and_article() {
        // Intent exists but nothing matches this product's fields.
        let query = SemanticQuery::parse("silk gown");
        let product = product("Bomber Classic", "Jackets", "Blue");
        assert_eq!(
            explain(&product, &query),
            "Matched: blue jackets similar to your query"
        );
    }

    #[test]
    fn test_reasons_deduplicated() {
        // "denim" appears in the name; it must appear once even though the
        // word matches via multiple routes.
        let query = SemanticQuery::parse("denim denim jacket");
        let product = product("Blue Denim Jacket", "Jackets", "Blue");
        let explanation = explain(&product, &query);
        assert_eq!(explanation.matches("denim").count(), 1);
    }
}
