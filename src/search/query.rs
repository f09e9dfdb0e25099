//! Query parsing: free text to structured semantic intent.
//!
//! A query like "denim jacket not red, 4+ stars" becomes a [`SemanticQuery`]
//! with one matched item (jacket), a wanted material (denim), an excluded
//! colour (red) and a minimum rating of 4.0. The filter and patch stages key
//! off this structure; raw similarity search keys off the full text.
//!
//! Intent categories are closed enums rather than string-keyed maps so the
//! filter stage gets compile-time coverage of every category.

use once_cell::sync::Lazy;
use regex::Regex;

/// Item categories the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Dress,
    Jacket,
    Shirt,
    Pants,
    Shoes,
    Accessories,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 6] = [
        ItemCategory::Dress,
        ItemCategory::Jacket,
        ItemCategory::Shirt,
        ItemCategory::Pants,
        ItemCategory::Shoes,
        ItemCategory::Accessories,
    ];

    /// Synonyms tested in order; the first substring hit wins for the
    /// category.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            ItemCategory::Dress => &["dress", "gown", "frock"],
            ItemCategory::Jacket => &["jacket", "coat", "blazer"],
            ItemCategory::Shirt => &["shirt", "top", "tee", "t-shirt", "tshirt", "blouse"],
            ItemCategory::Pants => &["pant", "trouser", "jeans", "leggings", "shorts"],
            ItemCategory::Shoes => &["shoe", "sneaker", "boot", "heel", "footwear"],
            ItemCategory::Accessories => {
                &["watch", "bag", "purse", "handbag", "backpack", "wallet"]
            }
        }
    }
}

/// Descriptor categories the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorCategory {
    Colors,
    Patterns,
    Materials,
    Styles,
}

impl DescriptorCategory {
    pub const ALL: [DescriptorCategory; 4] = [
        DescriptorCategory::Colors,
        DescriptorCategory::Patterns,
        DescriptorCategory::Materials,
        DescriptorCategory::Styles,
    ];

    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            DescriptorCategory::Colors => &[
                "red", "blue", "green", "yellow", "black", "white", "pink", "purple", "brown",
                "orange", "beige",
            ],
            DescriptorCategory::Patterns => {
                &["floral", "striped", "plaid", "checkered", "dotted", "printed"]
            }
            DescriptorCategory::Materials => {
                &["denim", "leather", "cotton", "silk", "wool", "polyester", "linen"]
            }
            DescriptorCategory::Styles => &[
                "casual", "formal", "elegant", "vintage", "modern", "sporty", "classic",
            ],
        }
    }
}

/// An item category matched in the query text, with the literal synonym
/// that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMatch {
    pub category: ItemCategory,
    pub word: &'static str,
}

/// One word list per descriptor category, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    pub colors: Vec<&'static str>,
    pub patterns: Vec<&'static str>,
    pub materials: Vec<&'static str>,
    pub styles: Vec<&'static str>,
}

impl DescriptorSet {
    pub fn get(&self, category: DescriptorCategory) -> &[&'static str] {
        match category {
            DescriptorCategory::Colors => &self.colors,
            DescriptorCategory::Patterns => &self.patterns,
            DescriptorCategory::Materials => &self.materials,
            DescriptorCategory::Styles => &self.styles,
        }
    }

    fn slot_mut(&mut self, category: DescriptorCategory) -> &mut Vec<&'static str> {
        match category {
            DescriptorCategory::Colors => &mut self.colors,
            DescriptorCategory::Patterns => &mut self.patterns,
            DescriptorCategory::Materials => &mut self.materials,
            DescriptorCategory::Styles => &mut self.styles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.patterns.is_empty()
            && self.materials.is_empty()
            && self.styles.is_empty()
    }

    /// All words, category order then vocabulary order.
    pub fn words(&self) -> impl Iterator<Item = &'static str> + '_ {
        DescriptorCategory::ALL
            .into_iter()
            .flat_map(|cat| self.get(cat).iter().copied())
    }
}

/// Structured semantic intent extracted from free text.
///
/// Parsing is total: any text yields a query, and an all-empty query means
/// "no structured intent"; the pipeline then relies on raw similarity only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticQuery {
    /// Matched item categories, at most one entry per category.
    pub items: Vec<ItemMatch>,
    /// Descriptors the user asked for.
    pub wanted: DescriptorSet,
    /// Descriptors the user negated ("not red", "no leather", ...).
    pub excluded: DescriptorSet,
    /// Minimum rating extracted from phrases like "4 stars" or "good
    /// reviews". Does not count as structured intent.
    pub min_rating: Option<f32>,
}

/// Negation templates, tested as literal substrings. A hit records the word
/// as excluded and short-circuits inclusion, so a word never lands in both
/// sets for one category.
const NEGATION_TEMPLATES: [&str; 4] = ["not {}", "no {}", "except {}", "but not {}"];

static STARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d(?:\.\d)?)\s*stars?").expect("stars pattern"));
// No trailing boundary: '+' followed by space or end of text must match too.
static PLUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d)\+").expect("plus pattern"));

impl SemanticQuery {
    /// Parse free text into structured intent.
    pub fn parse(text: &str) -> SemanticQuery {
        let lower = text.to_lowercase();
        let mut query = SemanticQuery::default();

        if lower.trim().is_empty() {
            return query;
        }

        for category in ItemCategory::ALL {
            for &word in category.synonyms() {
                if lower.contains(word) {
                    query.items.push(ItemMatch { category, word });
                    break;
                }
            }
        }

        for category in DescriptorCategory::ALL {
            for &word in category.vocabulary() {
                if is_negated(&lower, word) {
                    query.excluded.slot_mut(category).push(word);
                    continue;
                }
                if lower.contains(word) {
                    query.wanted.slot_mut(category).push(word);
                }
            }
        }

        query.min_rating = min_rating(&lower);

        query
    }

    /// True when any of items/wanted/excluded is non-empty.
    pub fn has_intent(&self) -> bool {
        !self.items.is_empty() || !self.wanted.is_empty() || !self.excluded.is_empty()
    }

    /// The matched word for a category, if any.
    pub fn item_word(&self, category: ItemCategory) -> Option<&'static str> {
        self.items
            .iter()
            .find(|m| m.category == category)
            .map(|m| m.word)
    }
}

fn is_negated(lower_text: &str, word: &str) -> bool {
    NEGATION_TEMPLATES
        .iter()
        .any(|template| lower_text.contains(&template.replace("{}", word)))
}

/// Extract a minimum-rating requirement from (lowercased) query text.
///
/// "good reviews"/"well rated" mean 4.0; "4 stars"/"4.5 stars" mean the
/// stated value; "4+" means 4.0.
pub fn min_rating(lower_text: &str) -> Option<f32> {
    if lower_text.contains("good reviews") || lower_text.contains("well rated") {
        return Some(4.0);
    }
    if let Some(caps) = STARS_RE.captures(lower_text) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = PLUS_RE.captures(lower_text) {
        return caps[1].parse().ok();
    }
    None
}
