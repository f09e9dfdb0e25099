//! Statistical keyword extraction for query logging.
//!
//! RAKE-style scoring: candidate phrases are maximal runs of non-stopword
//! tokens between punctuation breaks; each word is scored by co-occurrence
//! degree over frequency, and a phrase scores the sum of its word scores.
//! The top phrases, unioned with the parser's matched words, form a flat
//! keyword set used only for logging, never for filtering.

use std::collections::{BTreeSet, HashMap};

use crate::search::query::SemanticQuery;

/// Maximum number of ranked phrases to keep.
pub const MAX_KEYWORDS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "in", "on", "at", "to",
    "for", "of", "with", "by", "from", "as", "and", "or", "but", "not", "no", "so", "if", "then",
    "i", "me", "my", "we", "our", "you", "your", "it", "its", "this", "that", "these", "those",
    "have", "has", "had", "do", "does", "did", "want", "like", "some", "any",
];

/// Extract up to [`MAX_KEYWORDS`] top-ranked phrases from raw text,
/// case-folded, in descending score order. Ties break lexicographically so
/// the output is deterministic.
pub fn rank_phrases(text: &str) -> Vec<String> {
    let phrases = candidate_phrases(text);
    if phrases.is_empty() {
        return vec![];
    }

    // Word scores: degree (summed phrase length over phrases containing the
    // word) over frequency.
    let mut freq: HashMap<&str, usize> = HashMap::new();
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for phrase in &phrases {
        for word in phrase {
            *freq.entry(word.as_str()).or_insert(0) += 1;
            *degree.entry(word.as_str()).or_insert(0) += phrase.len();
        }
    }

    let mut scored: HashMap<String, f32> = HashMap::new();
    for phrase in &phrases {
        let score: f32 = phrase
            .iter()
            .map(|word| degree[word.as_str()] as f32 / freq[word.as_str()] as f32)
            .sum();
        let joined = phrase.join(" ");
        scored.entry(joined).or_insert(score);
    }

    let mut ranked: Vec<(String, f32)> = scored.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(phrase, _)| phrase)
        .collect()
}

/// Ranked phrases unioned with every matched item and descriptor word.
pub fn keyword_set(text: &str, query: &SemanticQuery) -> BTreeSet<String> {
    let mut keywords: BTreeSet<String> = rank_phrases(text).into_iter().collect();

    for item in &query.items {
        keywords.insert(item.word.to_string());
    }
    for word in query.wanted.words() {
        keywords.insert(word.to_string());
    }

    keywords
}

/// Split text into candidate phrases: punctuation ends a phrase, stopwords
/// and non-alphabetic tokens break one.
fn candidate_phrases(text: &str) -> Vec<Vec<String>> {
    let lower = text.to_lowercase();

    let mut phrases: Vec<Vec<String>> = Vec::new();
    for fragment in lower.split(|c: char| ".,;:!?()[]\"".contains(c)) {
        let mut current: Vec<String> = Vec::new();
        for token in fragment.split_whitespace() {
            let word: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            let breaks = word.is_empty()
                || !word.chars().any(|c| c.is_alphabetic())
                || STOP_WORDS.contains(&word.as_str());
            if breaks {
                if !current.is_empty() {
                    phrases.push(std::mem::take(&mut current));
                }
                continue;
            }
            current.push(word);
        }
        if !current.is_empty() {
            phrases.push(current);
        }
    }

    phrases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert!(rank_phrases("").is_empty());
        assert!(rank_phrases("   ").is_empty());
    }

    #[test]
    fn test_stopwords_break_phrases() {
        let phrases = candidate_phrases("red dress with golden buttons");
        assert_eq!(
            phrases,
            vec![
                vec!["red".to_string(), "dress".to_string()],
                vec!["golden".to_string(), "buttons".to_string()],
            ]
        );
    }

    #[test]
    fn test_punctuation_breaks_phrases() {
        let phrases = candidate_phrases("denim jacket, blue buttons");
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[0], vec!["denim", "jacket"]);
        assert_eq!(phrases[1], vec!["blue", "buttons"]);
    }

    #[test]
    fn test_longer_cooccurring_phrase_ranks_first() {
        // "light blue denim jacket" words gain degree from the long run;
        // the lone "shoes" scores 1.0.
        let ranked = rank_phrases("light blue denim jacket and shoes");
        assert_eq!(ranked[0], "light blue denim jacket");
        assert!(ranked.contains(&"shoes".to_string()));
    }

    #[test]
    fn test_at_most_five_phrases() {
        let ranked =
            rank_phrases("red dress, blue coat, green hat, yellow scarf, black boots, white bag");
        assert_eq!(ranked.len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_case_folded() {
        let ranked = rank_phrases("Red Dress");
        assert_eq!(ranked, vec!["red dress"]);
    }

    #[test]
    fn test_deterministic_tie_order() {
        // Two independent two-word phrases tie; lexicographic order decides.
        let a = rank_phrases("green hat and purple scarf");
        let b = rank_phrases("green hat and purple scarf");
        assert_eq!(a, b);
        assert_eq!(a[0], "green hat");
    }

    #[test]
    fn test_keyword_set_unions_matches() {
        let query = SemanticQuery::parse("denim jacket not red");
        let keywords = keyword_set("denim jacket not red", &query);
        assert!(keywords.contains("jacket"));
        assert!(keywords.contains("denim"));
        assert!(keywords.contains("denim jacket"));
    }
}
