//! Typo-tolerant query matching over free text.

use crate::similarity::similarity;
use crate::tokenize::{normalize, words};

/// Minimum word similarity used when the caller does not pick one.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.7;

/// Does `text` match `query`?
///
/// A blank query matches everything. Otherwise the normalized query is
/// looked up as a substring of the normalized text; failing that, every
/// query word must have some text word with `similarity >= min_similarity`.
pub fn matches(text: &str, query: &str, min_similarity: f64) -> bool {
    if query.trim().is_empty() {
        return true;
    }

    if normalize(text).contains(&normalize(query)) {
        return true;
    }

    let text_words = words(text);
    words(query).iter().all(|query_word| {
        text_words
            .iter()
            .any(|word| similarity(word, query_word) >= min_similarity)
    })
}
