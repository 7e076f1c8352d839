//! Text normalization: lowercase, keep only letters and digits.

/// Lowercase `text` and drop every character that is not a letter or digit.
///
/// Whitespace is dropped too, so `"Hello, World!"` becomes `"helloworld"`.
pub fn normalize(text: &str) -> String {
    // Lowercase first: some lowercase mappings expand into combining marks.
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Split text into normalized words: by whitespace, normalize each, skip empties.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect()
}
