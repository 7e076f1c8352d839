//! Normalized Levenshtein similarity between two strings.

/// Edit distance between `longer` and `shorter` with a single row of
/// `shorter.len() + 1` costs.
fn levenshtein(longer: &[char], shorter: &[char]) -> usize {
    let mut costs: Vec<usize> = (0..=shorter.len()).collect();
    for (i, &lc) in longer.iter().enumerate() {
        // costs[j] still holds the previous row; `diagonal` is prev[j - 1].
        let mut diagonal = costs[0];
        costs[0] = i + 1;
        for (j, &sc) in shorter.iter().enumerate() {
            let above = costs[j + 1];
            let value = if lc == sc {
                diagonal
            } else {
                diagonal.min(above).min(costs[j]) + 1
            };
            diagonal = above;
            costs[j + 1] = value;
        }
    }
    costs[shorter.len()]
}

/// Similarity in `[0, 1]`: `(len(longer) - distance) / len(longer)`.
///
/// Lengths are counted in chars. Two empty strings score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (longer, shorter) = if b.len() > a.len() { (&b, &a) } else { (&a, &b) };

    if longer.is_empty() {
        return 1.0;
    }

    let distance = levenshtein(longer, shorter);
    (longer.len() - distance) as f64 / longer.len() as f64
}
