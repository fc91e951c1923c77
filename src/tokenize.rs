/// Minimum token length kept by the tokenizer. Shorter tokens carry almost
/// no discriminative weight in a support corpus ("a", "to", "is").
const MIN_TOKEN_LEN: usize = 3;

/// Tokenize text for indexing and querying.
///
/// Lowercases, replaces every non-word character with a space, splits on
/// whitespace, and drops tokens shorter than three characters. Both the
/// index and the searcher must use this exact rule so that query terms and
/// document terms live in the same space.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Normalize text for substring and word-set comparison.
///
/// Lowercases, trims, and strips punctuation while keeping word characters
/// and spaces. Unlike [`tokenize`] this preserves short words, since the
/// keyword matcher compares whole phrases.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
