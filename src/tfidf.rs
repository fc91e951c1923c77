use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    index::{Document, DocumentIndex},
    tokenize::{normalize, tokenize},
};

/// Results below this cosine similarity are discarded as noise.
const SIMILARITY_FLOOR: f64 = 0.1;

/// A ranked search hit. Ephemeral, produced per query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The answer text of the matched record.
    pub text: String,
    /// Cosine similarity to the query, in `[0, 1]`.
    pub similarity: f64,
    /// The question side of the matched record.
    pub question: String,
    /// Dataset label of the matched record.
    pub source: String,
}

/// Rank documents against a query by TF-IDF cosine similarity.
///
/// Each call recomputes from scratch over the index; reads are pure, so
/// repeated calls with an unmodified index return identical results. Ties
/// in similarity resolve to corpus insertion order.
pub fn search(index: &DocumentIndex, query: &str, top_k: usize) -> Vec<SearchResult> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() || index.is_empty() {
        return Vec::new();
    }

    let query_weights = tfidf_weights(index, &query_tokens);
    if query_weights.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f64)> = index
        .documents()
        .par_iter()
        .enumerate()
        .filter_map(|(pos, doc)| {
            let similarity = document_similarity(index, &query_weights, doc);
            (similarity > SIMILARITY_FLOOR).then_some((pos, similarity))
        })
        .collect();

    // Equal similarities keep ascending corpus position.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(pos, similarity)| {
            let doc = &index.documents()[pos];
            SearchResult {
                text: doc.answer.clone(),
                similarity,
                question: doc.question.clone(),
                source: doc.source.clone(),
            }
        })
        .collect()
}

/// Query-expansion search over six deterministic phrasing variants.
///
/// Runs [`search`] for the query itself, its lowercased and
/// punctuation-stripped forms, and three intent prefixes, then merges hits
/// by answer text keeping the maximum similarity seen across variants.
/// Compensates for the literal cosine metric's sensitivity to phrasing.
/// Cost is O(variants x corpus x vocabulary); fine for corpora up to a few
/// thousand records, beyond that an inverted index is the right tool.
pub fn enhanced_search(index: &DocumentIndex, query: &str, top_k: usize) -> Vec<SearchResult> {
    let variants = [
        query.to_string(),
        query.to_lowercase(),
        normalize(query),
        format!("help with {query}"),
        format!("how to {query}"),
        format!("issue with {query}"),
    ];

    let mut merged: Vec<SearchResult> = Vec::new();
    let mut by_text: HashMap<String, usize> = HashMap::new();

    for variant in &variants {
        for hit in search(index, variant, top_k) {
            match by_text.get(&hit.text) {
                Some(&pos) => {
                    if hit.similarity > merged[pos].similarity {
                        merged[pos].similarity = hit.similarity;
                    }
                }
                None => {
                    by_text.insert(hit.text.clone(), merged.len());
                    merged.push(hit);
                }
            }
        }
    }

    merged.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(top_k);
    merged
}

/// TF-IDF weights for a token sequence: tf = occurrences / length,
/// weight = tf x idf. Out-of-vocabulary terms get weight 0 and are omitted.
///
/// Ordered map so the floating-point sums below run in a fixed term order
/// and repeated searches return bit-identical scores.
fn tfidf_weights(index: &DocumentIndex, tokens: &[String]) -> BTreeMap<String, f64> {
    let len = tokens.len() as f64;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(term, count)| {
            let idf = index.idf(term);
            (idf != 0.0).then(|| (term.to_string(), (count as f64 / len) * idf))
        })
        .collect()
}

/// Cosine similarity between the query vector and one document.
///
/// Documents sharing no weighted terms with the query score 0 without
/// computing norms. Zero-norm vectors also score 0.
fn document_similarity(
    index: &DocumentIndex,
    query_weights: &BTreeMap<String, f64>,
    doc: &Document,
) -> f64 {
    let doc_weights = tfidf_weights(index, &doc.tokens);

    let dot: f64 = query_weights
        .iter()
        .filter_map(|(term, qw)| doc_weights.get(term).map(|dw| qw * dw))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }

    let query_norm = norm(query_weights);
    let doc_norm = norm(&doc_weights);
    if query_norm == 0.0 || doc_norm == 0.0 {
        return 0.0;
    }

    (dot / (query_norm * doc_norm)).clamp(0.0, 1.0)
}

fn norm(weights: &BTreeMap<String, f64>) -> f64 {
    weights.values().map(|w| w * w).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetRecord;

    fn build_index(records: &[(&str, &str)]) -> DocumentIndex {
        let records: Vec<DatasetRecord> = records
            .iter()
            .map(|(input, output)| DatasetRecord {
                input: input.to_string(),
                output: output.to_string(),
                source: "kb".to_string(),
            })
            .collect();
        let mut index = DocumentIndex::new();
        index.add_records(&records);
        index
    }

    fn support_index() -> DocumentIndex {
        build_index(&[
            ("password reset help", "Go to settings and reset your password."),
            ("billing question", "Contact billing for invoice help."),
            ("email not arriving", "Check your spam folder and filters."),
        ])
    }

    #[test]
    fn ranks_relevant_document_first() {
        let index = support_index();
        let results = search(&index, "how do I reset my password", 3);

        assert!(!results.is_empty());
        assert!(results[0].text.contains("reset your password"));
        assert!(results[0].similarity > SIMILARITY_FLOOR);
    }

    #[test]
    fn similarities_stay_in_unit_interval() {
        let index = support_index();
        for query in ["password reset help", "billing", "spam email filters", "reset"] {
            for hit in search(&index, query, 10) {
                assert!(hit.similarity >= 0.0 && hit.similarity <= 1.0, "query {query}");
            }
        }
    }

    #[test]
    fn scores_are_descending() {
        let index = support_index();
        let results = search(&index, "help with password and billing", 10);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn unrelated_query_returns_nothing() {
        let index = support_index();
        assert!(search(&index, "quantum chromodynamics lattice", 5).is_empty());
    }

    #[test]
    fn empty_query_and_empty_index() {
        let index = support_index();
        assert!(search(&index, "", 5).is_empty());
        assert!(search(&index, "a b", 5).is_empty());

        let empty = DocumentIndex::new();
        assert!(search(&empty, "password", 5).is_empty());
    }

    #[test]
    fn repeated_search_is_idempotent() {
        let index = support_index();
        let first = search(&index, "password reset", 5);
        let second = search(&index, "password reset", 5);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.similarity, b.similarity);
        }
    }

    #[test]
    fn identical_token_documents_score_identically() {
        // Two documents with the same token multiset must get the same
        // similarity for any query, regardless of their position.
        let index = build_index(&[
            ("reset password quickly", "alpha"),
            ("quickly password reset", "beta"),
            ("billing invoice", "gamma"),
        ]);
        let results = search(&index, "password reset", 10);

        let alpha = results.iter().find(|r| r.text == "alpha").unwrap();
        let beta = results.iter().find(|r| r.text == "beta").unwrap();
        assert_eq!(alpha.similarity, beta.similarity);
    }

    #[test]
    fn ties_break_by_corpus_order() {
        let index = build_index(&[
            ("reset password quickly", "first inserted"),
            ("quickly password reset", "second inserted"),
        ]);
        let results = search(&index, "password reset quickly", 10);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "first inserted");
        assert_eq!(results[1].text, "second inserted");
    }

    #[test]
    fn respects_top_k() {
        let index = build_index(&[
            ("password reset", "one"),
            ("password reset", "two"),
            ("password reset", "three"),
        ]);
        assert_eq!(search(&index, "password reset", 2).len(), 2);
    }

    #[test]
    fn enhanced_search_keeps_maximum_similarity() {
        let index = support_index();
        let plain = search(&index, "reset my password", 3);
        let enhanced = enhanced_search(&index, "reset my password", 3);

        assert!(!enhanced.is_empty());
        let best_plain = plain.first().map(|r| r.similarity).unwrap_or(0.0);
        // The identity variant is among those merged, so the best enhanced
        // score can never be below the plain score for the same text.
        assert!(enhanced[0].similarity >= best_plain);
    }

    #[test]
    fn enhanced_search_deduplicates_by_text() {
        let index = support_index();
        let results = enhanced_search(&index, "password reset", 10);
        let mut texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        texts.sort_unstable();
        texts.dedup();
        assert_eq!(texts.len(), results.len());
    }
}
