use std::collections::{HashMap, HashSet};

use crate::{dataset::DatasetRecord, tokenize::tokenize};

/// A tokenized corpus entry. Built once per [`DatasetRecord`] at load time
/// and owned exclusively by the index.
#[derive(Debug, Clone)]
pub struct Document {
    /// Tokens from the concatenated question and answer text, in order.
    pub tokens: Vec<String>,
    /// The question this document answers.
    pub question: String,
    /// The answer text returned to users.
    pub answer: String,
    /// Label of the dataset this record came from.
    pub source: String,
}

/// In-memory document index with vocabulary and IDF weights.
///
/// Documents are stored in corpus order; that order participates in
/// tie-breaking during search and must be preserved.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    documents: Vec<Document>,
    vocabulary: HashSet<String>,
    idf: HashMap<String, f64>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize and append a batch of records, then recompute IDF weights.
    ///
    /// The recomputation is full and non-incremental: every call rebuilds
    /// document frequencies over the whole accumulated corpus, so IDF
    /// weights stay consistent across batches at the cost of rebuild time
    /// growing with corpus size. Not intended for high-frequency calls.
    /// Identical records are not deduplicated.
    pub fn add_records(&mut self, records: &[DatasetRecord]) {
        for record in records {
            let text = format!("{} {}", record.input, record.output);
            let tokens = tokenize(&text);
            self.vocabulary.extend(tokens.iter().cloned());
            self.documents.push(Document {
                tokens,
                question: record.input.clone(),
                answer: record.output.clone(),
                source: record.source.clone(),
            });
        }
        self.recompute_idf();
    }

    /// Recompute `ln(total_docs / df(term))` for every vocabulary term.
    ///
    /// Document frequency counts documents whose distinct token set
    /// contains the term, so it is independent of token repetition and of
    /// document ordering within a batch.
    fn recompute_idf(&mut self) {
        let total = self.documents.len();
        if total == 0 {
            self.idf.clear();
            return;
        }

        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in &self.documents {
            let distinct: HashSet<&str> = doc.tokens.iter().map(String::as_str).collect();
            for term in distinct {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        self.idf = df
            .into_iter()
            .map(|(term, count)| (term.to_string(), (total as f64 / count as f64).ln()))
            .collect();
    }

    /// IDF weight for a term, or 0.0 for out-of-vocabulary terms.
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(input: &str, output: &str) -> DatasetRecord {
        DatasetRecord {
            input: input.to_string(),
            output: output.to_string(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn add_records_preserves_corpus_order() {
        let mut index = DocumentIndex::new();
        index.add_records(&[
            record("first question", "first answer"),
            record("second question", "second answer"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.documents()[0].question, "first question");
        assert_eq!(index.documents()[1].question, "second question");
    }

    #[test]
    fn tokens_cover_input_and_output() {
        let mut index = DocumentIndex::new();
        index.add_records(&[record("password reset", "Go to settings.")]);

        let tokens = &index.documents()[0].tokens;
        assert!(tokens.contains(&"password".to_string()));
        assert!(tokens.contains(&"settings".to_string()));
    }

    #[test]
    fn idf_discounts_common_terms() {
        let mut index = DocumentIndex::new();
        index.add_records(&[
            record("account login help", "Try resetting."),
            record("account billing help", "Contact billing."),
        ]);

        // "account" appears in both documents: idf = ln(2/2) = 0.
        assert_eq!(index.idf("account"), 0.0);
        // "login" appears in one of two: idf = ln(2/1).
        assert!((index.idf("login") - 2.0_f64.ln()).abs() < 1e-12);
        // Out-of-vocabulary terms weigh nothing.
        assert_eq!(index.idf("zebra"), 0.0);
    }

    #[test]
    fn idf_counts_distinct_token_sets() {
        let mut index = DocumentIndex::new();
        // "password" repeated within one document must count once for df.
        index.add_records(&[
            record("password password password", "reset your password"),
            record("billing invoice", "contact billing"),
        ]);
        assert!((index.idf("password") - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn idf_is_order_invariant_within_a_batch() {
        let a = record("reset password now", "Use the reset link.");
        let b = record("billing invoice question", "Contact billing.");

        let mut forward = DocumentIndex::new();
        forward.add_records(&[a.clone(), b.clone()]);
        let mut reverse = DocumentIndex::new();
        reverse.add_records(&[b, a]);

        for term in ["reset", "password", "billing", "invoice", "link"] {
            assert_eq!(forward.idf(term), reverse.idf(term), "idf mismatch for {term}");
        }
    }

    #[test]
    fn successive_batches_rebuild_idf_over_whole_corpus() {
        let mut index = DocumentIndex::new();
        index.add_records(&[record("password reset", "reset link")]);
        // Sole document: ln(1/1) = 0 for all terms.
        assert_eq!(index.idf("password"), 0.0);

        index.add_records(&[record("billing invoice", "invoice help")]);
        // Now two documents and "password" appears in one.
        assert!((index.idf("password") - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn duplicate_records_are_kept() {
        let mut index = DocumentIndex::new();
        let r = record("same question", "same answer");
        index.add_records(&[r.clone(), r]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn empty_index_reports_unready_state() {
        let index = DocumentIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.vocabulary_size(), 0);
        assert_eq!(index.idf("anything"), 0.0);
    }
}
