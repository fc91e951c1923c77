use std::{collections::BTreeMap, path::PathBuf};

use serde::Serialize;

use crate::{
    data_dir::DataDir,
    dataset::DatasetRecord,
    error::{Error, Result},
    feedback::{FeedbackSink, FeedbackStats, FeedbackStore, IdGenerator, JsonFileSink, SystemIds},
    index::DocumentIndex,
    keyword, response, tfidf,
    tfidf::SearchResult,
};

/// Default number of ranked results fed into reply synthesis.
const DEFAULT_TOP_K: usize = 3;

/// Everything the host layer needs to render one reply.
#[derive(Debug, Clone, Serialize)]
pub struct EngineResponse {
    pub reply: String,
    pub session_id: String,
    pub confidence: f64,
    pub category: response::QueryCategory,
    pub results: Vec<SearchResult>,
}

/// Summary of the loaded corpus.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub total_records: usize,
    pub source_distribution: BTreeMap<String, usize>,
    pub is_initialized: bool,
}

/// The retrieval-and-response engine.
///
/// Explicitly constructed; the feedback sink and the id generator are
/// injectable so tests run against fixtures instead of the filesystem.
/// Loading and feedback writes take `&mut self` and must not be
/// interleaved by the caller; queries are pure reads.
pub struct Engine {
    index: DocumentIndex,
    records: Vec<DatasetRecord>,
    feedback: FeedbackStore,
    datasets_dir: Option<PathBuf>,
}

impl Engine {
    /// Build an engine with explicit collaborators and no dataset
    /// persistence.
    pub fn new(sink: Box<dyn FeedbackSink>, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            index: DocumentIndex::new(),
            records: Vec::new(),
            feedback: FeedbackStore::open(sink, ids),
            datasets_dir: None,
        }
    }

    /// Open an engine rooted at a data directory: feedback persists to
    /// `feedback.json` and previously registered datasets are reloaded.
    pub fn open(data_dir: &DataDir) -> Result<Self> {
        let sink = JsonFileSink::new(data_dir.feedback_file());
        let mut engine = Self::new(Box::new(sink), Box::new(SystemIds));
        engine.datasets_dir = Some(data_dir.datasets_dir()?);
        engine.reload_registered_datasets()?;
        Ok(engine)
    }

    /// Re-read every dataset file registered under the data directory.
    /// Unreadable or corrupt files are skipped with a warning; the engine
    /// comes up with whatever loaded cleanly.
    fn reload_registered_datasets(&mut self) -> Result<()> {
        let Some(dir) = self.datasets_dir.clone() else {
            return Ok(());
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable dataset");
                    continue;
                }
            };
            match serde_json::from_str::<Vec<DatasetRecord>>(&content) {
                Ok(records) => self.load_records(&records),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping corrupt dataset");
                }
            }
        }
        Ok(())
    }

    /// Append records to the live corpus and rebuild the index weights.
    ///
    /// Each call triggers a full IDF recomputation over the accumulated
    /// corpus (see [`DocumentIndex::add_records`]); callers should batch.
    pub fn load_records(&mut self, records: &[DatasetRecord]) {
        if records.is_empty() {
            return;
        }
        self.index.add_records(records);
        self.records.extend_from_slice(records);
        tracing::info!(
            added = records.len(),
            total = self.records.len(),
            "loaded dataset records"
        );
    }

    /// Append a named batch, persist it under the data directory, and
    /// merge it into the live index. Returns how many records were added.
    pub fn add_custom_dataset(&mut self, records: &[DatasetRecord], name: &str) -> Result<usize> {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::Config(format!(
                "invalid dataset name '{name}': use letters, digits, '-' or '_'"
            )));
        }

        let labelled: Vec<DatasetRecord> = records
            .iter()
            .map(|r| DatasetRecord {
                input: r.input.clone(),
                output: r.output.clone(),
                source: format!("custom_{name}"),
            })
            .collect();

        if let Some(dir) = &self.datasets_dir {
            let path = dir.join(format!("{name}.json"));
            let data = serde_json::to_string_pretty(&labelled)?;
            std::fs::write(&path, data)?;
            tracing::info!(path = %path.display(), records = labelled.len(), "registered dataset");
        }

        let added = labelled.len();
        self.load_records(&labelled);
        Ok(added)
    }

    /// True once at least one document has been indexed.
    pub fn is_ready(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn store_size(&self) -> usize {
        self.index.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.index.vocabulary_size()
    }

    pub fn dataset_info(&self) -> DatasetInfo {
        let mut source_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for record in &self.records {
            *source_distribution.entry(record.source.clone()).or_insert(0) += 1;
        }
        DatasetInfo {
            total_records: self.records.len(),
            source_distribution,
            is_initialized: self.is_ready(),
        }
    }

    /// Ranked retrieval: vector search first, keyword fallback second.
    ///
    /// The fallback runs when the index is unready or the vector pass
    /// returns nothing; it scores the question side of every record.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        if self.is_ready() {
            let results = tfidf::enhanced_search(&self.index, query, top_k);
            if !results.is_empty() {
                return results;
            }
        }

        let matches = keyword::rank(query, self.records.iter().map(|r| r.input.as_str()), top_k);
        if !matches.is_empty() {
            tracing::debug!(query, hits = matches.len(), "vector search empty, keyword fallback");
        }
        matches
            .into_iter()
            .map(|m| {
                let record = &self.records[m.position];
                SearchResult {
                    text: record.output.clone(),
                    similarity: m.score,
                    question: record.input.clone(),
                    source: record.source.clone(),
                }
            })
            .collect()
    }

    /// Answer a query: small-talk short-circuit, then retrieval, then
    /// confidence-tiered synthesis. Never fails; every degradation path
    /// ends in a lower-confidence reply.
    pub fn get_response(&self, query: &str, session_id: &str) -> EngineResponse {
        if let Some(reply) = response::small_talk(query) {
            return EngineResponse {
                reply: reply.reply,
                session_id: session_id.to_string(),
                confidence: reply.confidence,
                category: reply.category,
                results: Vec::new(),
            };
        }

        let results = self.retrieve(query, DEFAULT_TOP_K);
        let synthesized = response::synthesize(query, &results);

        EngineResponse {
            reply: synthesized.reply,
            session_id: session_id.to_string(),
            confidence: synthesized.confidence,
            category: synthesized.category,
            results,
        }
    }

    /// Record a reply rating. Returns the generated feedback id.
    pub fn add_feedback(
        &mut self,
        session_id: &str,
        message: &str,
        reply: &str,
        rating: u8,
        feedback_text: &str,
    ) -> String {
        self.feedback.add(session_id, message, reply, rating, feedback_text)
    }

    pub fn feedback_stats(&self) -> FeedbackStats {
        self.feedback.stats()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("records", &self.records.len())
            .field("vocabulary", &self.index.vocabulary_size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{NullSink, SequentialIds};
    use crate::response::QueryCategory;

    fn record(input: &str, output: &str, source: &str) -> DatasetRecord {
        DatasetRecord {
            input: input.to_string(),
            output: output.to_string(),
            source: source.to_string(),
        }
    }

    fn test_engine() -> Engine {
        Engine::new(Box::new(NullSink), Box::<SequentialIds>::default())
    }

    fn loaded_engine() -> Engine {
        let mut engine = test_engine();
        engine.load_records(&[
            record(
                "password reset help",
                "Go to settings and reset your password.",
                "kb",
            ),
            record("billing question", "Contact billing for invoice help.", "kb"),
        ]);
        engine
    }

    #[test]
    fn small_talk_short_circuits_retrieval() {
        let engine = loaded_engine();
        let response = engine.get_response("hello", "s1");

        assert_eq!(response.confidence, 1.0);
        assert_eq!(response.category, QueryCategory::Greeting);
        assert!(response.results.is_empty());
    }

    #[test]
    fn small_talk_works_without_corpus() {
        let engine = test_engine();
        let response = engine.get_response("hello", "s1");
        assert_eq!(response.confidence, 1.0);
    }

    #[test]
    fn password_query_finds_password_document() {
        let engine = loaded_engine();
        let response = engine.get_response("how do I reset my password", "s1");

        assert_eq!(response.category, QueryCategory::PasswordReset);
        assert!(!response.results.is_empty());
        assert!(response.results[0].text.contains("reset your password"));
        assert!(response.results[0].similarity > 0.1);
        assert!(!response.reply.contains("couldn't find"));
    }

    #[test]
    fn unready_engine_degrades_to_generic_reply() {
        let engine = test_engine();
        let response = engine.get_response("how do I reset my password", "s1");

        assert!(response.results.is_empty());
        assert_eq!(response.confidence, 0.1);
        assert!(response.reply.contains("couldn't find"));
    }

    #[test]
    fn keyword_fallback_activates_on_empty_vector_results() {
        // A single-document corpus gives every term idf 0, so the vector
        // path scores nothing and retrieval must fall through to the
        // keyword matcher.
        let mut engine = test_engine();
        engine.load_records(&[record(
            "password reset help",
            "Go to settings and reset your password.",
            "kb",
        )]);

        let response = engine.get_response("password reset help", "s1");
        assert!(!response.results.is_empty());
        assert!(!response.reply.is_empty());
        assert!(!response.reply.contains("couldn't find"));
    }

    #[test]
    fn session_id_round_trips() {
        let engine = loaded_engine();
        let response = engine.get_response("billing", "session-42");
        assert_eq!(response.session_id, "session-42");
    }

    #[test]
    fn retrieve_is_idempotent() {
        let engine = loaded_engine();
        let first = engine.retrieve("reset my password", 3);
        let second = engine.retrieve("reset my password", 3);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.similarity, b.similarity);
        }
    }

    #[test]
    fn add_custom_dataset_merges_and_labels() {
        let mut engine = loaded_engine();
        let added = engine
            .add_custom_dataset(
                &[record("vpn drops constantly", "Update the client.", "ignored")],
                "network",
            )
            .unwrap();
        assert_eq!(added, 1);

        let info = engine.dataset_info();
        assert_eq!(info.total_records, 3);
        assert_eq!(info.source_distribution.get("custom_network"), Some(&1));
        assert_eq!(info.source_distribution.get("kb"), Some(&2));
        assert!(info.is_initialized);
    }

    #[test]
    fn add_custom_dataset_rejects_bad_names() {
        let mut engine = test_engine();
        assert!(engine.add_custom_dataset(&[], "../evil").is_err());
        assert!(engine.add_custom_dataset(&[], "").is_err());
    }

    #[test]
    fn custom_dataset_persists_and_reloads() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();

        {
            let mut engine = Engine::open(&data_dir).unwrap();
            engine
                .add_custom_dataset(
                    &[record("printer jams", "Clear the paper tray.", "x")],
                    "office",
                )
                .unwrap();
        }

        let engine = Engine::open(&data_dir).unwrap();
        let info = engine.dataset_info();
        assert_eq!(info.total_records, 1);
        assert_eq!(info.source_distribution.get("custom_office"), Some(&1));
    }

    #[test]
    fn feedback_flow() {
        let mut engine = loaded_engine();
        let id = engine.add_feedback("s1", "question", "answer", 5, "helpful");
        assert!(!id.is_empty());

        let stats = engine.feedback_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.positive, 1);
    }

    #[test]
    fn dataset_info_on_empty_engine() {
        let engine = test_engine();
        let info = engine.dataset_info();
        assert_eq!(info.total_records, 0);
        assert!(!info.is_initialized);
        assert!(info.source_distribution.is_empty());
    }
}
