use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How many recent entries the aggregate statistics carry.
const RECENT_LIMIT: usize = 10;

/// One recorded rating of a reply. Append-only; never mutated or deleted.
///
/// All fields default when deserializing so that malformed persisted
/// entries are tolerated rather than poisoning the whole file. A missing
/// rating reads back as 0 and is excluded from the positive/negative
/// buckets, but still counts toward totals and the average denominator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFeedback {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub feedback_text: String,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

/// Aggregate feedback statistics.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub total: usize,
    /// Mean rating rounded to one decimal place.
    pub average_rating: f64,
    /// Ratings of 4 or 5.
    pub positive: usize,
    /// Ratings of 1 or 2.
    pub negative: usize,
    /// Counts of ratings 1 through 5, in order.
    pub histogram: [usize; 5],
    /// Up to ten most recent entries, newest first.
    pub recent: Vec<ChatFeedback>,
}

/// Source of feedback identifiers.
///
/// Injectable so tests can supply a deterministic sequence instead of the
/// timestamp-plus-random default.
pub trait IdGenerator: Send {
    fn generate(&mut self) -> String;
}

/// Default generator: millisecond timestamp plus a random suffix.
/// Uniqueness is probabilistic, which is acceptable for feedback records.
#[derive(Debug, Default)]
pub struct SystemIds;

impl IdGenerator for SystemIds {
    fn generate(&mut self) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("fb_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
    }
}

/// Monotonic counter generator for deterministic tests.
#[derive(Debug, Default)]
pub struct SequentialIds(u64);

impl IdGenerator for SequentialIds {
    fn generate(&mut self) -> String {
        self.0 += 1;
        format!("fb_{:06}", self.0)
    }
}

/// Destination for the persisted feedback collection.
///
/// The whole collection is written on every change; there is no partial
/// append. A sink that cannot read its backing store reports an empty
/// collection rather than failing.
pub trait FeedbackSink: Send {
    fn persist(&self, entries: &[ChatFeedback]) -> Result<()>;
    fn load(&self) -> Vec<ChatFeedback>;
}

/// JSON-file sink: the collection lives as a single JSON array on disk.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FeedbackSink for JsonFileSink {
    fn persist(&self, entries: &[ChatFeedback]) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    fn load(&self) -> Vec<ChatFeedback> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "feedback file is corrupt, starting with an empty collection"
                );
                Vec::new()
            }
        }
    }
}

/// Sink that keeps nothing. Useful for ephemeral engines and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl FeedbackSink for NullSink {
    fn persist(&self, _entries: &[ChatFeedback]) -> Result<()> {
        Ok(())
    }

    fn load(&self) -> Vec<ChatFeedback> {
        Vec::new()
    }
}

/// In-memory feedback collection backed by a pluggable sink.
pub struct FeedbackStore {
    entries: Vec<ChatFeedback>,
    sink: Box<dyn FeedbackSink>,
    ids: Box<dyn IdGenerator>,
}

impl FeedbackStore {
    /// Open a store, reconstituting prior feedback from the sink.
    pub fn open(sink: Box<dyn FeedbackSink>, ids: Box<dyn IdGenerator>) -> Self {
        let entries = sink.load();
        Self { entries, sink, ids }
    }

    /// Record a rating and persist the full collection.
    ///
    /// Ratings are clamped to 1..=5. A persistence failure is logged and
    /// the in-memory record retained so a later write can carry it; there
    /// is no automatic retry.
    pub fn add(
        &mut self,
        session_id: &str,
        message: &str,
        response: &str,
        rating: u8,
        feedback_text: &str,
    ) -> String {
        let entry = ChatFeedback {
            id: self.ids.generate(),
            session_id: session_id.to_string(),
            message: message.to_string(),
            response: response.to_string(),
            rating: rating.clamp(1, 5),
            feedback_text: feedback_text.to_string(),
            timestamp: Utc::now(),
        };
        let id = entry.id.clone();
        self.entries.push(entry);

        if let Err(err) = self.sink.persist(&self.entries) {
            tracing::error!(%err, "failed to persist feedback, keeping record in memory");
        }

        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compute aggregate statistics over all stored feedback.
    pub fn stats(&self) -> FeedbackStats {
        let total = self.entries.len();
        let mut histogram = [0usize; 5];
        let mut positive = 0;
        let mut negative = 0;
        let mut sum = 0u64;

        for entry in &self.entries {
            sum += u64::from(entry.rating);
            match entry.rating {
                1..=5 => {
                    histogram[entry.rating as usize - 1] += 1;
                    if entry.rating >= 4 {
                        positive += 1;
                    } else if entry.rating <= 2 {
                        negative += 1;
                    }
                }
                // Malformed entries (rating 0 or out of range) count toward
                // the total and the average denominator only.
                _ => {}
            }
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            (sum as f64 / total as f64 * 10.0).round() / 10.0
        };

        let mut recent: Vec<ChatFeedback> = self.entries.clone();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(RECENT_LIMIT);

        FeedbackStats {
            total,
            average_rating,
            positive,
            negative,
            histogram,
            recent,
        }
    }
}

impl std::fmt::Debug for FeedbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackStore")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
