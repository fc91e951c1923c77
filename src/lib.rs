//! answerbox - a retrieval-based response engine for support Q/A corpora.
//!
//! answerbox ingests `{input, output, source}` question/answer records,
//! builds a TF-IDF index over them, and answers free-text queries by cosine
//! similarity ranking with a keyword-overlap fallback, synthesizing a final
//! reply under a confidence-tiered policy. User ratings of replies are
//! collected and aggregated separately.
//!
//! # Quick start
//!
//! ```
//! use answerbox::{DatasetRecord, Engine};
//! use answerbox::feedback::{NullSink, SequentialIds};
//!
//! let mut engine = Engine::new(Box::new(NullSink), Box::<SequentialIds>::default());
//! engine.load_records(&[
//!     DatasetRecord {
//!         input: "password reset help".into(),
//!         output: "Go to settings and reset your password.".into(),
//!         source: "kb".into(),
//!     },
//!     DatasetRecord {
//!         input: "billing question".into(),
//!         output: "Contact billing for invoice help.".into(),
//!         source: "kb".into(),
//!     },
//! ]);
//!
//! let response = engine.get_response("how do I reset my password", "session-1");
//! println!("[{:.2}] {}", response.confidence, response.reply);
//! ```

pub mod cli;
pub mod data_dir;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod index;
pub mod keyword;
pub mod refine;
pub mod response;
pub mod tfidf;
pub mod tokenize;

pub use data_dir::DataDir;
pub use dataset::DatasetRecord;
pub use engine::{DatasetInfo, Engine, EngineResponse};
pub use error::{Error, Result};
pub use feedback::{ChatFeedback, FeedbackStats, FeedbackStore};
pub use index::DocumentIndex;
pub use response::QueryCategory;
pub use tfidf::SearchResult;
