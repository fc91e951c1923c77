use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One question/answer exemplar. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub input: String,
    pub output: String,
    pub source: String,
}

/// Field names accepted for the question side of a record.
const INPUT_KEYS: &[&str] = &["input", "question", "query", "customer_query"];

/// Field names accepted for the answer side of a record.
const OUTPUT_KEYS: &[&str] = &["output", "answer", "response", "agent_response"];

/// Extract a record from a parsed JSON object.
///
/// Accepts flat objects under any of the known input/output key pairs, and
/// chat-export objects of the form `{"messages": [{role, content}, ...]}`
/// (first user message paired with first assistant message). Returns `None`
/// for anything else; malformed records are skipped, not errors.
fn record_from_value(value: &Value, source: &str) -> Option<DatasetRecord> {
    let obj = value.as_object()?;

    if let Some(messages) = obj.get("messages").and_then(Value::as_array) {
        let content_of = |role: &str| -> Option<String> {
            messages.iter().find_map(|m| {
                let msg = m.as_object()?;
                if msg.get("role")?.as_str()? != role {
                    return None;
                }
                msg.get("content")?.as_str().map(str::to_string)
            })
        };
        let input = content_of("user")?;
        let output = content_of("assistant")?;
        return Some(DatasetRecord {
            input,
            output,
            source: source.to_string(),
        });
    }

    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    let input = pick(INPUT_KEYS)?;
    let output = pick(OUTPUT_KEYS)?;
    if input.is_empty() || output.is_empty() {
        return None;
    }

    Some(DatasetRecord {
        input,
        output,
        source: source.to_string(),
    })
}

/// Parse a JSON array of record objects, skipping malformed entries.
pub fn parse_json(content: &str, source: &str) -> Result<Vec<DatasetRecord>> {
    let value: Value = serde_json::from_str(content)?;
    let items = value
        .as_array()
        .ok_or_else(|| Error::Config("dataset must be a JSON array of objects".into()))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for item in items {
        match record_from_value(item, source) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, source, "skipped malformed dataset records");
    }
    Ok(records)
}

/// Parse JSON Lines content (one record object per line).
///
/// Lines that fail to parse or lack the expected fields are skipped; an
/// entirely malformed file simply yields zero records.
pub fn parse_jsonl(content: &str, source: &str) -> Vec<DatasetRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => match record_from_value(&value, source) {
                Some(record) => records.push(record),
                None => skipped += 1,
            },
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, source, "skipped malformed dataset lines");
    }
    records
}

/// Load records from a `.json` or `.jsonl` file, labelling them with
/// `source`.
pub fn load_file(path: &Path, source: &str) -> Result<Vec<DatasetRecord>> {
    let content = std::fs::read_to_string(path)?;
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));

    if is_jsonl {
        Ok(parse_jsonl(&content, source))
    } else {
        parse_json(&content, source)
    }
}
