//! Turns free-form model text into a schema-conforming value.
//!
//! Steps, each only reached if the previous one did not fail:
//! 1. strip Markdown fences (`EmptyResponse` if nothing is left)
//! 2. strict parse, then the JSON found inside surrounding prose, then the
//!    repair pass (`MalformedJson` if all fail)
//! 3. locate the record collection required by the target schema
//!    (`SchemaViolation`)
//! 4. read each record, dropping incomplete or mistyped ones without failing
//!    the batch

mod fence;
mod records;
mod repair;

pub use fence::strip_fences;
pub use records::RecordDefect;
pub use repair::repair_json;
use repair::repair_prefix;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::NormalizationError;
use crate::json_utils::largest_json_root;

/// A target shape for normalization: a named array of records, each read with
/// an explicit per-field predicate, plus whatever top-level fields the output
/// carries.
pub trait TargetSchema: Sized {
    type Record;

    /// Key of the record array in the top-level object.
    const COLLECTION: &'static str;

    /// Read one array element, or say why it is unusable.
    fn read_record(value: &Value) -> Result<Self::Record, RecordDefect>;

    /// Build the output from the surviving records. `root` is `None` when the
    /// model returned a bare array.
    fn assemble(records: Vec<Self::Record>, root: Option<&Map<String, Value>>) -> Result<Self, String>;

    fn record_count(&self) -> usize;
}

/// Normalize `raw` model output into `S`.
#[instrument(target = "pdf_quiz::normalize", skip(raw), fields(raw_len = raw.len(), schema = S::COLLECTION))]
pub fn normalize<S: TargetSchema>(raw: &str) -> Result<S, NormalizationError> {
    let body = strip_fences(raw);
    if body.is_empty() {
        debug!(target: "pdf_quiz::normalize", "nothing left after fence stripping");
        return Err(NormalizationError::EmptyResponse);
    }

    let value = parse_lenient(body, S::COLLECTION).map_err(|reason| NormalizationError::MalformedJson {
        raw: raw.to_string(),
        reason,
    })?;

    let (root, items) = locate_collection(&value, S::COLLECTION).map_err(|detail| {
        NormalizationError::SchemaViolation { detail, raw: raw.to_string() }
    })?;

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for (index, item) in items.iter().enumerate() {
        match S::read_record(item) {
            Ok(record) => records.push(record),
            Err(defect) => {
                dropped += 1;
                debug!(target: "pdf_quiz::normalize", index, %defect, "dropping record");
            }
        }
    }
    if dropped > 0 {
        warn!(target: "pdf_quiz::normalize", dropped, kept = records.len(), "dropped incomplete records");
    }

    S::assemble(records, root).map_err(|detail| NormalizationError::SchemaViolation {
        detail,
        raw: raw.to_string(),
    })
}

/// Candidate roots tried by the repair pass before giving up.
const MAX_REPAIR_ROOTS: usize = 16;

/// Strict parse first; then the largest JSON structure inside the text; then the
/// repair pass over each root in turn. Embedded or repaired JSON is only taken
/// early when it holds `collection`; otherwise the first value that parsed is
/// returned. Returns the strict parser's error message when nothing works.
fn parse_lenient(body: &str, collection: &str) -> Result<Value, String> {
    let strict_err = match serde_json::from_str::<Value>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Some(embedded) = largest_json_root(body) {
        if embedded.len() < body.len() {
            match serde_json::from_str::<Value>(embedded) {
                Ok(value) if holds_records(&value, collection) => {
                    debug!(target: "pdf_quiz::normalize", "parsed JSON embedded in prose");
                    return Ok(value);
                }
                Ok(_) => debug!(target: "pdf_quiz::normalize", "embedded JSON has no records, trying repair"),
                Err(_) => {}
            }
        }
    }

    let mut fallback = None;
    let mut repair_err = None;
    let mut offset = 0;
    for _ in 0..MAX_REPAIR_ROOTS {
        let Some((repaired, consumed)) = repair_prefix(&body[offset..]) else { break };
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) if holds_records(&value, collection) => {
                debug!(target: "pdf_quiz::normalize", offset, repaired_len = repaired.len(), "repair pass succeeded");
                return Ok(value);
            }
            Ok(value) => {
                fallback.get_or_insert(value);
            }
            Err(e) => {
                repair_err.get_or_insert_with(|| e.to_string());
            }
        }
        offset += consumed.max(1);
        if offset >= body.len() {
            break;
        }
    }

    match (fallback, repair_err) {
        (Some(value), _) => Ok(value),
        (None, Some(e)) => Err(format!("{}; repair failed: {}", strict_err, e)),
        (None, None) => Err(format!("no JSON object or array found ({})", strict_err)),
    }
}

/// An object carrying `collection`, or a bare array of records.
fn holds_records(value: &Value, collection: &str) -> bool {
    match value {
        Value::Object(map) => map.contains_key(collection),
        Value::Array(items) => items.first().is_some_and(Value::is_object),
        _ => false,
    }
}

fn locate_collection<'a>(
    value: &'a Value,
    collection: &str,
) -> Result<(Option<&'a Map<String, Value>>, &'a [Value]), String> {
    match value {
        Value::Object(map) => match map.get(collection) {
            Some(Value::Array(items)) => Ok((Some(map), items.as_slice())),
            Some(other) => Err(format!("`{}` must be an array, found {}", collection, type_name(other))),
            None => Err(format!("missing field `{}`", collection)),
        },
        Value::Array(items) => Ok((None, items.as_slice())),
        other => Err(format!("expected a JSON object, found {}", type_name(other))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AnswerKey, QuestionSet};

    #[test]
    fn strict_json_needs_no_repair() {
        let key: AnswerKey = normalize(r#"{"answers":[{"questionNumber":2,"correctAnswer":"C"}]}"#).unwrap();
        assert_eq!(key.answers[0].question_number, 2);
    }

    #[test]
    fn prose_wrapped_json_is_found() {
        let raw = r#"I found these answers: {"answers":[{"questionNumber":1,"correctAnswer":"B"}]} (page 1 only)"#;
        let key: AnswerKey = normalize(raw).unwrap();
        assert_eq!(key.answers.len(), 1);
    }

    #[test]
    fn bracket_in_prose_does_not_hide_truncated_records() {
        let raw = concat!(
            "Sure, see note [1]: ",
            r#"{"questions":[{"questionNumber":1,"questionText":"Q1","options":["a","b"]},"#,
            r#"{"questionNumber":2,"questionTe"#
        );
        let set: QuestionSet = normalize(raw).unwrap();
        assert_eq!(set.questions.len(), 1);
        assert_eq!(set.questions[0].question_text, "Q1");
    }

    #[test]
    fn unrelated_object_still_reports_the_missing_collection() {
        let err = normalize::<AnswerKey>(r#"Here: {"questions": [{"questionNumber": 1,}]}"#).unwrap_err();
        assert!(matches!(err, NormalizationError::SchemaViolation { ref detail, .. } if detail.contains("answers")));
    }

    #[test]
    fn collection_of_wrong_type_is_schema_violation() {
        let err = normalize::<QuestionSet>(r#"{"questions":"none"}"#).unwrap_err();
        match err {
            NormalizationError::SchemaViolation { detail, .. } => {
                assert_eq!(detail, "`questions` must be an array, found string")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scalar_root_is_schema_violation() {
        assert!(matches!(
            normalize::<QuestionSet>("42"),
            Err(NormalizationError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn prose_without_json_is_malformed() {
        let err = normalize::<AnswerKey>("Sorry, I cannot read this file.").unwrap_err();
        match err {
            NormalizationError::MalformedJson { raw, .. } => assert_eq!(raw, "Sorry, I cannot read this file."),
            other => panic!("unexpected {other:?}"),
        }
    }
}
