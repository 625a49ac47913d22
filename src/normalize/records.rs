use std::fmt;

use serde_json::{Map, Value};

use super::{type_name, TargetSchema};
use crate::schema::{AnswerKey, AnswerRecord, ExtractedQuestion, QuestionSet, QuizExtraction, ScoredQuestion};

/// Why a single record was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDefect {
    NotAnObject(&'static str),
    Missing(&'static str),
    WrongType { field: &'static str, found: &'static str },
    Blank(&'static str),
    /// Question numbers start at 1. Zero is treated as absent, which also means a
    /// zero-indexed document loses its first question.
    ZeroQuestionNumber,
    InvalidQuestionNumber(String),
    NoOptions,
}

impl fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject(found) => write!(f, "record is a {}, not an object", found),
            Self::Missing(field) => write!(f, "missing `{}`", field),
            Self::WrongType { field, found } => write!(f, "`{}` has type {}", field, found),
            Self::Blank(field) => write!(f, "`{}` is empty", field),
            Self::ZeroQuestionNumber => write!(f, "`questionNumber` is 0"),
            Self::InvalidQuestionNumber(n) => write!(f, "`questionNumber` {} is not a positive integer", n),
            Self::NoOptions => write!(f, "`options` is empty"),
        }
    }
}

impl TargetSchema for AnswerKey {
    type Record = AnswerRecord;
    const COLLECTION: &'static str = "answers";

    fn read_record(value: &Value) -> Result<AnswerRecord, RecordDefect> {
        let obj = as_object(value)?;
        Ok(AnswerRecord {
            question_number: question_number(obj)?,
            correct_answer: required_text(obj, "correctAnswer")?,
        })
    }

    fn assemble(answers: Vec<AnswerRecord>, _root: Option<&Map<String, Value>>) -> Result<Self, String> {
        Ok(Self { answers })
    }

    fn record_count(&self) -> usize {
        self.answers.len()
    }
}

impl TargetSchema for QuestionSet {
    type Record = ExtractedQuestion;
    const COLLECTION: &'static str = "questions";

    fn read_record(value: &Value) -> Result<ExtractedQuestion, RecordDefect> {
        let obj = as_object(value)?;
        read_question(obj)
    }

    fn assemble(questions: Vec<ExtractedQuestion>, _root: Option<&Map<String, Value>>) -> Result<Self, String> {
        Ok(Self { questions })
    }

    fn record_count(&self) -> usize {
        self.questions.len()
    }
}

impl TargetSchema for QuizExtraction {
    type Record = ScoredQuestion;
    const COLLECTION: &'static str = "questions";

    /// Same predicate as question-only extraction; a missing or null
    /// `correctAnswer` keeps the question with an empty answer.
    fn read_record(value: &Value) -> Result<ScoredQuestion, RecordDefect> {
        let obj = as_object(value)?;
        let question = read_question(obj)?;
        let answer = optional_text(obj, "correctAnswer")?;
        Ok(ScoredQuestion::from_extracted(question, answer))
    }

    fn assemble(questions: Vec<ScoredQuestion>, root: Option<&Map<String, Value>>) -> Result<Self, String> {
        let accuracy_assessment = match root.and_then(|r| r.get("accuracyAssessment")) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(format!("`accuracyAssessment` must be a string, found {}", type_name(other))),
        };
        Ok(Self { questions, accuracy_assessment })
    }

    fn record_count(&self) -> usize {
        self.questions.len()
    }
}

fn read_question(obj: &Map<String, Value>) -> Result<ExtractedQuestion, RecordDefect> {
    Ok(ExtractedQuestion {
        question_number: question_number(obj)?,
        question_text: required_text(obj, "questionText")?,
        options: options(obj)?,
    })
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, RecordDefect> {
    value.as_object().ok_or(RecordDefect::NotAnObject(type_name(value)))
}

/// Positive integer. Integral floats (`3.0`) are accepted, numeric strings are not.
fn question_number(obj: &Map<String, Value>) -> Result<u32, RecordDefect> {
    const FIELD: &str = "questionNumber";
    let number = match obj.get(FIELD) {
        None | Some(Value::Null) => return Err(RecordDefect::Missing(FIELD)),
        Some(Value::Number(n)) => n,
        Some(other) => return Err(RecordDefect::WrongType { field: FIELD, found: type_name(other) }),
    };

    let value = match number.as_u64() {
        Some(n) => n,
        None => match number.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => f as u64,
            _ => return Err(RecordDefect::InvalidQuestionNumber(number.to_string())),
        },
    };

    match value {
        0 => Err(RecordDefect::ZeroQuestionNumber),
        n => u32::try_from(n).map_err(|_| RecordDefect::InvalidQuestionNumber(n.to_string())),
    }
}

/// Non-blank string, returned verbatim.
fn required_text(obj: &Map<String, Value>, field: &'static str) -> Result<String, RecordDefect> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(RecordDefect::Missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(RecordDefect::Blank(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RecordDefect::WrongType { field, found: type_name(other) }),
    }
}

fn optional_text(obj: &Map<String, Value>, field: &'static str) -> Result<String, RecordDefect> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RecordDefect::WrongType { field, found: type_name(other) }),
    }
}

/// Ordered list of strings. Blank entries are skipped; nothing left is a defect.
fn options(obj: &Map<String, Value>) -> Result<Vec<String>, RecordDefect> {
    const FIELD: &str = "options";
    let items = match obj.get(FIELD) {
        None | Some(Value::Null) => return Err(RecordDefect::Missing(FIELD)),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(RecordDefect::WrongType { field: FIELD, found: type_name(other) }),
    };

    let mut options = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) if s.trim().is_empty() => {}
            Value::String(s) => options.push(s.clone()),
            other => return Err(RecordDefect::WrongType { field: FIELD, found: type_name(other) }),
        }
    }

    if options.is_empty() {
        return Err(RecordDefect::NoOptions);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_question_number_is_rejected() {
        let record = json!({"questionNumber": 0, "questionText": "X", "options": ["a"]});
        assert_eq!(QuestionSet::read_record(&record), Err(RecordDefect::ZeroQuestionNumber));
    }

    #[test]
    fn question_number_types() {
        let base = |n: Value| json!({"questionNumber": n, "correctAnswer": "A"});
        assert_eq!(AnswerKey::read_record(&base(json!(4.0))).unwrap().question_number, 4);
        assert!(matches!(AnswerKey::read_record(&base(json!("4"))), Err(RecordDefect::WrongType { .. })));
        assert!(matches!(AnswerKey::read_record(&base(json!(-1))), Err(RecordDefect::InvalidQuestionNumber(_))));
        assert!(matches!(AnswerKey::read_record(&base(json!(2.5))), Err(RecordDefect::InvalidQuestionNumber(_))));
        assert!(matches!(AnswerKey::read_record(&base(json!(null))), Err(RecordDefect::Missing(_))));
    }

    #[test]
    fn options_must_be_non_empty_strings() {
        let rec = |options: Value| json!({"questionNumber": 1, "questionText": "Q", "options": options});
        assert_eq!(QuestionSet::read_record(&rec(json!([]))), Err(RecordDefect::NoOptions));
        assert_eq!(QuestionSet::read_record(&rec(json!(["", "  "]))), Err(RecordDefect::NoOptions));
        assert!(matches!(QuestionSet::read_record(&rec(json!("A, B"))), Err(RecordDefect::WrongType { .. })));
        assert!(matches!(QuestionSet::read_record(&rec(json!(["A", 2]))), Err(RecordDefect::WrongType { .. })));
        assert_eq!(QuestionSet::read_record(&rec(json!(["A", "", "B"]))).unwrap().options, vec!["A", "B"]);
    }

    #[test]
    fn answer_key_rejects_blank_answer() {
        let record = json!({"questionNumber": 1, "correctAnswer": " "});
        assert_eq!(AnswerKey::read_record(&record), Err(RecordDefect::Blank("correctAnswer")));
    }

    #[test]
    fn quiz_answer_may_be_absent_but_not_mistyped() {
        let absent = json!({"questionNumber": 1, "questionText": "Q", "options": ["a"]});
        assert_eq!(QuizExtraction::read_record(&absent).unwrap().correct_answer, "");
        let mistyped = json!({"questionNumber": 1, "questionText": "Q", "options": ["a"], "correctAnswer": 1});
        assert!(QuizExtraction::read_record(&mistyped).is_err());
    }

    #[test]
    fn latex_passes_through_verbatim() {
        let record = json!({"questionNumber": 1, "questionText": "Solve $$\\int_0^1 x\\,dx$$", "options": ["$\\frac{1}{2}$"]});
        let q = QuestionSet::read_record(&record).unwrap();
        assert_eq!(q.question_text, "Solve $$\\int_0^1 x\\,dx$$");
        assert_eq!(q.options[0], "$\\frac{1}{2}$");
    }
}
