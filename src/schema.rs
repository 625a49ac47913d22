//! Shape contracts for extracted questions and answers.
//!
//! Wire names are camelCase so the same types describe the model's JSON output,
//! the schema guidance sent with the prompt, and the saved-quiz file format.
//! Question and answer text may embed LaTeX (`$...$` inline, `$$...$$` block);
//! it is carried verbatim and never interpreted here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One entry of an answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    /// The question number, starting at 1.
    #[schemars(range(min = 1))]
    pub question_number: u32,
    /// The correct answer: the option letter or the option text.
    pub correct_answer: String,
}

/// A question as read from the document, without its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuestion {
    /// The question number, starting at 1.
    #[schemars(range(min = 1))]
    pub question_number: u32,
    /// The question text. Math is written in LaTeX between `$` or `$$`.
    pub question_text: String,
    /// The answer options in document order.
    pub options: Vec<String>,
}

/// A question paired with its correct answer. The answer is empty when no key
/// covered the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoredQuestion {
    #[schemars(range(min = 1))]
    pub question_number: u32,
    pub question_text: String,
    pub options: Vec<String>,
    /// The correct answer for the question.
    pub correct_answer: String,
}

impl ScoredQuestion {
    pub fn from_extracted(question: ExtractedQuestion, correct_answer: String) -> Self {
        Self {
            question_number: question.question_number,
            question_text: question.question_text,
            options: question.options,
            correct_answer,
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.correct_answer.trim().is_empty()
    }
}

/// Output of answer-key extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Answer Key", description = "Every answer listed in the answer key document")]
pub struct AnswerKey {
    /// The extracted answers.
    pub answers: Vec<AnswerRecord>,
}

/// Output of question-only extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Exam Questions", description = "Every question in the document, without answers")]
pub struct QuestionSet {
    /// The extracted questions.
    pub questions: Vec<ExtractedQuestion>,
}

/// Output of quiz extraction from a document that carries its own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(title = "Quiz", description = "Questions with options, correct answers and an accuracy assessment")]
pub struct QuizExtraction {
    /// The extracted quiz questions.
    pub questions: Vec<ScoredQuestion>,
    /// An assessment of the accuracy of the extracted questions.
    pub accuracy_assessment: String,
}

/// A playable quiz or exam. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizDocument {
    /// Display title, also the key in the saved collection.
    pub title: String,
    pub questions: Vec<ScoredQuestion>,
    /// Free-text note on how trustworthy the extraction and key are.
    #[serde(default)]
    pub accuracy_assessment: String,
}

impl QuizDocument {
    pub fn question(&self, number: u32) -> Option<&ScoredQuestion> {
        self.questions.iter().find(|q| q.question_number == number)
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.has_answer()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let q = ScoredQuestion {
            question_number: 3,
            question_text: "What is $x^2$?".into(),
            options: vec!["a".into()],
            correct_answer: String::new(),
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v["questionNumber"], 3);
        assert_eq!(v["questionText"], "What is $x^2$?");
        assert_eq!(v["correctAnswer"], "");
    }

    #[test]
    fn saved_document_without_note_loads() {
        let doc: QuizDocument = serde_json::from_str(r#"{"title":"t","questions":[]}"#).unwrap();
        assert_eq!(doc.accuracy_assessment, "");
    }

    #[test]
    fn schema_mentions_collection_key() {
        let schema = serde_json::to_string(&schemars::schema_for!(QuizExtraction)).unwrap();
        assert!(schema.contains("accuracyAssessment"));
        assert!(schema.contains("correctAnswer"));
    }
}
