//! Building playable documents from extraction output. Pure data transforms,
//! no model calls.

use std::collections::HashMap;

use tracing::debug;

use crate::schema::{AnswerRecord, ExtractedQuestion, QuizDocument, QuizExtraction, ScoredQuestion};

/// Pair every question with its answer by question number. Unmatched questions
/// get an empty answer; when the key repeats a number, the first entry wins.
/// Question order is preserved.
pub fn merge_answers(questions: Vec<ExtractedQuestion>, answers: &[AnswerRecord]) -> Vec<ScoredQuestion> {
    let mut by_number: HashMap<u32, &str> = HashMap::with_capacity(answers.len());
    for answer in answers {
        by_number.entry(answer.question_number).or_insert(answer.correct_answer.as_str());
    }

    let merged: Vec<ScoredQuestion> = questions
        .into_iter()
        .map(|q| {
            let answer = by_number.get(&q.question_number).map(|a| a.to_string()).unwrap_or_default();
            ScoredQuestion::from_extracted(q, answer)
        })
        .collect();

    debug!(
        questions = merged.len(),
        answers = answers.len(),
        matched = merged.iter().filter(|q| q.has_answer()).count(),
        "Merged answer key"
    );
    merged
}

/// Answers a user typed in per question, keyed by question number. Blank
/// entries count as unanswered.
pub fn apply_manual_answers(questions: Vec<ExtractedQuestion>, answers: &HashMap<u32, String>) -> Vec<ScoredQuestion> {
    questions
        .into_iter()
        .map(|q| {
            let answer = answers
                .get(&q.question_number)
                .map(|a| a.trim().to_string())
                .unwrap_or_default();
            ScoredQuestion::from_extracted(q, answer)
        })
        .collect()
}

impl QuizDocument {
    /// An exam from question-only extraction plus an optional answer key.
    pub fn from_questions(title: impl Into<String>, questions: Vec<ExtractedQuestion>, answers: &[AnswerRecord]) -> Self {
        let questions = merge_answers(questions, answers);
        let matched = questions.iter().filter(|q| q.has_answer()).count();
        let accuracy_assessment = if answers.is_empty() {
            "No answer key was provided.".to_string()
        } else {
            format!("Answer key matched {} of {} questions.", matched, questions.len())
        };
        Self { title: title.into(), questions, accuracy_assessment }
    }

    /// A quiz whose document carried its own key.
    pub fn from_quiz(title: impl Into<String>, quiz: QuizExtraction) -> Self {
        Self {
            title: title.into(),
            questions: quiz.questions,
            accuracy_assessment: quiz.accuracy_assessment,
        }
    }
}
