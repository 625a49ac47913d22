use std::collections::HashMap;

use serde::Serialize;

use crate::schema::QuizDocument;

/// Whether `user` matches `correct`. Blank on either side never matches.
/// Otherwise, after trimming, the two must be equal or one must be a prefix of
/// the other, so "d) E" matches a key of "d".
pub fn check_answer(user: &str, correct: &str) -> bool {
    let ua = user.trim();
    let ca = correct.trim();
    if ua.is_empty() || ca.is_empty() {
        return false;
    }
    ua == ca || ua.starts_with(ca) || ca.starts_with(ua)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_number: u32,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub correct: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; 0 for an empty document.
    pub percentage: u32,
    pub outcomes: Vec<QuestionOutcome>,
}

impl ScoreReport {
    pub fn incorrect(&self) -> impl Iterator<Item = &QuestionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_correct)
    }
}

/// Score `answers` (question number → chosen answer) against `document`.
pub fn score(document: &QuizDocument, answers: &HashMap<u32, String>) -> ScoreReport {
    let outcomes: Vec<QuestionOutcome> = document
        .questions
        .iter()
        .map(|q| {
            let user_answer = answers.get(&q.question_number).cloned();
            let is_correct = user_answer.as_deref().is_some_and(|a| check_answer(a, &q.correct_answer));
            QuestionOutcome {
                question_number: q.question_number,
                user_answer,
                correct_answer: q.correct_answer.clone(),
                is_correct,
            }
        })
        .collect();

    let correct = outcomes.iter().filter(|o| o.is_correct).count();
    let total = outcomes.len();
    let percentage = if total == 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u32
    };

    ScoreReport { correct, total, percentage, outcomes }
}
