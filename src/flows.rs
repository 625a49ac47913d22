//! The three extraction tasks, expressed as descriptors over one pipeline.
//!
//! Each task pairs an instruction prompt with a target schema; the schema's
//! record reader is the task's record filter. `ExtractionResolver::extract_task`
//! runs any of them.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::normalize::TargetSchema;
use crate::schema::{AnswerKey, QuestionSet, QuizExtraction};

/// Which extraction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Question numbers and correct answers from an answer-key document.
    AnswerKey,
    /// Questions and options only, no answers.
    ExamQuestions,
    /// Questions, options and correct answers from a self-keyed quiz.
    QuizQuestions,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [Self::AnswerKey, Self::ExamQuestions, Self::QuizQuestions];

    pub fn prompt(self) -> &'static str {
        match self {
            Self::AnswerKey => ANSWER_KEY_PROMPT,
            Self::ExamQuestions => EXAM_QUESTIONS_PROMPT,
            Self::QuizQuestions => QUIZ_QUESTIONS_PROMPT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnswerKey => "answer-key",
            Self::ExamQuestions => "exam",
            Self::QuizQuestions => "quiz",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "answer-key" | "answerkey" | "key" => Ok(Self::AnswerKey),
            "exam" | "exam-questions" => Ok(Self::ExamQuestions),
            "quiz" | "quiz-questions" => Ok(Self::QuizQuestions),
            _ => Err(format!("Unknown task kind: '{}'. Supported: answer-key, exam, quiz", s)),
        }
    }
}

/// Binds a task kind to its output schema.
pub trait ExtractionTask: TargetSchema + JsonSchema {
    const KIND: TaskKind;
}

impl ExtractionTask for AnswerKey {
    const KIND: TaskKind = TaskKind::AnswerKey;
}

impl ExtractionTask for QuestionSet {
    const KIND: TaskKind = TaskKind::ExamQuestions;
}

impl ExtractionTask for QuizExtraction {
    const KIND: TaskKind = TaskKind::QuizQuestions;
}

/// Result of `ExtractionResolver::extract` for a kind chosen at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum Extraction {
    AnswerKey(AnswerKey),
    ExamQuestions(QuestionSet),
    QuizQuestions(QuizExtraction),
}

impl Extraction {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::AnswerKey(_) => TaskKind::AnswerKey,
            Self::ExamQuestions(_) => TaskKind::ExamQuestions,
            Self::QuizQuestions(_) => TaskKind::QuizQuestions,
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            Self::AnswerKey(k) => k.record_count(),
            Self::ExamQuestions(q) => q.record_count(),
            Self::QuizQuestions(q) => q.record_count(),
        }
    }
}

macro_rules! latex_rule {
    () => {
        "IMPORTANT: If you encounter any mathematical equations or symbols (like fractions, integrals, summations, greek letters, etc.), you MUST format them using LaTeX. For inline mathematics, wrap the expression in single dollar signs ($...$). For block-level or display mathematics, wrap the expression in double dollar signs ($$...$$)."
    };
}

const ANSWER_KEY_PROMPT: &str = "You are an expert at extracting answers from an answer key document. Your task is to extract the question number and the corresponding correct answer from the attached PDF.

The answer key may list answers in various formats (e.g., \"1. A\", \"2. B\", \"3) C\", etc.). Your job is to parse this information accurately. The \"correctAnswer\" should be the letter or the option text itself. For example, if the key says \"1. A) Photosynthesis\", the \"correctAnswer\" can be \"A\" or \"Photosynthesis\". Be consistent across the whole document.

It is critical that you extract ALL answers from the document. Carefully scan every page to ensure no answers are missed.

Your output MUST be a JSON object with a single key \"answers\" that contains an array of objects, each with \"questionNumber\" (number) and \"correctAnswer\" (string). Question numbers start at 1.

Analyze the PDF document and identify the question numbers and their correct answers.";

const EXAM_QUESTIONS_PROMPT: &str = concat!(
    "You are an expert exam question extractor. Your task is to extract exam questions and their multiple-choice options from the attached PDF document. Your output MUST be a JSON object with a single key \"questions\" that contains an array of question objects. Each question object must have \"questionNumber\" (number, starting at 1), \"questionText\" (string), and \"options\" (array of strings).

It is critical that you extract ALL questions from the document. Carefully scan every page to ensure no questions are missed. Do NOT extract the correct answers, only the questions and the options.

",
    latex_rule!(),
    "

Analyze the PDF document and identify the questions, question numbers, and options."
);

const QUIZ_QUESTIONS_PROMPT: &str = concat!(
    "You are an expert quiz question extractor. Your task is to extract quiz questions, answer options, and correct answers from the attached PDF document. Your output MUST be a JSON object with a key \"questions\" that contains an array of question objects, each with \"questionNumber\" (number, starting at 1), \"questionText\" (string), \"options\" (array of strings) and \"correctAnswer\" (string), and a key \"accuracyAssessment\" (string).

It is critical that you extract ALL questions from the document. Carefully scan every page to ensure no questions are missed. Pay close attention to the formatting and structure of the document to accurately extract the information.

",
    latex_rule!(),
    "

Also evaluate the accuracy of the extracted questions and answers and write it as the accuracy assessment."
);

#[cfg(test)]
mod tests {
    use super::*;

    const LATEX_RULE: &str = latex_rule!();

    #[test]
    fn question_prompts_carry_the_latex_rule() {
        assert!(TaskKind::ExamQuestions.prompt().contains(LATEX_RULE));
        assert!(TaskKind::QuizQuestions.prompt().contains(LATEX_RULE));
    }

    #[test]
    fn every_prompt_demands_full_coverage() {
        for kind in TaskKind::ALL {
            let prompt = kind.prompt();
            assert!(prompt.contains("scan every page"), "{kind}");
            assert!(prompt.contains("ALL"), "{kind}");
        }
    }

    #[test]
    fn exam_prompt_forbids_answers() {
        assert!(TaskKind::ExamQuestions.prompt().contains("Do NOT extract the correct answers"));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
        assert!("essay".parse::<TaskKind>().is_err());
    }
}
