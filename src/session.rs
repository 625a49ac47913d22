//! One user's pass through upload → processing → ready → in progress → results.
//!
//! The session owns no I/O. Callers run the extraction themselves between
//! `begin_processing` and `finish_processing`, and pass the clock into
//! anything timed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::{ExtractionError, SessionError};
use crate::schema::QuizDocument;
use crate::scoring::{score, ScoreReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Upload,
    Processing,
    Ready,
    InProgress,
    Results,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "uploading",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::InProgress => "in progress",
            Self::Results => "showing results",
        }
    }
}

/// Whether a run is timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Quiz,
    Exam,
}

/// Countdown for a timed exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamTimer {
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl ExamTimer {
    /// Exams run for two hours unless configured otherwise.
    pub const DEFAULT_DURATION_SECS: i64 = 2 * 60 * 60;

    pub fn default_duration() -> Duration {
        Duration::seconds(Self::DEFAULT_DURATION_SECS)
    }

    pub fn new(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self { started_at, duration }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time left at `now`, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.started_at + self.duration - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) == Duration::zero()
    }

    /// `hh:mm:ss`, hours unbounded.
    pub fn format_hms(duration: Duration) -> String {
        let secs = duration.num_seconds().max(0);
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

impl Default for ExamTimer {
    fn default() -> Self {
        Self::new(Utc::now(), Self::default_duration())
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    phase: SessionPhase,
    mode: SessionMode,
    exam_duration: Duration,
    document: Option<QuizDocument>,
    answers: HashMap<u32, String>,
    timer: Option<ExamTimer>,
    report: Option<ScoreReport>,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Upload,
            mode: SessionMode::Quiz,
            exam_duration: ExamTimer::default_duration(),
            document: None,
            answers: HashMap::new(),
            timer: None,
            report: None,
            error: None,
        }
    }

    pub fn with_exam_duration(mut self, duration: Duration) -> Self {
        self.exam_duration = duration;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn document(&self) -> Option<&QuizDocument> {
        self.document.as_ref()
    }

    pub fn answers(&self) -> &HashMap<u32, String> {
        &self.answers
    }

    pub fn timer(&self) -> Option<&ExamTimer> {
        self.timer.as_ref()
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    /// User-facing message of the last failed extraction.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark an extraction as running. A second submission while one is in
    /// flight is rejected.
    pub fn begin_processing(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Processing => Err(SessionError::AlreadyProcessing),
            SessionPhase::InProgress => Err(self.invalid("upload a document")),
            _ => {
                self.clear();
                self.document = None;
                self.transition(SessionPhase::Processing);
                Ok(())
            }
        }
    }

    /// Record the extraction outcome. Failure returns to upload with the
    /// error's user message.
    pub fn finish_processing(&mut self, result: Result<QuizDocument, ExtractionError>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Processing {
            return Err(self.invalid("finish processing"));
        }
        match result {
            Ok(document) => {
                info!(title = %document.title, questions = document.questions.len(), "Document ready");
                self.document = Some(document);
                self.transition(SessionPhase::Ready);
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.transition(SessionPhase::Upload);
            }
        }
        Ok(())
    }

    /// Open a saved document directly, skipping extraction.
    pub fn load(&mut self, document: QuizDocument) -> Result<(), SessionError> {
        if matches!(self.phase, SessionPhase::Processing | SessionPhase::InProgress) {
            return Err(self.invalid("load a saved document"));
        }
        self.clear();
        self.document = Some(document);
        self.transition(SessionPhase::Ready);
        Ok(())
    }

    /// Begin answering. Exams start their countdown at `now`.
    pub fn start(&mut self, mode: SessionMode, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Ready {
            return Err(self.invalid("start"));
        }
        self.mode = mode;
        self.answers.clear();
        self.timer = match mode {
            SessionMode::Exam => Some(ExamTimer::new(now, self.exam_duration)),
            SessionMode::Quiz => None,
        };
        self.transition(SessionPhase::InProgress);
        Ok(())
    }

    /// Select or change the answer to one question at `now`. An answer after
    /// the exam deadline is refused and the attempt is submitted without it.
    pub fn answer(
        &mut self,
        question_number: u32,
        answer: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Err(self.invalid("answer"));
        }
        if self.tick(now).is_some() {
            return Err(SessionError::TimeExpired);
        }
        let known = self
            .document
            .as_ref()
            .is_some_and(|d| d.question(question_number).is_some());
        if !known {
            return Err(SessionError::UnknownQuestion(question_number));
        }
        self.answers.insert(question_number, answer.into());
        Ok(())
    }

    pub fn submit(&mut self) -> Result<&ScoreReport, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Err(self.invalid("submit"));
        }
        let document = self.document.as_ref().ok_or_else(|| self.invalid("submit"))?;
        let report = score(document, &self.answers);
        info!(correct = report.correct, total = report.total, percentage = report.percentage, "Submitted");
        self.transition(SessionPhase::Results);
        Ok(self.report.insert(report))
    }

    /// Advance the clock. An exam whose time ran out is submitted and its
    /// report returned.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<&ScoreReport> {
        let expired = self.phase == SessionPhase::InProgress && self.timer.is_some_and(|t| t.is_expired(now));
        if !expired {
            return None;
        }
        info!("Exam time expired, submitting");
        self.submit().ok()
    }

    /// Back to upload with everything cleared.
    pub fn restart(&mut self) {
        self.clear();
        self.document = None;
        self.transition(SessionPhase::Upload);
    }

    fn clear(&mut self) {
        self.answers.clear();
        self.timer = None;
        self.report = None;
        self.error = None;
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = self.phase.as_str(), to = next.as_str(), "Session transition");
        self.phase = next;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition { action, phase: self.phase.as_str() }
    }
}
