use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{
            Question, SessionStatus, StudentAnswer, Test, TestSession, TimeRemaining,
        },
        dto::{request::SubmitAnswerRequest, response::SessionProgressDto},
    },
    repositories::{
        QuestionRepository, StudentAnswerRepository, TestRepository, TestSessionRepository,
    },
    services::scoring,
};

/// How a session was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndKind {
    /// Student turned the test in.
    Submit,
    /// Instructor or system closed the session.
    Complete,
}

/// The test-session state machine. One in-progress session per
/// (student, test) pair; all transitions out of `in-progress` are terminal.
///
/// There is no background expiry job: deadlines are re-checked from the
/// injected clock on every interaction, so an untouched overdue session stays
/// `in-progress` in storage until the next access (or an explicit sweep).
pub struct SessionService {
    sessions: Arc<dyn TestSessionRepository>,
    answers: Arc<dyn StudentAnswerRepository>,
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn TestSessionRepository>,
        answers: Arc<dyn StudentAnswerRepository>,
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            answers,
            tests,
            questions,
            clock,
        }
    }

    pub async fn get_session(&self, id: &str) -> AppResult<TestSession> {
        self.sessions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test session with id '{}' not found", id)))
    }

    async fn get_test(&self, id: &str) -> AppResult<Test> {
        self.tests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test with id '{}' not found", id)))
    }

    /// Starts a new attempt for (student, test).
    ///
    /// Fails with `Eligibility` when the test window is closed, an attempt is
    /// still in progress, or the attempt limit is used up.
    pub async fn start_session(&self, test_id: &str, student_id: &str) -> AppResult<TestSession> {
        let test = self.get_test(test_id).await?;
        let now = self.clock.now();

        if !test.is_available_at(now) {
            return Err(AppError::Eligibility(format!(
                "Test '{}' is not open for attempts right now",
                test.title
            )));
        }

        let prior = self
            .reap_overdue(
                self.sessions
                    .find_by_student_and_test(student_id, test_id)
                    .await?,
                &test,
                now,
            )
            .await?;

        if prior.iter().any(|s| !s.is_terminal()) {
            return Err(AppError::Eligibility(
                "A previous attempt is still in progress".to_string(),
            ));
        }

        let attempts_used = prior.len() as u32;
        if attempts_used >= test.max_attempts {
            return Err(AppError::Eligibility(format!(
                "You have already used all {} attempts",
                test.max_attempts
            )));
        }

        let session = TestSession::start(&test, student_id, attempts_used + 1, now);
        let session = self.sessions.create(session).await?;

        log::info!(
            "Test session created: {} (test {}, student {}, attempt {})",
            session.id,
            test_id,
            student_id,
            session.attempt_number
        );

        Ok(session)
    }

    /// Stores (or replaces) the student's answer for one question and
    /// pre-scores it when the question has an answer key.
    ///
    /// Once the answer deadline has passed the session is transitioned to
    /// `expired` as a side effect and `SessionExpired` is returned.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        request: SubmitAnswerRequest,
    ) -> AppResult<StudentAnswer> {
        let mut session = self.get_session(session_id).await?;

        if session.status == SessionStatus::Expired {
            return Err(AppError::SessionExpired(
                "Time is up; the session has been expired".to_string(),
            ));
        }
        if session.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Session is already {}",
                session.status.as_str()
            )));
        }

        let test = self.get_test(&session.test_id).await?;
        let now = self.clock.now();

        if now >= session.answer_deadline(&test) {
            self.expire(&mut session, now).await?;
            return Err(AppError::SessionExpired(
                "Time is up; the session has been expired".to_string(),
            ));
        }

        let position = test
            .question_ids
            .iter()
            .position(|id| id == &request.question_id)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Question '{}' is not part of this test",
                    request.question_id
                ))
            })?;

        let mut answer = StudentAnswer::new(
            session_id,
            &request.question_id,
            request.answer,
            request.time_spent_seconds,
            request.marked_for_review,
            now,
        );

        // Pre-score key-based questions so reviews and partial results do not
        // wait on finalization. Externally scored types stay ungraded.
        if let Some(question) = self.questions.find_by_id(&request.question_id).await? {
            if !question.is_externally_scored() {
                let earned = scoring::score_answer(&question, &answer);
                answer.score = Some(earned);
                answer.is_correct = Some(earned >= question.points as f64);
            }
        }

        let answer = self.answers.upsert(answer).await?;

        session.current_question = position as u32;
        session.modified_at = Some(now);
        self.sessions.update(session).await?;

        Ok(answer)
    }

    /// Countdown to the answer deadline, re-derived from the clock.
    pub async fn time_remaining(&self, session_id: &str) -> AppResult<TimeRemaining> {
        let session = self.get_session(session_id).await?;
        let test = self.get_test(&session.test_id).await?;
        Ok(session.time_remaining(&test, self.clock.now()))
    }

    /// Terminates a session. Idempotent: ending an already-terminal session
    /// returns it unchanged.
    ///
    /// A student submission after the answer deadline but inside the grace
    /// window still counts as `submitted`; past the grace window it lands as
    /// `expired`. An instructor/system end always records `completed`.
    pub async fn end_session(&self, session_id: &str, kind: EndKind) -> AppResult<TestSession> {
        let mut session = self.get_session(session_id).await?;

        if session.is_terminal() {
            return Ok(session);
        }

        let test = self.get_test(&session.test_id).await?;
        let now = self.clock.now();

        session.status = match kind {
            EndKind::Complete => SessionStatus::Completed,
            EndKind::Submit => {
                if now < session.expiry_deadline(&test) {
                    SessionStatus::Submitted
                } else {
                    SessionStatus::Expired
                }
            }
        };
        session.end_time = Some(now);
        session.modified_at = Some(now);

        let session = self.sessions.update(session).await?;
        log::info!(
            "Test session {} ended as {}",
            session.id,
            session.status.as_str()
        );

        Ok(session)
    }

    /// Grants extra minutes on a running session. Terminal sessions cannot be
    /// extended.
    pub async fn extend_session(&self, session_id: &str, minutes: i64) -> AppResult<TestSession> {
        if minutes <= 0 {
            return Err(AppError::ValidationError(
                "Extension must be a positive number of minutes".to_string(),
            ));
        }

        let mut session = self.get_session(session_id).await?;

        if session.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Cannot extend a session that is already {}",
                session.status.as_str()
            )));
        }

        session.extra_time_minutes += minutes;
        session.modified_at = Some(self.clock.now());

        let session = self.sessions.update(session).await?;
        log::info!(
            "Test session {} extended by {} minutes",
            session.id,
            minutes
        );

        Ok(session)
    }

    /// Re-attempt eligibility: no running session, and terminal attempts
    /// below the test's limit.
    pub async fn can_student_take_test(&self, student_id: &str, test_id: &str) -> AppResult<bool> {
        let test = self.get_test(test_id).await?;
        let now = self.clock.now();

        let sessions = self
            .reap_overdue(
                self.sessions
                    .find_by_student_and_test(student_id, test_id)
                    .await?,
                &test,
                now,
            )
            .await?;

        if sessions.iter().any(|s| !s.is_terminal()) {
            return Ok(false);
        }

        Ok((sessions.len() as u32) < test.max_attempts)
    }

    pub async fn get_progress(&self, session_id: &str) -> AppResult<SessionProgressDto> {
        let session = self.get_session(session_id).await?;
        let test = self.get_test(&session.test_id).await?;
        let answers = self.answers.find_by_session(session_id).await?;

        let total_questions = test.question_ids.len();
        let answered_questions = answers.len();
        let percentage = if total_questions > 0 {
            ((answered_questions as f64 / total_questions as f64) * 100.0).round() as u32
        } else {
            0
        };

        Ok(SessionProgressDto {
            total_questions,
            answered_questions,
            percentage,
        })
    }

    /// Question order as served to one student: shuffled when the test asks
    /// for it, the authored order otherwise.
    pub async fn questions_for_delivery(&self, session_id: &str) -> AppResult<Vec<Question>> {
        let session = self.get_session(session_id).await?;
        let test = self.get_test(&session.test_id).await?;
        let mut questions = self.questions.find_by_ids(&test.question_ids).await?;

        // find_by_ids has no order guarantee; restore the authored order first.
        questions.sort_by_key(|q| {
            test.question_ids
                .iter()
                .position(|id| id == &q.id)
                .unwrap_or(usize::MAX)
        });

        if test.shuffle_questions {
            use rand::seq::SliceRandom;
            questions.shuffle(&mut rand::thread_rng());
        }

        Ok(questions)
    }

    /// Explicit maintenance sweep: expires every in-progress session whose
    /// grace window has elapsed. Invoked by an operator endpoint, not a timer.
    pub async fn expire_overdue_sessions(&self) -> AppResult<u64> {
        let now = self.clock.now();
        let mut expired = 0u64;

        for session in self.sessions.find_in_progress().await? {
            let test = match self.tests.find_by_id(&session.test_id).await? {
                Some(test) => test,
                None => {
                    log::warn!(
                        "Session {} references missing test {}; skipping",
                        session.id,
                        session.test_id
                    );
                    continue;
                }
            };

            if now >= session.expiry_deadline(&test) {
                let mut session = session;
                self.expire(&mut session, now).await?;
                expired += 1;
            }
        }

        if expired > 0 {
            log::info!("Expired {} overdue test sessions", expired);
        }

        Ok(expired)
    }

    async fn expire(&self, session: &mut TestSession, now: DateTime<Utc>) -> AppResult<()> {
        session.status = SessionStatus::Expired;
        session.end_time = Some(now);
        session.modified_at = Some(now);
        self.sessions.update(session.clone()).await?;
        log::info!("Test session {} expired", session.id);
        Ok(())
    }

    /// Lazy expiry applied to a batch of sessions read for an eligibility
    /// decision: anything past its grace window flips to `expired` before the
    /// decision is made.
    async fn reap_overdue(
        &self,
        sessions: Vec<TestSession>,
        test: &Test,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TestSession>> {
        let mut out = Vec::with_capacity(sessions.len());
        for mut session in sessions {
            if !session.is_terminal() && now >= session.expiry_deadline(test) {
                self.expire(&mut session, now).await?;
            }
            out.push(session);
        }
        Ok(out)
    }
}
