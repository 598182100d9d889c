use std::sync::Arc;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::domain::{AnswerValue, QuestionKind, StudentAnswer},
    repositories::{QuestionRepository, StudentAnswerRepository, TestSessionRepository},
    services::essay_scorer::{EssayScorer, EssayScoringRequest},
};

/// Applies external scores to answers the scoring engine cannot grade from an
/// answer key: essays (model- or instructor-graded) and image-recognition
/// (instructor-graded).
///
/// Grading must land before the session's result is calculated; once a result
/// exists the stored outcome would no longer reflect the answer, so further
/// grading is rejected.
pub struct GradingService {
    answers: Arc<dyn StudentAnswerRepository>,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn TestSessionRepository>,
    scorer: Arc<dyn EssayScorer>,
    clock: Arc<dyn Clock>,
}

impl GradingService {
    pub fn new(
        answers: Arc<dyn StudentAnswerRepository>,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn TestSessionRepository>,
        scorer: Arc<dyn EssayScorer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            answers,
            questions,
            sessions,
            scorer,
            clock,
        }
    }

    async fn gradable_answer(
        &self,
        session_id: &str,
        question_id: &str,
    ) -> AppResult<StudentAnswer> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test session with id '{}' not found", session_id))
            })?;

        if session.result_id.is_some() {
            return Err(AppError::InvalidState(
                "Session already has a finalized result; its answers can no longer be graded"
                    .to_string(),
            ));
        }

        self.answers
            .find_by_session_and_question(session_id, question_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No answer for question '{}' in session '{}'",
                    question_id, session_id
                ))
            })
    }

    /// Scores one essay answer with the configured scorer (remote model with
    /// heuristic fallback) and stores score plus feedback on the answer.
    pub async fn grade_essay_answer(
        &self,
        session_id: &str,
        question_id: &str,
    ) -> AppResult<StudentAnswer> {
        let mut answer = self.gradable_answer(session_id, question_id).await?;

        let question = self
            .questions
            .find_by_id(question_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Question with id '{}' not found", question_id))
            })?;

        let (rubric, model_answer) = match &question.kind {
            QuestionKind::Essay {
                rubric,
                model_answer,
                ..
            } => (rubric.clone(), model_answer.clone()),
            _ => {
                return Err(AppError::ValidationError(
                    "Only essay questions can be graded by the essay scorer".to_string(),
                ))
            }
        };

        let essay_text = match &answer.answer {
            AnswerValue::Text(text) => text.clone(),
            _ => {
                return Err(AppError::ValidationError(
                    "Essay answer must be text".to_string(),
                ))
            }
        };

        let scored = self
            .scorer
            .score_essay(EssayScoringRequest {
                essay_text,
                question_text: question.text.clone(),
                rubric,
                model_answer,
                max_score: question.points as f64,
            })
            .await?;

        answer.score = Some(scored.score.clamp(0.0, question.points as f64));
        answer.feedback = Some(scored.feedback);
        answer.modified_at = Some(self.clock.now());

        let answer = self.answers.update_grading(answer).await?;
        log::info!(
            "Essay answer graded for session {} question {}: {} (confidence {})",
            session_id,
            question_id,
            answer.score.unwrap_or(0.0),
            scored.confidence
        );

        Ok(answer)
    }

    /// Records an instructor-assigned score on an externally scored answer
    /// (essay or image-recognition).
    pub async fn record_manual_score(
        &self,
        session_id: &str,
        question_id: &str,
        score: f64,
        feedback: Option<String>,
    ) -> AppResult<StudentAnswer> {
        let mut answer = self.gradable_answer(session_id, question_id).await?;

        let question = self
            .questions
            .find_by_id(question_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Question with id '{}' not found", question_id))
            })?;

        if !question.is_externally_scored() {
            return Err(AppError::ValidationError(format!(
                "{} questions are scored automatically",
                question.type_label()
            )));
        }

        let max = question.points as f64;
        if !(0.0..=max).contains(&score) {
            return Err(AppError::ValidationError(format!(
                "Score must be between 0 and {}",
                max
            )));
        }

        answer.score = Some(score);
        answer.feedback = feedback;
        answer.modified_at = Some(self.clock.now());

        let answer = self.answers.update_grading(answer).await?;
        log::info!(
            "Manual score recorded for session {} question {}: {}",
            session_id,
            question_id,
            score
        );

        Ok(answer)
    }
}
