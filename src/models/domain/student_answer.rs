use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::MatchingPair;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StudentAnswer {
    pub id: String,
    pub test_session_id: String,
    pub question_id: String,
    pub answer: AnswerValue,
    /// Set by pre-scoring; `None` for answers awaiting external grading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Partial points earned. For essay and image-recognition answers this is
    /// written by a grader, not computed from an answer key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub time_spent_seconds: u32,
    pub marked_for_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// What a student actually submitted. Untagged: a bare string, a list of
/// selections, or a list of left/right pairs.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Selections(Vec<String>),
    Pairs(Vec<MatchingPair>),
}

impl StudentAnswer {
    pub fn new(
        test_session_id: &str,
        question_id: &str,
        answer: AnswerValue,
        time_spent_seconds: u32,
        marked_for_review: bool,
        now: DateTime<Utc>,
    ) -> Self {
        StudentAnswer {
            id: Uuid::new_v4().to_string(),
            test_session_id: test_session_id.to_string(),
            question_id: question_id.to_string(),
            answer,
            is_correct: None,
            score: None,
            feedback: None,
            time_spent_seconds,
            marked_for_review,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }
}
