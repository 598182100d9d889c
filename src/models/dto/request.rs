use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::domain::{AnswerValue, Difficulty, QuestionKind, SecurityEventType, Severity};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    #[validate(range(min = 1))]
    pub points: u32,

    #[serde(default)]
    pub difficulty: Difficulty,

    pub kind: QuestionKind,

    #[validate(length(min = 1, max = 100))]
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub subject: String,

    #[validate(length(min = 1, max = 100))]
    pub instructor_id: String,

    #[validate(range(min = 1))]
    pub duration_minutes: i64,

    #[validate(range(min = 1, max = 100))]
    pub passing_score: u32,

    #[validate(range(min = 1))]
    pub max_attempts: u32,

    #[validate(range(min = 0))]
    pub grace_period_minutes: i64,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, Default)]
pub struct UpdateTestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,

    #[validate(range(min = 1))]
    pub duration_minutes: Option<i64>,

    #[validate(range(min = 1, max = 100))]
    pub passing_score: Option<u32>,

    #[validate(range(min = 1))]
    pub max_attempts: Option<u32>,

    #[validate(range(min = 0))]
    pub grace_period_minutes: Option<i64>,

    pub shuffle_questions: Option<bool>,
    pub allow_review: Option<bool>,
    pub negative_marking: Option<bool>,
    pub negative_marking_value: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 100))]
    pub test_id: String,

    #[validate(length(min = 1, max = 100))]
    pub student_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 100))]
    pub question_id: String,

    pub answer: AnswerValue,

    #[serde(default)]
    pub time_spent_seconds: u32,

    #[serde(default)]
    pub marked_for_review: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtendSessionRequest {
    #[validate(range(min = 1, max = 480))]
    pub minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordSecurityEventRequest {
    pub event_type: SecurityEventType,

    #[serde(default)]
    pub severity: Severity,

    #[validate(length(min = 1, max = 1000))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddFeedbackRequest {
    #[validate(length(min = 1, max = 5000))]
    pub feedback: String,

    #[validate(length(min = 1, max = 100))]
    pub reviewed_by: String,
}
