use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestResult {
    pub id: String,
    pub test_session_id: String,
    pub test_id: String,
    pub student_id: String,
    pub total_score: f64,
    pub total_possible: f64,
    /// Rounded percentage in [0, 100].
    pub percentage: u32,
    pub grade: Grade,
    pub status: ResultStatus,
    pub answer_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_date: Option<DateTime<Utc>>,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Hash)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Pass,
    Fail,
}

impl TestResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        test_session_id: &str,
        test_id: &str,
        student_id: &str,
        total_score: f64,
        total_possible: f64,
        percentage: u32,
        grade: Grade,
        status: ResultStatus,
        answer_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        TestResult {
            id: Uuid::new_v4().to_string(),
            test_session_id: test_session_id.to_string(),
            test_id: test_id.to_string(),
            student_id: student_id.to_string(),
            total_score,
            total_possible,
            percentage,
            grade,
            status,
            answer_ids,
            feedback: None,
            reviewed_by: None,
            review_date: None,
            published: false,
            published_at: None,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }
}
