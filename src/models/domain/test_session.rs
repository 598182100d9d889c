use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::test::Test;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestSession {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub current_question: u32,
    pub attempt_number: u32,
    /// Minutes granted on top of the test duration by `extend`.
    pub extra_time_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Submitted,
    Expired,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Expired => "expired",
        }
    }
}

/// Countdown snapshot derived from the clock on every read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub minutes: i64,
    pub seconds: i64,
    pub expired: bool,
}

impl TestSession {
    pub fn start(test: &Test, student_id: &str, attempt_number: u32, now: DateTime<Utc>) -> Self {
        TestSession {
            id: Uuid::new_v4().to_string(),
            test_id: test.id.clone(),
            student_id: student_id.to_string(),
            start_time: now,
            end_time: None,
            status: SessionStatus::InProgress,
            current_question: 0,
            attempt_number,
            extra_time_minutes: 0,
            result_id: None,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Answers are accepted until this instant.
    pub fn answer_deadline(&self, test: &Test) -> DateTime<Utc> {
        self.start_time + test.duration() + chrono::Duration::minutes(self.extra_time_minutes)
    }

    /// After the answer deadline the student can still turn the test in until
    /// this instant; past it the session is forcibly expired.
    pub fn expiry_deadline(&self, test: &Test) -> DateTime<Utc> {
        self.answer_deadline(test) + test.grace_period()
    }

    pub fn time_remaining(&self, test: &Test, now: DateTime<Utc>) -> TimeRemaining {
        let deadline = self.answer_deadline(test);

        if self.is_terminal() || now >= deadline {
            return TimeRemaining {
                minutes: 0,
                seconds: 0,
                expired: true,
            };
        }

        let remaining = deadline - now;
        TimeRemaining {
            minutes: remaining.num_minutes(),
            seconds: remaining.num_seconds() % 60,
            expired: false,
        }
    }
}
