use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A proctoring signal reported by the client during a session. Events are
/// recorded for instructor review; they never alter session state.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SecurityEvent {
    pub id: String,
    pub test_session_id: String,
    pub student_id: String,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityEventType {
    TabSwitch,
    CopyPaste,
    Screenshot,
    WindowFocusLoss,
    MultipleTabs,
    DeveloperTools,
    SuspiciousPattern,
    IpChange,
    UnauthorizedAccess,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Default, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl SecurityEvent {
    pub fn new(
        test_session_id: &str,
        student_id: &str,
        event_type: SecurityEventType,
        severity: Severity,
        description: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        SecurityEvent {
            id: Uuid::new_v4().to_string(),
            test_session_id: test_session_id.to_string(),
            student_id: student_id.to_string(),
            event_type,
            severity,
            description: description.to_string(),
            timestamp,
            resolved: false,
            resolved_by: None,
            resolution_notes: None,
            created_at: Some(timestamp),
        }
    }
}
