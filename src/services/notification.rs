use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    errors::AppResult,
    models::domain::{Test, TestResult},
};

/// Outbound mail hooks invoked after terminal transitions. Delivery is an
/// external concern; callers treat failures as non-fatal and log-and-continue.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_result_email(&self, student_id: &str, result: &TestResult) -> AppResult<()>;
    async fn send_invitation_email(&self, student_id: &str, test: &Test) -> AppResult<()>;
}

/// Default notifier: records the notification in the log and nothing else.
/// Stands in for a real mail transport in every environment without one.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_result_email(&self, student_id: &str, result: &TestResult) -> AppResult<()> {
        log::info!(
            "Result email for student {}: test {} scored {}% ({})",
            student_id,
            result.test_id,
            result.percentage,
            result.grade.as_str()
        );
        Ok(())
    }

    async fn send_invitation_email(&self, student_id: &str, test: &Test) -> AppResult<()> {
        log::info!(
            "Invitation email for student {}: test '{}' opens {}",
            student_id,
            test.title,
            test.start_date
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{Grade, ResultStatus};
    use chrono::Utc;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier;
        let result = TestResult::new(
            "session-1",
            "test-1",
            "student-1",
            4.0,
            4.0,
            100,
            Grade::A,
            ResultStatus::Pass,
            vec![],
            Utc::now(),
        );

        assert!(notifier
            .send_result_email("student-1", &result)
            .await
            .is_ok());
    }
}
