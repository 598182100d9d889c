use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{Grade, ResultStatus, TestResult},
        dto::response::{
            ComparisonDto, GradeCount, StudentPerformanceDto, TestStatisticsDto,
        },
    },
    repositories::{
        QuestionRepository, ResultFilter, ResultSort, StudentAnswerRepository, TestRepository,
        TestResultRepository, TestSessionRepository,
    },
    services::{notification::Notifier, scoring},
};

/// Finalizes terminal sessions into `TestResult` records and serves the
/// reporting queries built on top of them.
pub struct ResultService {
    results: Arc<dyn TestResultRepository>,
    sessions: Arc<dyn TestSessionRepository>,
    answers: Arc<dyn StudentAnswerRepository>,
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ResultService {
    pub fn new(
        results: Arc<dyn TestResultRepository>,
        sessions: Arc<dyn TestSessionRepository>,
        answers: Arc<dyn StudentAnswerRepository>,
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            results,
            sessions,
            answers,
            tests,
            questions,
            notifier,
            clock,
        }
    }

    /// Scores a terminal session into a result record.
    ///
    /// Idempotent: recalculating a session that already has a result returns
    /// the stored result unchanged instead of creating a duplicate (a unique
    /// index on the session id backs this up).
    pub async fn calculate_result(&self, session_id: &str) -> AppResult<TestResult> {
        let mut session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test session with id '{}' not found", session_id))
            })?;

        if !session.is_terminal() {
            return Err(AppError::InvalidState(
                "Cannot calculate a result for a session that is still in progress".to_string(),
            ));
        }

        if let Some(existing) = self.results.find_by_session(session_id).await? {
            return Ok(existing);
        }

        let test = self
            .tests
            .find_by_id(&session.test_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test with id '{}' not found", session.test_id))
            })?;

        let questions = self.questions.find_by_ids(&test.question_ids).await?;
        let answers = self.answers.find_by_session(session_id).await?;

        let summary = scoring::aggregate(&test, &questions, &answers);
        let now = self.clock.now();

        let result = TestResult::new(
            session_id,
            &test.id,
            &session.student_id,
            summary.total_score,
            summary.total_possible,
            summary.percentage,
            summary.grade,
            summary.status,
            answers.iter().map(|a| a.id.clone()).collect(),
            now,
        );

        let result = self.results.create(result).await?;

        session.result_id = Some(result.id.clone());
        session.modified_at = Some(now);
        self.sessions.update(session).await?;

        log::info!(
            "Test result calculated for session {}: {}% ({:?})",
            session_id,
            result.percentage,
            result.status
        );

        // Mail delivery is best-effort; a failed send never voids the result.
        if let Err(err) = self
            .notifier
            .send_result_email(&result.student_id, &result)
            .await
        {
            log::warn!(
                "Failed to send result email for session {}: {}",
                session_id,
                err
            );
        }

        Ok(result)
    }

    pub async fn get_result(&self, id: &str) -> AppResult<TestResult> {
        self.results
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test result with id '{}' not found", id)))
    }

    pub async fn get_result_by_session(&self, session_id: &str) -> AppResult<TestResult> {
        self.results
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No result exists for session '{}'", session_id))
            })
    }

    pub async fn list_results(
        &self,
        filter: ResultFilter,
        sort: ResultSort,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestResult>, i64)> {
        self.results
            .list(filter, sort, descending, offset, limit)
            .await
    }

    pub async fn recent_results(
        &self,
        student_id: Option<&str>,
        test_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<TestResult>> {
        let filter = ResultFilter {
            student_id: student_id.map(|s| s.to_string()),
            test_id: test_id.map(|t| t.to_string()),
            ..Default::default()
        };
        let (results, _) = self
            .results
            .list(filter, ResultSort::CreatedAt, true, 0, limit)
            .await?;
        Ok(results)
    }

    /// Positions one student's result against the rest of the class.
    /// Percentile does not penalize ties: only strictly higher scores count
    /// as "above".
    pub async fn comparison(&self, test_id: &str, student_id: &str) -> AppResult<ComparisonDto> {
        let student_result = self
            .results
            .find_by_test_and_student(test_id, student_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No result for student '{}' on test '{}'",
                    student_id, test_id
                ))
            })?;

        let all = self.results.find_by_test(test_id).await?;
        let scores: Vec<u32> = all.iter().map(|r| r.percentage).collect();

        let class_average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64
        };
        let class_high = scores.iter().copied().max().unwrap_or(0);
        let class_low = scores.iter().copied().min().unwrap_or(0);

        let above = scores
            .iter()
            .filter(|s| **s > student_result.percentage)
            .count();
        let percentile = 100.0 - (above as f64 / scores.len().max(1) as f64 * 100.0);

        Ok(ComparisonDto {
            student_score: student_result.percentage,
            class_average,
            class_high,
            class_low,
            percentile,
        })
    }

    pub async fn statistics(&self, test_id: &str) -> AppResult<TestStatisticsDto> {
        let results = self.results.find_by_test(test_id).await?;

        let pass_count = results
            .iter()
            .filter(|r| r.status == ResultStatus::Pass)
            .count();
        let fail_count = results.len() - pass_count;
        let average_percentage = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.percentage as f64).sum::<f64>() / results.len() as f64
        };

        let mut counts: HashMap<Grade, usize> = HashMap::new();
        for result in &results {
            *counts.entry(result.grade).or_insert(0) += 1;
        }
        let grade_distribution = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F]
            .into_iter()
            .map(|grade| GradeCount {
                grade: grade.as_str(),
                count: counts.get(&grade).copied().unwrap_or(0),
            })
            .collect();

        Ok(TestStatisticsDto {
            total_results: results.len(),
            pass_count,
            fail_count,
            average_percentage,
            grade_distribution,
        })
    }

    /// Per-student aggregate across every test, with a least-squares slope of
    /// percentage over attempt order as a rough improvement signal.
    pub async fn student_performance(&self, student_id: &str) -> AppResult<StudentPerformanceDto> {
        let results = self.results.find_by_student(student_id).await?;

        let passed_tests = results
            .iter()
            .filter(|r| r.status == ResultStatus::Pass)
            .count();
        let failed_tests = results.len() - passed_tests;
        let average_percentage = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.percentage as f64).sum::<f64>() / results.len() as f64
        };

        let improvement_trend = if results.len() > 1 {
            let n = results.len() as f64;
            let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
            for (index, result) in results.iter().enumerate() {
                let x = index as f64;
                let y = result.percentage as f64;
                sum_x += x;
                sum_y += y;
                sum_xy += x * y;
                sum_x2 += x * x;
            }
            (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x)
        } else {
            0.0
        };

        Ok(StudentPerformanceDto {
            total_tests: results.len(),
            passed_tests,
            failed_tests,
            average_percentage,
            improvement_trend,
        })
    }

    /// Review metadata is the only thing mutable on a finalized result.
    pub async fn add_feedback(
        &self,
        result_id: &str,
        feedback: &str,
        reviewed_by: &str,
    ) -> AppResult<TestResult> {
        let mut result = self.get_result(result_id).await?;
        let now = self.clock.now();

        result.feedback = Some(feedback.to_string());
        result.reviewed_by = Some(reviewed_by.to_string());
        result.review_date = Some(now);
        result.modified_at = Some(now);

        let result = self.results.update(result).await?;
        log::info!("Feedback added to test result {}", result_id);
        Ok(result)
    }

    pub async fn publish_result(&self, result_id: &str) -> AppResult<TestResult> {
        let mut result = self.get_result(result_id).await?;
        let now = self.clock.now();

        result.published = true;
        result.published_at = Some(now);
        result.modified_at = Some(now);

        let result = self.results.update(result).await?;
        log::info!("Test result {} published", result_id);
        Ok(result)
    }

    /// CSV export of a filtered result set, ready for a spreadsheet.
    pub async fn export_csv(&self, filter: ResultFilter) -> AppResult<String> {
        let (results, _) = self
            .results
            .list(filter, ResultSort::CreatedAt, true, 0, 10_000)
            .await?;

        let mut csv =
            String::from("Test,Student,Score,Possible,Percentage,Grade,Status,Feedback\n");
        for result in results {
            let status = match result.status {
                ResultStatus::Pass => "pass",
                ResultStatus::Fail => "fail",
            };
            csv.push_str(&format!(
                "\"{}\",\"{}\",{},{},{},\"{}\",\"{}\",\"{}\"\n",
                result.test_id,
                result.student_id,
                result.total_score,
                result.total_possible,
                result.percentage,
                result.grade.as_str(),
                status,
                result.feedback.unwrap_or_default().replace('"', "\"\""),
            ));
        }

        Ok(csv)
    }
}
