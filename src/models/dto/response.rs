use serde::Serialize;

use crate::models::domain::{ResultStatus, TestResult};

/// Finalized outcome as shown to the student.
#[derive(Debug, Clone, Serialize)]
pub struct TestResultDto {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub total_score: f64,
    pub total_possible: f64,
    pub percentage: u32,
    pub grade: &'static str,
    pub status: ResultStatus,
    pub feedback: Option<String>,
    pub published: bool,
}

impl From<TestResult> for TestResultDto {
    fn from(result: TestResult) -> Self {
        TestResultDto {
            id: result.id,
            test_id: result.test_id,
            student_id: result.student_id,
            total_score: result.total_score,
            total_possible: result.total_possible,
            percentage: result.percentage,
            grade: result.grade.as_str(),
            status: result.status,
            feedback: result.feedback,
            published: result.published,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionProgressDto {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityDto {
    pub can_take_test: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonDto {
    pub student_score: u32,
    pub class_average: f64,
    pub class_high: u32,
    pub class_low: u32,
    pub percentile: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestStatisticsDto {
    pub total_results: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub average_percentage: f64,
    pub grade_distribution: Vec<GradeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeCount {
    pub grade: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentPerformanceDto {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub average_percentage: f64,
    /// Slope of percentage over attempt index; positive means improving.
    pub improvement_trend: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcomeDto {
    pub expired_sessions: u64,
}
