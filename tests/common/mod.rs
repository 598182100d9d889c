#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::RwLock;

use provetta_server::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::domain::{
        ChoiceKey, Difficulty, Question, QuestionKind, SecurityEvent, StudentAnswer, Test,
        TestDraft, TestResult, TestSession, TestStatus,
    },
    repositories::{
        QuestionRepository, ResultFilter, ResultSort, SecurityEventRepository,
        StudentAnswerRepository, TestRepository, TestResultRepository, TestSessionRepository,
    },
    services::{
        EssayScore, EssayScorer, EssayScoringRequest, GradingService, Notifier, ResultService,
        SecurityService, SessionService, TestService,
    },
};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Settable clock so tests can move through a session's lifetime without
/// sleeping.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<HashMap<String, Question>>,
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        let mut questions = self.questions.write().await;
        if questions.contains_key(&question.id) {
            return Err(AppError::AlreadyExists(format!(
                "Question with id '{}' already exists",
                question.id
            )));
        }
        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        Ok(self.questions.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Question>> {
        let questions = self.questions.read().await;
        Ok(ids.iter().filter_map(|id| questions.get(id).cloned()).collect())
    }

    async fn update(&self, question: Question) -> AppResult<Question> {
        let mut questions = self.questions.write().await;
        if !questions.contains_key(&question.id) {
            return Err(AppError::NotFound(format!(
                "Question with id '{}' not found",
                question.id
            )));
        }
        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        if self.questions.write().await.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Question with id '{}' not found",
                id
            )));
        }
        Ok(())
    }

    async fn list_by_creator(
        &self,
        created_by: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Question>, i64)> {
        let questions = self.questions.read().await;
        let mut items: Vec<_> = questions
            .values()
            .filter(|q| q.created_by == created_by)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(paginate(items, offset, limit))
    }
}

#[derive(Default)]
pub struct InMemoryTestRepository {
    tests: RwLock<HashMap<String, Test>>,
}

#[async_trait]
impl TestRepository for InMemoryTestRepository {
    async fn create(&self, test: Test) -> AppResult<Test> {
        let mut tests = self.tests.write().await;
        if tests.contains_key(&test.id) {
            return Err(AppError::AlreadyExists(format!(
                "Test with id '{}' already exists",
                test.id
            )));
        }
        tests.insert(test.id.clone(), test.clone());
        Ok(test)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Test>> {
        Ok(self.tests.read().await.get(id).cloned())
    }

    async fn update(&self, test: Test) -> AppResult<Test> {
        let mut tests = self.tests.write().await;
        if !tests.contains_key(&test.id) {
            return Err(AppError::NotFound(format!(
                "Test with id '{}' not found",
                test.id
            )));
        }
        tests.insert(test.id.clone(), test.clone());
        Ok(test)
    }

    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Test>, i64)> {
        let tests = self.tests.read().await;
        let mut items: Vec<_> = tests.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(paginate(items, offset, limit))
    }

    async fn list_by_status(
        &self,
        status: TestStatus,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        let tests = self.tests.read().await;
        let mut items: Vec<_> = tests
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(paginate(items, offset, limit))
    }

    async fn list_by_instructor(
        &self,
        instructor_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        let tests = self.tests.read().await;
        let mut items: Vec<_> = tests
            .values()
            .filter(|t| t.instructor_id == instructor_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(paginate(items, offset, limit))
    }

    async fn is_question_in_published_test(&self, question_id: &str) -> AppResult<bool> {
        let tests = self.tests.read().await;
        Ok(tests.values().any(|t| {
            t.status == TestStatus::Published && t.question_ids.iter().any(|id| id == question_id)
        }))
    }
}

#[derive(Default)]
pub struct InMemoryTestSessionRepository {
    sessions: RwLock<HashMap<String, TestSession>>,
}

#[async_trait]
impl TestSessionRepository for InMemoryTestSessionRepository {
    async fn create(&self, session: TestSession) -> AppResult<TestSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(AppError::AlreadyExists(format!(
                "Session with id '{}' already exists",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, session: TestSession) -> AppResult<TestSession> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(AppError::NotFound(format!(
                "Session with id '{}' not found",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_student_and_test(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Vec<TestSession>> {
        let sessions = self.sessions.read().await;
        let mut items: Vec<_> = sessions
            .values()
            .filter(|s| s.student_id == student_id && s.test_id == test_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.attempt_number.cmp(&a.attempt_number));
        Ok(items)
    }

    async fn count_by_student_and_test(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<usize> {
        Ok(self
            .find_by_student_and_test(student_id, test_id)
            .await?
            .len())
    }

    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.test_id == test_id)
            .cloned()
            .collect())
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn find_in_progress(&self) -> AppResult<Vec<TestSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| !s.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryStudentAnswerRepository {
    // Keyed by (session id, question id), mirroring the store's unique index.
    answers: RwLock<HashMap<(String, String), StudentAnswer>>,
}

#[async_trait]
impl StudentAnswerRepository for InMemoryStudentAnswerRepository {
    async fn upsert(&self, answer: StudentAnswer) -> AppResult<StudentAnswer> {
        let mut answers = self.answers.write().await;
        let key = (answer.test_session_id.clone(), answer.question_id.clone());

        let stored = match answers.get(&key) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.answer = answer.answer;
                updated.time_spent_seconds = answer.time_spent_seconds;
                updated.marked_for_review = answer.marked_for_review;
                updated.is_correct = answer.is_correct;
                updated.score = answer.score;
                updated.modified_at = answer.modified_at;
                updated
            }
            None => answer,
        };

        answers.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<StudentAnswer>> {
        let answers = self.answers.read().await;
        Ok(answers.values().find(|a| a.id == id).cloned())
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<StudentAnswer>> {
        let answers = self.answers.read().await;
        let mut items: Vec<_> = answers
            .values()
            .filter(|a| a.test_session_id == test_session_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(items)
    }

    async fn find_by_session_and_question(
        &self,
        test_session_id: &str,
        question_id: &str,
    ) -> AppResult<Option<StudentAnswer>> {
        let answers = self.answers.read().await;
        Ok(answers
            .get(&(test_session_id.to_string(), question_id.to_string()))
            .cloned())
    }

    async fn update_grading(&self, answer: StudentAnswer) -> AppResult<StudentAnswer> {
        let mut answers = self.answers.write().await;
        let key = (answer.test_session_id.clone(), answer.question_id.clone());
        let existing = answers.get_mut(&key).ok_or_else(|| {
            AppError::NotFound(format!("Answer with id '{}' not found", answer.id))
        })?;

        existing.score = answer.score;
        existing.is_correct = answer.is_correct;
        existing.feedback = answer.feedback.clone();
        existing.modified_at = answer.modified_at;

        Ok(existing.clone())
    }
}

#[derive(Default)]
pub struct InMemoryTestResultRepository {
    results: RwLock<HashMap<String, TestResult>>,
}

#[async_trait]
impl TestResultRepository for InMemoryTestResultRepository {
    async fn create(&self, result: TestResult) -> AppResult<TestResult> {
        let mut results = self.results.write().await;
        // The store enforces one result per session with a unique index.
        if results
            .values()
            .any(|r| r.test_session_id == result.test_session_id)
        {
            return Err(AppError::AlreadyExists(format!(
                "A result already exists for session '{}'",
                result.test_session_id
            )));
        }
        results.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestResult>> {
        Ok(self.results.read().await.get(id).cloned())
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Option<TestResult>> {
        let results = self.results.read().await;
        Ok(results
            .values()
            .find(|r| r.test_session_id == test_session_id)
            .cloned())
    }

    async fn find_by_test(&self, test_id: &str) -> AppResult<Vec<TestResult>> {
        let results = self.results.read().await;
        Ok(results
            .values()
            .filter(|r| r.test_id == test_id)
            .cloned()
            .collect())
    }

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> AppResult<Option<TestResult>> {
        let results = self.results.read().await;
        Ok(results
            .values()
            .find(|r| r.test_id == test_id && r.student_id == student_id)
            .cloned())
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<TestResult>> {
        let results = self.results.read().await;
        let mut items: Vec<_> = results
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by_key(|r| r.created_at);
        Ok(items)
    }

    async fn update(&self, result: TestResult) -> AppResult<TestResult> {
        let mut results = self.results.write().await;
        if !results.contains_key(&result.id) {
            return Err(AppError::NotFound(format!(
                "Result with id '{}' not found",
                result.id
            )));
        }
        results.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn list(
        &self,
        filter: ResultFilter,
        sort: ResultSort,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<TestResult>, i64)> {
        let results = self.results.read().await;
        let mut items: Vec<_> = results
            .values()
            .filter(|r| {
                filter.test_id.as_ref().map_or(true, |t| &r.test_id == t)
                    && filter
                        .student_id
                        .as_ref()
                        .map_or(true, |s| &r.student_id == s)
                    && filter.status.as_ref().map_or(true, |s| {
                        let status = match r.status {
                            provetta_server::models::domain::ResultStatus::Pass => "pass",
                            provetta_server::models::domain::ResultStatus::Fail => "fail",
                        };
                        status == s
                    })
                    && filter
                        .grade
                        .as_ref()
                        .map_or(true, |g| r.grade.as_str() == g)
                    && filter.min_percentage.map_or(true, |m| r.percentage >= m)
                    && filter.max_percentage.map_or(true, |m| r.percentage <= m)
            })
            .cloned()
            .collect();

        match sort {
            ResultSort::CreatedAt => items.sort_by_key(|r| r.created_at),
            ResultSort::Score => {
                items.sort_by(|a, b| a.total_score.partial_cmp(&b.total_score).unwrap())
            }
            ResultSort::Percentage => items.sort_by_key(|r| r.percentage),
        }
        if descending {
            items.reverse();
        }

        Ok(paginate(items, offset, limit))
    }
}

#[derive(Default)]
pub struct InMemorySecurityEventRepository {
    events: RwLock<Vec<SecurityEvent>>,
}

#[async_trait]
impl SecurityEventRepository for InMemorySecurityEventRepository {
    async fn create(&self, event: SecurityEvent) -> AppResult<SecurityEvent> {
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn find_by_session(&self, test_session_id: &str) -> AppResult<Vec<SecurityEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.test_session_id == test_session_id)
            .cloned()
            .collect())
    }
}

fn paginate<T: Clone>(items: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let start = offset.max(0) as usize;
    let end = (start + limit.max(0) as usize).min(items.len());

    let page = if start >= items.len() {
        vec![]
    } else {
        items[start..end].to_vec()
    };

    (page, total)
}

// ---------------------------------------------------------------------------
// Test doubles for collaborators
// ---------------------------------------------------------------------------

/// Notifier that counts sends so tests can assert exactly-once behavior.
#[derive(Default)]
pub struct RecordingNotifier {
    pub result_emails: AtomicUsize,
    pub invitation_emails: AtomicUsize,
    pub fail_sends: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn result_email_count(&self) -> usize {
        self.result_emails.load(Ordering::SeqCst)
    }

    pub fn invitation_email_count(&self) -> usize {
        self.invitation_emails.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_result_email(&self, _student_id: &str, _result: &TestResult) -> AppResult<()> {
        self.result_emails.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::InternalError("smtp unreachable".to_string()));
        }
        Ok(())
    }

    async fn send_invitation_email(&self, _student_id: &str, _test: &Test) -> AppResult<()> {
        self.invitation_emails.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::InternalError("smtp unreachable".to_string()));
        }
        Ok(())
    }
}

/// Essay scorer returning a fixed score, standing in for the remote model.
pub struct StubEssayScorer {
    pub score: f64,
}

#[async_trait]
impl EssayScorer for StubEssayScorer {
    async fn score_essay(&self, request: EssayScoringRequest) -> AppResult<EssayScore> {
        Ok(EssayScore {
            score: self.score.min(request.max_score),
            feedback: "Stubbed feedback".to_string(),
            confidence: 0.9,
            suggestions: vec![],
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures and harness
// ---------------------------------------------------------------------------

pub fn mcq_question(id: &str, points: u32, correct: &str, options: &[&str]) -> Question {
    let mut question = Question::new(
        "Pick the right option",
        points,
        Difficulty::Medium,
        QuestionKind::Mcq {
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: ChoiceKey::One(correct.to_string()),
        },
        "instructor-1",
    );
    question.id = id.to_string();
    question
}

pub fn essay_question(id: &str, points: u32) -> Question {
    let mut question = Question::new(
        "Discuss the causes in detail",
        points,
        Difficulty::Hard,
        QuestionKind::Essay {
            word_limit: Some(500),
            rubric: Some("Argument, evidence, structure".to_string()),
            model_answer: None,
        },
        "instructor-1",
    );
    question.id = id.to_string();
    question
}

/// A published 60-minute test with a 5-minute grace period, open for the
/// whole week around `t0()`.
pub fn published_test(id: &str, question_ids: &[&str], max_attempts: u32) -> Test {
    let mut test = Test::new_draft(TestDraft {
        title: "History midterm",
        description: None,
        subject: "History",
        instructor_id: "instructor-1",
        duration_minutes: 60,
        passing_score: 70,
        max_attempts,
        grace_period_minutes: 5,
        start_date: t0() - Duration::days(1),
        end_date: t0() + Duration::days(6),
    });
    test.id = id.to_string();
    test.status = TestStatus::Published;
    test.question_ids = question_ids.iter().map(|id| id.to_string()).collect();
    test
}

/// Everything wired together over in-memory storage and a manual clock.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub tests: Arc<InMemoryTestRepository>,
    pub sessions: Arc<InMemoryTestSessionRepository>,
    pub answers: Arc<InMemoryStudentAnswerRepository>,
    pub results: Arc<InMemoryTestResultRepository>,
    pub events: Arc<InMemorySecurityEventRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub session_service: SessionService,
    pub result_service: ResultService,
    pub test_service: TestService,
    pub security_service: SecurityService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_essay_scorer(Arc::new(StubEssayScorer { score: 0.0 })).0
    }

    pub fn with_essay_scorer(scorer: Arc<dyn EssayScorer>) -> (Self, GradingService) {
        let clock = Arc::new(ManualClock::at(t0()));
        let questions = Arc::new(InMemoryQuestionRepository::default());
        let tests = Arc::new(InMemoryTestRepository::default());
        let sessions = Arc::new(InMemoryTestSessionRepository::default());
        let answers = Arc::new(InMemoryStudentAnswerRepository::default());
        let results = Arc::new(InMemoryTestResultRepository::default());
        let events = Arc::new(InMemorySecurityEventRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let session_service = SessionService::new(
            sessions.clone(),
            answers.clone(),
            tests.clone(),
            questions.clone(),
            clock.clone(),
        );
        let result_service = ResultService::new(
            results.clone(),
            sessions.clone(),
            answers.clone(),
            tests.clone(),
            questions.clone(),
            notifier.clone(),
            clock.clone(),
        );
        let test_service = TestService::new(
            tests.clone(),
            questions.clone(),
            notifier.clone(),
            clock.clone(),
        );
        let security_service =
            SecurityService::new(events.clone(), sessions.clone(), clock.clone());
        let grading_service = GradingService::new(
            answers.clone(),
            questions.clone(),
            sessions.clone(),
            scorer,
            clock.clone(),
        );

        (
            Self {
                clock,
                questions,
                tests,
                sessions,
                answers,
                results,
                events,
                notifier,
                session_service,
                result_service,
                test_service,
                security_service,
            },
            grading_service,
        )
    }

    /// Seeds a published two-question mcq test (2 points each) and returns
    /// its id.
    pub async fn seed_basic_test(&self, max_attempts: u32) -> String {
        self.questions
            .create(mcq_question("q1", 2, "a", &["a", "b"]))
            .await
            .unwrap();
        self.questions
            .create(mcq_question("q2", 2, "c", &["c", "d"]))
            .await
            .unwrap();
        let test = published_test("test-1", &["q1", "q2"], max_attempts);
        self.tests.create(test).await.unwrap();
        "test-1".to_string()
    }
}
