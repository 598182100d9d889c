use std::sync::Arc;

use validator::Validate;

use crate::{
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{ChoiceKey, Question, QuestionKind, Test, TestDraft, TestStatus},
        dto::request::{CreateQuestionRequest, CreateTestRequest, UpdateTestRequest},
    },
    repositories::{QuestionRepository, TestRepository},
    services::notification::Notifier,
};

/// Authoring workflow: question and test lifecycle up to publication.
pub struct TestService {
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl TestService {
    pub fn new(
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tests,
            questions,
            notifier,
            clock,
        }
    }

    pub async fn get_test(&self, id: &str) -> AppResult<Test> {
        self.tests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test with id '{}' not found", id)))
    }

    pub async fn get_question(&self, id: &str) -> AppResult<Question> {
        self.questions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question with id '{}' not found", id)))
    }

    pub async fn get_test_with_questions(&self, id: &str) -> AppResult<(Test, Vec<Question>)> {
        let test = self.get_test(id).await?;
        let mut questions = self.questions.find_by_ids(&test.question_ids).await?;
        questions.sort_by_key(|q| {
            test.question_ids
                .iter()
                .position(|qid| qid == &q.id)
                .unwrap_or(usize::MAX)
        });
        Ok((test, questions))
    }

    pub async fn list_tests(&self, offset: i64, limit: i64) -> AppResult<(Vec<Test>, i64)> {
        self.tests.list(offset, limit).await
    }

    pub async fn list_tests_by_status(
        &self,
        status: TestStatus,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        self.tests.list_by_status(status, offset, limit).await
    }

    pub async fn create_question(&self, request: CreateQuestionRequest) -> AppResult<Question> {
        request.validate()?;
        validate_question_kind(&request.kind)?;

        if request.text.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Question text is required".to_string(),
            ));
        }

        let question = Question::new(
            request.text.trim(),
            request.points,
            request.difficulty,
            request.kind,
            &request.created_by,
        );

        let question = self.questions.create(question).await?;
        log::info!("Question created: {}", question.id);
        Ok(question)
    }

    /// Edits a question in place. Refused once any published test references
    /// it; revise through `version_question` instead.
    pub async fn update_question(
        &self,
        question_id: &str,
        request: CreateQuestionRequest,
    ) -> AppResult<Question> {
        request.validate()?;
        validate_question_kind(&request.kind)?;

        let mut question = self.get_question(question_id).await?;

        if self.tests.is_question_in_published_test(question_id).await? {
            return Err(AppError::InvalidState(
                "Question is used by a published test; create a new version instead".to_string(),
            ));
        }

        question.text = request.text.trim().to_string();
        question.points = request.points;
        question.difficulty = request.difficulty;
        question.kind = request.kind;
        question.modified_at = Some(self.clock.now());

        let question = self.questions.update(question).await?;
        log::info!("Question updated: {}", question.id);
        Ok(question)
    }

    /// Creates a fresh question superseding `question_id`, leaving the
    /// original untouched for tests that already reference it.
    pub async fn version_question(
        &self,
        question_id: &str,
        request: CreateQuestionRequest,
    ) -> AppResult<Question> {
        let original = self.get_question(question_id).await?;

        let mut revised = self.create_question(request).await?;
        revised.version_of = Some(original.id.clone());
        revised.modified_at = Some(self.clock.now());

        let revised = self.questions.update(revised).await?;
        log::info!(
            "Question {} versioned as {}",
            original.id,
            revised.id
        );
        Ok(revised)
    }

    pub async fn delete_question(&self, question_id: &str) -> AppResult<()> {
        if self.tests.is_question_in_published_test(question_id).await? {
            return Err(AppError::InvalidState(
                "Question is used by a published test and cannot be deleted".to_string(),
            ));
        }

        self.questions.delete(question_id).await?;
        log::info!("Question deleted: {}", question_id);
        Ok(())
    }

    pub async fn create_test(&self, request: CreateTestRequest) -> AppResult<Test> {
        request.validate()?;

        if request.start_date >= request.end_date {
            return Err(AppError::ValidationError(
                "End date must be after start date".to_string(),
            ));
        }

        let test = Test::new_draft(TestDraft {
            title: request.title.trim(),
            description: request.description.as_deref(),
            subject: request.subject.trim(),
            instructor_id: &request.instructor_id,
            duration_minutes: request.duration_minutes,
            passing_score: request.passing_score,
            max_attempts: request.max_attempts,
            grace_period_minutes: request.grace_period_minutes,
            start_date: request.start_date,
            end_date: request.end_date,
        });

        let test = self.tests.create(test).await?;
        log::info!("Test created: {} ('{}')", test.id, test.title);
        Ok(test)
    }

    /// Settings changes are only allowed while a test is a draft; published
    /// tests are frozen apart from archival.
    pub async fn update_test(&self, test_id: &str, request: UpdateTestRequest) -> AppResult<Test> {
        request.validate()?;

        let mut test = self.get_test(test_id).await?;
        if test.status != TestStatus::Draft {
            return Err(AppError::InvalidState(format!(
                "Only draft tests can be edited; this test is {:?}",
                test.status
            )));
        }

        if let Some(title) = request.title {
            test.title = title;
        }
        if let Some(description) = request.description {
            test.description = Some(description);
        }
        if let Some(subject) = request.subject {
            test.subject = subject;
        }
        if let Some(duration) = request.duration_minutes {
            test.duration_minutes = duration;
        }
        if let Some(passing_score) = request.passing_score {
            test.passing_score = passing_score;
        }
        if let Some(max_attempts) = request.max_attempts {
            test.max_attempts = max_attempts;
        }
        if let Some(grace) = request.grace_period_minutes {
            test.grace_period_minutes = grace;
        }
        if let Some(shuffle) = request.shuffle_questions {
            test.shuffle_questions = shuffle;
        }
        if let Some(allow_review) = request.allow_review {
            test.allow_review = allow_review;
        }
        if let Some(negative_marking) = request.negative_marking {
            test.negative_marking = negative_marking;
        }
        if let Some(value) = request.negative_marking_value {
            test.negative_marking_value = value;
        }
        if let Some(start) = request.start_date {
            test.start_date = start;
        }
        if let Some(end) = request.end_date {
            test.end_date = end;
        }

        if test.start_date >= test.end_date {
            return Err(AppError::ValidationError(
                "End date must be after start date".to_string(),
            ));
        }

        test.modified_at = Some(self.clock.now());
        let test = self.tests.update(test).await?;
        Ok(test)
    }

    pub async fn add_question_to_test(&self, test_id: &str, question_id: &str) -> AppResult<Test> {
        let mut test = self.get_test(test_id).await?;
        if test.status != TestStatus::Draft {
            return Err(AppError::InvalidState(
                "Questions can only be added to draft tests".to_string(),
            ));
        }

        // Validates the reference before it lands on the test.
        self.get_question(question_id).await?;

        if test.question_ids.iter().any(|id| id == question_id) {
            return Err(AppError::AlreadyExists(format!(
                "Question '{}' is already on this test",
                question_id
            )));
        }

        test.question_ids.push(question_id.to_string());
        test.modified_at = Some(self.clock.now());
        let test = self.tests.update(test).await?;
        Ok(test)
    }

    pub async fn remove_question_from_test(
        &self,
        test_id: &str,
        question_id: &str,
    ) -> AppResult<Test> {
        let mut test = self.get_test(test_id).await?;
        if test.status != TestStatus::Draft {
            return Err(AppError::InvalidState(
                "Questions can only be removed from draft tests".to_string(),
            ));
        }

        let before = test.question_ids.len();
        test.question_ids.retain(|id| id != question_id);
        if test.question_ids.len() == before {
            return Err(AppError::NotFound(format!(
                "Question '{}' is not on this test",
                question_id
            )));
        }

        test.modified_at = Some(self.clock.now());
        let test = self.tests.update(test).await?;
        Ok(test)
    }

    pub async fn publish_test(&self, test_id: &str) -> AppResult<Test> {
        let mut test = self.get_test(test_id).await?;

        if test.status != TestStatus::Draft {
            return Err(AppError::InvalidState(format!(
                "Only draft tests can be published; this test is {:?}",
                test.status
            )));
        }
        if test.question_ids.is_empty() {
            return Err(AppError::ValidationError(
                "A test must have at least one question before it can be published".to_string(),
            ));
        }
        if test.start_date >= test.end_date {
            return Err(AppError::ValidationError(
                "End date must be after start date".to_string(),
            ));
        }

        test.status = TestStatus::Published;
        test.modified_at = Some(self.clock.now());
        let test = self.tests.update(test).await?;
        log::info!("Test published: {} ('{}')", test.id, test.title);
        Ok(test)
    }

    pub async fn archive_test(&self, test_id: &str) -> AppResult<Test> {
        let mut test = self.get_test(test_id).await?;

        if test.status == TestStatus::Archived {
            return Ok(test);
        }

        test.status = TestStatus::Archived;
        test.modified_at = Some(self.clock.now());
        let test = self.tests.update(test).await?;
        log::info!("Test archived: {}", test.id);
        Ok(test)
    }

    /// Invites a student to a published test. A failed send is logged, not
    /// surfaced to the caller.
    pub async fn invite_student(&self, test_id: &str, student_id: &str) -> AppResult<()> {
        let test = self.get_test(test_id).await?;

        if test.status != TestStatus::Published {
            return Err(AppError::InvalidState(
                "Students can only be invited to published tests".to_string(),
            ));
        }

        if let Err(err) = self.notifier.send_invitation_email(student_id, &test).await {
            log::warn!(
                "Failed to send invitation for test {} to student {}: {}",
                test_id,
                student_id,
                err
            );
        }

        Ok(())
    }
}

/// Per-type authoring rules, applied before a question is stored.
fn validate_question_kind(kind: &QuestionKind) -> AppResult<()> {
    let mut errors: Vec<String> = Vec::new();

    match kind {
        QuestionKind::Mcq { options, correct } => {
            if options.len() < 2 {
                errors.push("MCQ questions require at least 2 options".to_string());
            }
            if options.iter().any(|o| o.trim().is_empty()) {
                errors.push("All MCQ options must be filled".to_string());
            }
            match correct {
                ChoiceKey::One(answer) => {
                    if !options.iter().any(|o| o == answer) {
                        errors.push("Correct answer must be one of the options".to_string());
                    }
                }
                ChoiceKey::Many(answers) => {
                    if answers.is_empty() {
                        errors.push("At least one correct answer is required".to_string());
                    }
                    if answers.iter().any(|a| !options.iter().any(|o| o == a)) {
                        errors.push("Every correct answer must be one of the options".to_string());
                    }
                }
            }
        }
        QuestionKind::TrueFalse { .. } => {}
        QuestionKind::FillBlank { correct } => {
            if correct.trim().is_empty() {
                errors.push("Correct answer is required for fill-in-the-blank".to_string());
            }
        }
        QuestionKind::Matching { pairs } => {
            if pairs.len() < 2 {
                errors.push("Matching questions require at least 2 pairs".to_string());
            }
            if pairs
                .iter()
                .any(|p| p.left.trim().is_empty() || p.right.trim().is_empty())
            {
                errors.push("All matching pairs must have both left and right values".to_string());
            }
        }
        QuestionKind::Essay { word_limit, .. } => {
            if let Some(0) = word_limit {
                errors.push("Essay word limit must be greater than 0".to_string());
            }
        }
        QuestionKind::ImageRecognition { image_url } => {
            if image_url.trim().is_empty() {
                errors.push("Image URL is required for image recognition".to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors.join("; ")))
    }
}
