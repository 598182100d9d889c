mod common;

use chrono::Duration;

use common::{t0, Harness};
use provetta_server::{
    errors::AppError,
    models::{
        domain::{ChoiceKey, Difficulty, QuestionKind, TestStatus},
        dto::request::{CreateQuestionRequest, CreateTestRequest, UpdateTestRequest},
    },
};

fn mcq_request(text: &str) -> CreateQuestionRequest {
    CreateQuestionRequest {
        text: text.to_string(),
        points: 2,
        difficulty: Difficulty::Easy,
        kind: QuestionKind::Mcq {
            options: vec!["a".to_string(), "b".to_string()],
            correct: ChoiceKey::One("a".to_string()),
        },
        created_by: "instructor-1".to_string(),
    }
}

fn test_request(title: &str) -> CreateTestRequest {
    CreateTestRequest {
        title: title.to_string(),
        description: None,
        subject: "History".to_string(),
        instructor_id: "instructor-1".to_string(),
        duration_minutes: 60,
        passing_score: 70,
        max_attempts: 1,
        grace_period_minutes: 5,
        start_date: t0() - Duration::days(1),
        end_date: t0() + Duration::days(6),
    }
}

#[tokio::test]
async fn question_validation_rejects_key_outside_options() {
    let harness = Harness::new();

    let mut request = mcq_request("Broken");
    request.kind = QuestionKind::Mcq {
        options: vec!["a".to_string(), "b".to_string()],
        correct: ChoiceKey::One("z".to_string()),
    };

    let err = harness
        .test_service
        .create_question(request)
        .await
        .expect_err("invalid answer key must be rejected");
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_creation_rejects_inverted_dates() {
    let harness = Harness::new();

    let mut request = test_request("Backwards");
    request.start_date = t0() + Duration::days(2);
    request.end_date = t0() + Duration::days(1);

    let err = harness
        .test_service
        .create_test(request)
        .await
        .expect_err("end before start must be rejected");
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn publish_requires_at_least_one_question() {
    let harness = Harness::new();

    let test = harness
        .test_service
        .create_test(test_request("Empty test"))
        .await
        .unwrap();

    let err = harness
        .test_service
        .publish_test(&test.id)
        .await
        .expect_err("empty test must not publish");
    assert!(matches!(err, AppError::ValidationError(_)));

    let question = harness
        .test_service
        .create_question(mcq_request("Q1"))
        .await
        .unwrap();
    harness
        .test_service
        .add_question_to_test(&test.id, &question.id)
        .await
        .unwrap();

    let published = harness.test_service.publish_test(&test.id).await.unwrap();
    assert_eq!(published.status, TestStatus::Published);
}

#[tokio::test]
async fn published_tests_are_frozen() {
    let harness = Harness::new();

    let test = harness
        .test_service
        .create_test(test_request("Frozen"))
        .await
        .unwrap();
    let question = harness
        .test_service
        .create_question(mcq_request("Q1"))
        .await
        .unwrap();
    harness
        .test_service
        .add_question_to_test(&test.id, &question.id)
        .await
        .unwrap();
    harness.test_service.publish_test(&test.id).await.unwrap();

    let update = harness
        .test_service
        .update_test(
            &test.id,
            UpdateTestRequest {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(AppError::InvalidState(_))));

    let add = harness
        .test_service
        .add_question_to_test(&test.id, &question.id)
        .await;
    assert!(matches!(add, Err(AppError::InvalidState(_))));

    let second_publish = harness.test_service.publish_test(&test.id).await;
    assert!(matches!(second_publish, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn questions_on_published_tests_are_versioned_not_edited() {
    let harness = Harness::new();

    let test = harness
        .test_service
        .create_test(test_request("Versioning"))
        .await
        .unwrap();
    let question = harness
        .test_service
        .create_question(mcq_request("Original wording"))
        .await
        .unwrap();
    harness
        .test_service
        .add_question_to_test(&test.id, &question.id)
        .await
        .unwrap();
    harness.test_service.publish_test(&test.id).await.unwrap();

    let edit = harness
        .test_service
        .update_question(&question.id, mcq_request("Reworded"))
        .await;
    assert!(matches!(edit, Err(AppError::InvalidState(_))));

    let delete = harness.test_service.delete_question(&question.id).await;
    assert!(matches!(delete, Err(AppError::InvalidState(_))));

    let revised = harness
        .test_service
        .version_question(&question.id, mcq_request("Reworded"))
        .await
        .unwrap();
    assert_eq!(revised.version_of.as_deref(), Some(question.id.as_str()));
    assert_ne!(revised.id, question.id);

    // The published test still serves the original question.
    let (_, questions) = harness
        .test_service
        .get_test_with_questions(&test.id)
        .await
        .unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, question.id);
    assert_eq!(questions[0].text, "Original wording");
}

#[tokio::test]
async fn draft_questions_can_be_edited_in_place() {
    let harness = Harness::new();

    let question = harness
        .test_service
        .create_question(mcq_request("Draft wording"))
        .await
        .unwrap();

    let updated = harness
        .test_service
        .update_question(&question.id, mcq_request("Better wording"))
        .await
        .unwrap();
    assert_eq!(updated.id, question.id);
    assert_eq!(updated.text, "Better wording");
}

#[tokio::test]
async fn archiving_is_idempotent() {
    let harness = Harness::new();

    let test = harness
        .test_service
        .create_test(test_request("Archive me"))
        .await
        .unwrap();

    let archived = harness.test_service.archive_test(&test.id).await.unwrap();
    assert_eq!(archived.status, TestStatus::Archived);

    let again = harness.test_service.archive_test(&test.id).await.unwrap();
    assert_eq!(again.status, TestStatus::Archived);
}

#[tokio::test]
async fn invitations_only_go_out_for_published_tests() {
    let harness = Harness::new();

    let test = harness
        .test_service
        .create_test(test_request("Invites"))
        .await
        .unwrap();

    let err = harness
        .test_service
        .invite_student(&test.id, "student-1")
        .await
        .expect_err("draft test must not send invitations");
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(harness.notifier.invitation_email_count(), 0);

    let question = harness
        .test_service
        .create_question(mcq_request("Q1"))
        .await
        .unwrap();
    harness
        .test_service
        .add_question_to_test(&test.id, &question.id)
        .await
        .unwrap();
    harness.test_service.publish_test(&test.id).await.unwrap();

    harness
        .test_service
        .invite_student(&test.id, "student-1")
        .await
        .unwrap();
    assert_eq!(harness.notifier.invitation_email_count(), 1);
}

#[tokio::test]
async fn shuffled_delivery_preserves_the_question_set() {
    let harness = Harness::new();

    let mut request = test_request("Shuffled");
    request.title = "Shuffled".to_string();
    let test = harness.test_service.create_test(request).await.unwrap();

    let mut ids = Vec::new();
    for index in 0..8 {
        let question = harness
            .test_service
            .create_question(mcq_request(&format!("Q{}", index)))
            .await
            .unwrap();
        harness
            .test_service
            .add_question_to_test(&test.id, &question.id)
            .await
            .unwrap();
        ids.push(question.id);
    }
    harness
        .test_service
        .update_test(
            &test.id,
            UpdateTestRequest {
                shuffle_questions: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    harness.test_service.publish_test(&test.id).await.unwrap();

    let session = harness
        .session_service
        .start_session(&test.id, "student-1")
        .await
        .unwrap();

    let delivered = harness
        .session_service
        .questions_for_delivery(&session.id)
        .await
        .unwrap();

    let mut delivered_ids: Vec<String> = delivered.iter().map(|q| q.id.clone()).collect();
    delivered_ids.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(delivered_ids, expected);
}
