use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    app_state::AppState,
    errors::{AppError, AppResult},
    models::{
        domain::TestStatus,
        dto::request::{CreateQuestionRequest, CreateTestRequest, UpdateTestRequest},
    },
};

#[post("/api/questions")]
pub async fn create_question(
    state: web::Data<AppState>,
    request: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let question = state.test_service.create_question(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(question))
}

#[get("/api/questions/{id}")]
pub async fn get_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let question = state.test_service.get_question(&id).await?;
    Ok(HttpResponse::Ok().json(question))
}

#[patch("/api/questions/{id}")]
pub async fn update_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let question = state
        .test_service
        .update_question(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(question))
}

#[delete("/api/questions/{id}")]
pub async fn delete_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.test_service.delete_question(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/questions/{id}/versions")]
pub async fn version_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let question = state
        .test_service
        .version_question(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(question))
}

#[post("/api/tests")]
pub async fn create_test(
    state: web::Data<AppState>,
    request: web::Json<CreateTestRequest>,
) -> Result<HttpResponse, AppError> {
    let test = state.test_service.create_test(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(test))
}

#[get("/api/tests/{id}")]
pub async fn get_test(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let (test, questions) = state.test_service.get_test_with_questions(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "test": test,
        "questions": questions,
    })))
}

#[derive(Debug, Deserialize)]
struct ListTestsQuery {
    status: Option<String>,
    offset: Option<i64>,
    limit: Option<i64>,
}

impl ListTestsQuery {
    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

fn parse_status(value: &str) -> AppResult<TestStatus> {
    match value {
        "draft" => Ok(TestStatus::Draft),
        "published" => Ok(TestStatus::Published),
        "archived" => Ok(TestStatus::Archived),
        other => Err(AppError::ValidationError(format!(
            "Unknown test status '{}'",
            other
        ))),
    }
}

#[get("/api/tests")]
pub async fn list_tests(
    state: web::Data<AppState>,
    query: web::Query<ListTestsQuery>,
) -> Result<HttpResponse, AppError> {
    let (tests, total) = match &query.status {
        Some(status) => {
            let status = parse_status(status)?;
            state
                .test_service
                .list_tests_by_status(status, query.offset(), query.limit())
                .await?
        }
        None => {
            state
                .test_service
                .list_tests(query.offset(), query.limit())
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tests": tests,
        "total": total,
    })))
}

#[patch("/api/tests/{id}")]
pub async fn update_test(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateTestRequest>,
) -> Result<HttpResponse, AppError> {
    let test = state
        .test_service
        .update_test(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(test))
}

#[post("/api/tests/{test_id}/questions/{question_id}")]
pub async fn add_question_to_test(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (test_id, question_id) = path.into_inner();
    let test = state
        .test_service
        .add_question_to_test(&test_id, &question_id)
        .await?;
    Ok(HttpResponse::Ok().json(test))
}

#[delete("/api/tests/{test_id}/questions/{question_id}")]
pub async fn remove_question_from_test(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (test_id, question_id) = path.into_inner();
    let test = state
        .test_service
        .remove_question_from_test(&test_id, &question_id)
        .await?;
    Ok(HttpResponse::Ok().json(test))
}

#[post("/api/tests/{id}/publish")]
pub async fn publish_test(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let test = state.test_service.publish_test(&id).await?;
    Ok(HttpResponse::Ok().json(test))
}

#[post("/api/tests/{id}/archive")]
pub async fn archive_test(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let test = state.test_service.archive_test(&id).await?;
    Ok(HttpResponse::Ok().json(test))
}

#[derive(Debug, Deserialize)]
struct InviteStudentRequest {
    student_id: String,
}

#[post("/api/tests/{id}/invitations")]
pub async fn invite_student(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<InviteStudentRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .test_service
        .invite_student(&id, &request.student_id)
        .await?;
    Ok(HttpResponse::Accepted().finish())
}
