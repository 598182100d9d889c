use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::AddFeedbackRequest,
        response::TestResultDto,
    },
    repositories::{ResultFilter, ResultSort},
};

#[post("/api/sessions/{id}/result")]
pub async fn calculate_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = state.result_service.calculate_result(&id).await?;
    Ok(HttpResponse::Ok().json(TestResultDto::from(result)))
}

#[get("/api/sessions/{id}/result")]
pub async fn get_result_by_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = state.result_service.get_result_by_session(&id).await?;
    Ok(HttpResponse::Ok().json(TestResultDto::from(result)))
}

#[get("/api/results/{id}")]
pub async fn get_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = state.result_service.get_result(&id).await?;
    Ok(HttpResponse::Ok().json(TestResultDto::from(result)))
}

#[derive(Debug, Deserialize, Default)]
struct ResultListQuery {
    test_id: Option<String>,
    student_id: Option<String>,
    status: Option<String>,
    grade: Option<String>,
    min_percentage: Option<u32>,
    max_percentage: Option<u32>,
    sort: Option<String>,
    order: Option<String>,
    offset: Option<i64>,
    limit: Option<i64>,
}

impl ResultListQuery {
    fn filter(&self) -> ResultFilter {
        ResultFilter {
            test_id: self.test_id.clone(),
            student_id: self.student_id.clone(),
            status: self.status.clone(),
            grade: self.grade.clone(),
            min_percentage: self.min_percentage,
            max_percentage: self.max_percentage,
        }
    }

    fn sort(&self) -> ResultSort {
        match self.sort.as_deref() {
            Some("score") => ResultSort::Score,
            Some("percentage") => ResultSort::Percentage,
            _ => ResultSort::CreatedAt,
        }
    }

    fn descending(&self) -> bool {
        !matches!(self.order.as_deref(), Some("asc"))
    }
}

#[get("/api/results")]
pub async fn list_results(
    state: web::Data<AppState>,
    query: web::Query<ResultListQuery>,
) -> Result<HttpResponse, AppError> {
    let (results, total) = state
        .result_service
        .list_results(
            query.filter(),
            query.sort(),
            query.descending(),
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(50).min(100),
        )
        .await?;

    let results: Vec<TestResultDto> = results.into_iter().map(TestResultDto::from).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "results": results,
        "total": total,
    })))
}

#[get("/api/results/export")]
pub async fn export_results(
    state: web::Data<AppState>,
    query: web::Query<ResultListQuery>,
) -> Result<HttpResponse, AppError> {
    let csv = state.result_service.export_csv(query.filter()).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .body(csv))
}

#[post("/api/results/{id}/feedback")]
pub async fn add_feedback(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<AddFeedbackRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .result_service
        .add_feedback(&id, &request.feedback, &request.reviewed_by)
        .await?;
    Ok(HttpResponse::Ok().json(TestResultDto::from(result)))
}

#[post("/api/results/{id}/publish")]
pub async fn publish_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = state.result_service.publish_result(&id).await?;
    Ok(HttpResponse::Ok().json(TestResultDto::from(result)))
}

#[get("/api/tests/{id}/statistics")]
pub async fn test_statistics(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let statistics = state.result_service.statistics(&id).await?;
    Ok(HttpResponse::Ok().json(statistics))
}

#[get("/api/tests/{test_id}/comparison/{student_id}")]
pub async fn result_comparison(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (test_id, student_id) = path.into_inner();
    let comparison = state
        .result_service
        .comparison(&test_id, &student_id)
        .await?;
    Ok(HttpResponse::Ok().json(comparison))
}

#[get("/api/students/{id}/performance")]
pub async fn student_performance(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let performance = state.result_service.student_performance(&id).await?;
    Ok(HttpResponse::Ok().json(performance))
}

#[post("/api/sessions/{session_id}/answers/{question_id}/essay-score")]
pub async fn grade_essay_answer(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (session_id, question_id) = path.into_inner();
    let answer = state
        .grading_service
        .grade_essay_answer(&session_id, &question_id)
        .await?;
    Ok(HttpResponse::Ok().json(answer))
}

#[derive(Debug, Deserialize)]
struct ManualScoreRequest {
    score: f64,
    feedback: Option<String>,
}

#[post("/api/sessions/{session_id}/answers/{question_id}/manual-score")]
pub async fn record_manual_score(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    request: web::Json<ManualScoreRequest>,
) -> Result<HttpResponse, AppError> {
    let (session_id, question_id) = path.into_inner();
    let request = request.into_inner();
    let answer = state
        .grading_service
        .record_manual_score(&session_id, &question_id, request.score, request.feedback)
        .await?;
    Ok(HttpResponse::Ok().json(answer))
}
