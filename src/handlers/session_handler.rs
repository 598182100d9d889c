use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::{
            ExtendSessionRequest, RecordSecurityEventRequest, StartSessionRequest,
            SubmitAnswerRequest,
        },
        response::{EligibilityDto, SweepOutcomeDto},
    },
    services::EndKind,
};

#[post("/api/sessions")]
pub async fn start_session(
    state: web::Data<AppState>,
    request: web::Json<StartSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let session = state
        .session_service
        .start_session(&request.test_id, &request.student_id)
        .await?;
    Ok(HttpResponse::Created().json(session))
}

#[get("/api/sessions/{id}")]
pub async fn get_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state.session_service.get_session(&id).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[get("/api/sessions/{id}/time-remaining")]
pub async fn time_remaining(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let remaining = state.session_service.time_remaining(&id).await?;
    Ok(HttpResponse::Ok().json(remaining))
}

#[get("/api/sessions/{id}/progress")]
pub async fn get_progress(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let progress = state.session_service.get_progress(&id).await?;
    Ok(HttpResponse::Ok().json(progress))
}

#[get("/api/sessions/{id}/questions")]
pub async fn get_session_questions(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let questions = state.session_service.questions_for_delivery(&id).await?;
    Ok(HttpResponse::Ok().json(questions))
}

#[put("/api/sessions/{id}/answers")]
pub async fn submit_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let answer = state
        .session_service
        .submit_answer(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(answer))
}

#[post("/api/sessions/{id}/submit")]
pub async fn submit_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .session_service
        .end_session(&id, EndKind::Submit)
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/api/sessions/{id}/end")]
pub async fn end_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .session_service
        .end_session(&id, EndKind::Complete)
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/api/sessions/{id}/extend")]
pub async fn extend_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<ExtendSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .session_service
        .extend_session(&id, request.minutes)
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/api/sessions/{id}/events")]
pub async fn record_security_event(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<RecordSecurityEventRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .security_service
        .record_event(&id, request.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().finish())
}

#[get("/api/sessions/{id}/events")]
pub async fn get_security_events(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let events = state.security_service.events_for_session(&id).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[get("/api/students/{student_id}/tests/{test_id}/eligibility")]
pub async fn check_eligibility(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (student_id, test_id) = path.into_inner();
    let can_take_test = state
        .session_service
        .can_student_take_test(&student_id, &test_id)
        .await?;
    Ok(HttpResponse::Ok().json(EligibilityDto { can_take_test }))
}

#[post("/api/admin/sessions/expire-overdue")]
pub async fn expire_overdue_sessions(
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let expired_sessions = state.session_service.expire_overdue_sessions().await?;
    Ok(HttpResponse::Ok().json(SweepOutcomeDto { expired_sessions }))
}
