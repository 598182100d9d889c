pub mod result_handler;
pub mod session_handler;
pub mod test_handler;

use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, errors::AppError};

#[get("/api/health")]
async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state.database.health_check().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

/// Registers every route. `/api/results/export` must precede
/// `/api/results/{id}` so the literal segment wins.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        // Authoring
        .service(test_handler::create_question)
        .service(test_handler::get_question)
        .service(test_handler::update_question)
        .service(test_handler::delete_question)
        .service(test_handler::version_question)
        .service(test_handler::create_test)
        .service(test_handler::list_tests)
        .service(test_handler::get_test)
        .service(test_handler::update_test)
        .service(test_handler::add_question_to_test)
        .service(test_handler::remove_question_from_test)
        .service(test_handler::publish_test)
        .service(test_handler::archive_test)
        .service(test_handler::invite_student)
        // Sessions
        .service(session_handler::start_session)
        .service(session_handler::get_session)
        .service(session_handler::time_remaining)
        .service(session_handler::get_progress)
        .service(session_handler::get_session_questions)
        .service(session_handler::submit_answer)
        .service(session_handler::submit_session)
        .service(session_handler::end_session)
        .service(session_handler::extend_session)
        .service(session_handler::record_security_event)
        .service(session_handler::get_security_events)
        .service(session_handler::check_eligibility)
        .service(session_handler::expire_overdue_sessions)
        // Results and grading
        .service(result_handler::calculate_result)
        .service(result_handler::get_result_by_session)
        .service(result_handler::export_results)
        .service(result_handler::list_results)
        .service(result_handler::get_result)
        .service(result_handler::add_feedback)
        .service(result_handler::publish_result)
        .service(result_handler::test_statistics)
        .service(result_handler::result_comparison)
        .service(result_handler::student_performance)
        .service(result_handler::grade_essay_answer)
        .service(result_handler::record_manual_score);
}
