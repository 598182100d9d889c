use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::{
    clock::SystemClock,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuestionRepository, MongoSecurityEventRepository, MongoStudentAnswerRepository,
        MongoTestRepository, MongoTestResultRepository, MongoTestSessionRepository,
    },
    services::{
        EssayScorer, FallbackEssayScorer, GradingService, HeuristicEssayScorer, LogNotifier,
        OpenAiEssayScorer, ResultService, SecurityService, SessionService, TestService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub test_service: Arc<TestService>,
    pub session_service: Arc<SessionService>,
    pub result_service: Arc<ResultService>,
    pub grading_service: Arc<GradingService>,
    pub security_service: Arc<SecurityService>,
    pub database: Arc<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let questions = Arc::new(MongoQuestionRepository::new(&db));
        questions.ensure_indexes().await?;
        let tests = Arc::new(MongoTestRepository::new(&db));
        tests.ensure_indexes().await?;
        let sessions = Arc::new(MongoTestSessionRepository::new(&db));
        sessions.ensure_indexes().await?;
        let answers = Arc::new(MongoStudentAnswerRepository::new(&db));
        answers.ensure_indexes().await?;
        let results = Arc::new(MongoTestResultRepository::new(&db));
        results.ensure_indexes().await?;
        let events = Arc::new(MongoSecurityEventRepository::new(&db));
        events.ensure_indexes().await?;

        let clock = Arc::new(SystemClock);
        let notifier = Arc::new(LogNotifier);

        // Remote essay scorer with heuristic fallback when configured; the
        // heuristic alone otherwise.
        let essay_scorer: Arc<dyn EssayScorer> = match &config.openai_api_key {
            Some(key) => Arc::new(FallbackEssayScorer::new(
                Arc::new(OpenAiEssayScorer::new(
                    key.expose_secret(),
                    &config.essay_model,
                )),
                Arc::new(HeuristicEssayScorer),
            )),
            None => {
                log::warn!("OPENAI_API_KEY not set; essay answers will use the heuristic scorer");
                Arc::new(HeuristicEssayScorer)
            }
        };

        let test_service = Arc::new(TestService::new(
            tests.clone(),
            questions.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let session_service = Arc::new(SessionService::new(
            sessions.clone(),
            answers.clone(),
            tests.clone(),
            questions.clone(),
            clock.clone(),
        ));
        let result_service = Arc::new(ResultService::new(
            results.clone(),
            sessions.clone(),
            answers.clone(),
            tests.clone(),
            questions.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let grading_service = Arc::new(GradingService::new(
            answers,
            questions,
            sessions.clone(),
            essay_scorer,
            clock.clone(),
        ));
        let security_service = Arc::new(SecurityService::new(events, sessions, clock));

        Ok(Self {
            test_service,
            session_service,
            result_service,
            grading_service,
            security_service,
            database: Arc::new(db),
            config: Arc::new(config),
        })
    }
}
