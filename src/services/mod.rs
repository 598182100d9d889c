pub mod essay_scorer;
pub mod grading_service;
pub mod notification;
pub mod result_service;
pub mod scoring;
pub mod security_service;
pub mod session_service;
pub mod test_service;

pub use essay_scorer::{
    EssayScore, EssayScorer, EssayScoringRequest, FallbackEssayScorer, HeuristicEssayScorer,
    OpenAiEssayScorer,
};
pub use grading_service::GradingService;
pub use notification::{LogNotifier, Notifier};
pub use result_service::ResultService;
pub use security_service::SecurityService;
pub use session_service::{EndKind, SessionService};
pub use test_service::TestService;
