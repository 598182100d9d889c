pub mod question_repository;
pub mod security_event_repository;
pub mod student_answer_repository;
pub mod test_repository;
pub mod test_result_repository;
pub mod test_session_repository;

pub use question_repository::{MongoQuestionRepository, QuestionRepository};
pub use security_event_repository::{MongoSecurityEventRepository, SecurityEventRepository};
pub use student_answer_repository::{MongoStudentAnswerRepository, StudentAnswerRepository};
pub use test_repository::{MongoTestRepository, TestRepository};
pub use test_result_repository::{
    MongoTestResultRepository, ResultFilter, ResultSort, TestResultRepository,
};
pub use test_session_repository::{MongoTestSessionRepository, TestSessionRepository};
