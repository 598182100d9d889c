pub mod question;
pub mod security_event;
pub mod student_answer;
pub mod test_result;
pub mod test_session;

pub use question::{ChoiceKey, Difficulty, MatchingPair, Question, QuestionKind};
pub use security_event::{SecurityEvent, SecurityEventType, Severity};
pub use student_answer::{AnswerValue, StudentAnswer};
pub use test::{Test, TestDraft, TestStatus};
pub use test_result::{Grade, ResultStatus, TestResult};
pub use test_session::{SessionStatus, TestSession, TimeRemaining};
