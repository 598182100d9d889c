use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub points: u32,
    pub difficulty: Difficulty,
    pub kind: QuestionKind,
    pub created_by: String,
    /// Set when this question supersedes an earlier revision. Questions
    /// referenced by a published test are never edited in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Per-type question payload. The tag doubles as the stored `type` field, so
/// an mcq document can never carry matching pairs and a matching document can
/// never carry options.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    Mcq {
        options: Vec<String>,
        correct: ChoiceKey,
    },
    TrueFalse {
        correct: bool,
    },
    FillBlank {
        correct: String,
    },
    Matching {
        pairs: Vec<MatchingPair>,
    },
    Essay {
        #[serde(skip_serializing_if = "Option::is_none")]
        word_limit: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rubric: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        model_answer: Option<String>,
    },
    ImageRecognition {
        image_url: String,
    },
}

/// Answer key for mcq questions: a single correct option or a multi-select set.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ChoiceKey {
    One(String),
    Many(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

impl Question {
    pub fn new(
        text: &str,
        points: u32,
        difficulty: Difficulty,
        kind: QuestionKind,
        created_by: &str,
    ) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            points,
            difficulty,
            kind,
            created_by: created_by.to_string(),
            version_of: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Label shown to students and in exports.
    pub fn type_label(&self) -> &'static str {
        match self.kind {
            QuestionKind::Mcq { .. } => "Multiple Choice",
            QuestionKind::TrueFalse { .. } => "True/False",
            QuestionKind::FillBlank { .. } => "Fill in the Blank",
            QuestionKind::Matching { .. } => "Matching",
            QuestionKind::Essay { .. } => "Essay",
            QuestionKind::ImageRecognition { .. } => "Image Recognition",
        }
    }

    /// True for types whose score is supplied by a grader (human or model)
    /// rather than computed from an answer key.
    pub fn is_externally_scored(&self) -> bool {
        matches!(
            self.kind,
            QuestionKind::Essay { .. } | QuestionKind::ImageRecognition { .. }
        )
    }
}
