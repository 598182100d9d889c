//! Pure scoring rules: (question, answer) -> partial credit, and the
//! aggregation of per-question credit into a test outcome.

use std::collections::HashMap;

use crate::models::domain::{
    AnswerValue, ChoiceKey, Grade, Question, QuestionKind, ResultStatus, StudentAnswer, Test,
};

/// Aggregated outcome for one finished session.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreSummary {
    pub total_score: f64,
    pub total_possible: f64,
    pub percentage: u32,
    pub grade: Grade,
    pub status: ResultStatus,
}

/// Partial credit earned by `answer` on `question`, in `[0, question.points]`.
///
/// Essay and image-recognition answers are not computed here: their score is
/// supplied externally (a grader or the essay scorer) on the answer record and
/// is passed through, clamped. A missing external score counts as zero.
pub fn score_answer(question: &Question, answer: &StudentAnswer) -> f64 {
    let points = question.points as f64;

    let earned = match &question.kind {
        QuestionKind::Mcq { correct, .. } => score_mcq(correct, &answer.answer, points),
        QuestionKind::TrueFalse { correct } => match &answer.answer {
            AnswerValue::Text(text) => {
                let submitted = text.trim().to_lowercase();
                let expected = if *correct { "true" } else { "false" };
                if submitted == expected {
                    points
                } else {
                    0.0
                }
            }
            _ => 0.0,
        },
        QuestionKind::FillBlank { correct } => match &answer.answer {
            AnswerValue::Text(text) => {
                if text.trim().to_lowercase() == correct.trim().to_lowercase() {
                    points
                } else {
                    0.0
                }
            }
            _ => 0.0,
        },
        QuestionKind::Matching { pairs: correct } => match &answer.answer {
            AnswerValue::Pairs(submitted) => {
                if correct.is_empty() {
                    return 0.0;
                }
                let matched = correct
                    .iter()
                    .filter(|expected| {
                        submitted
                            .iter()
                            .any(|pair| pair.left == expected.left && pair.right == expected.right)
                    })
                    .count();
                points * matched as f64 / correct.len() as f64
            }
            _ => 0.0,
        },
        QuestionKind::Essay { .. } | QuestionKind::ImageRecognition { .. } => {
            answer.score.unwrap_or(0.0)
        }
    };

    earned.clamp(0.0, points)
}

fn score_mcq(correct: &ChoiceKey, answer: &AnswerValue, points: f64) -> f64 {
    let correct_options: Vec<&str> = match correct {
        ChoiceKey::One(option) => vec![option.as_str()],
        ChoiceKey::Many(options) => options.iter().map(String::as_str).collect(),
    };

    if correct_options.is_empty() {
        return 0.0;
    }

    match answer {
        // Single selection: full credit on an exact match against a
        // single-answer key; against a multi-answer key one selection earns
        // its fractional share.
        AnswerValue::Text(selected) => {
            let matched = correct_options.iter().any(|c| *c == selected.as_str());
            if !matched {
                return 0.0;
            }
            points / correct_options.len() as f64
        }
        // Multi-select: fractional credit per matched correct option. Extra
        // wrong selections earn nothing but are not penalized.
        AnswerValue::Selections(selected) => {
            let matched = correct_options
                .iter()
                .filter(|c| selected.iter().any(|s| s.as_str() == **c))
                .count();
            points * matched as f64 / correct_options.len() as f64
        }
        AnswerValue::Pairs(_) => 0.0,
    }
}

/// Sums per-question credit into a total, percentage, grade and pass/fail.
///
/// `total_possible` covers every question on the test, answered or not;
/// answers that reference a question outside the test contribute nothing.
pub fn aggregate(test: &Test, questions: &[Question], answers: &[StudentAnswer]) -> ScoreSummary {
    let by_id: HashMap<&str, &Question> = questions
        .iter()
        .filter(|q| test.question_ids.iter().any(|id| id == &q.id))
        .map(|q| (q.id.as_str(), q))
        .collect();

    let total_possible: f64 = by_id.values().map(|q| q.points as f64).sum();

    let total_score: f64 = answers
        .iter()
        .filter_map(|answer| {
            by_id
                .get(answer.question_id.as_str())
                .map(|question| score_answer(question, answer))
        })
        .sum();

    let percentage = percentage_of(total_score, total_possible);

    ScoreSummary {
        total_score,
        total_possible,
        percentage,
        grade: grade_for(percentage),
        status: status_for(percentage, test.passing_score),
    }
}

/// Rounded percentage in [0, 100]; an empty test scores 0 rather than
/// dividing by zero.
pub fn percentage_of(score: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    ((score / total) * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Fixed letter-grade thresholds; these are not configurable per test.
pub fn grade_for(percentage: u32) -> Grade {
    match percentage {
        90..=u32::MAX => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

pub fn status_for(percentage: u32, passing_score: u32) -> ResultStatus {
    if percentage >= passing_score {
        ResultStatus::Pass
    } else {
        ResultStatus::Fail
    }
}
