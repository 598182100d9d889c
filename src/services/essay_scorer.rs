use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq)]
pub struct EssayScoringRequest {
    pub essay_text: String,
    pub question_text: String,
    pub rubric: Option<String>,
    pub model_answer: Option<String>,
    pub max_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EssayScore {
    pub score: f64,
    pub feedback: String,
    pub confidence: f64,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Produces a score and feedback for one essay answer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EssayScorer: Send + Sync {
    async fn score_essay(&self, request: EssayScoringRequest) -> AppResult<EssayScore>;
}

/// Remote scorer backed by a chat-completion model.
pub struct OpenAiEssayScorer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEssayScorer {
    pub fn new(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    fn build_prompt(request: &EssayScoringRequest) -> String {
        let mut prompt = format!(
            "You are an expert educator scoring a student's essay response.\n\n\
             Question: {}\n\n",
            request.question_text
        );

        if let Some(rubric) = &request.rubric {
            prompt.push_str(&format!("Rubric: {}\n\n", rubric));
        }
        if let Some(model_answer) = &request.model_answer {
            prompt.push_str(&format!("Model Answer: {}\n\n", model_answer));
        }

        prompt.push_str(&format!(
            "Student's Essay: {}\n\n\
             Provide:\n\
             1. A numerical score out of {}\n\
             2. Feedback on strengths and weaknesses\n\
             3. A confidence level (0-1) for your evaluation\n\
             4. Specific suggestions for improvement\n\n\
             Respond with JSON only: {{\"score\": number, \"feedback\": string, \
             \"confidence\": number, \"suggestions\": [string]}}",
            request.essay_text, request.max_score
        ));

        prompt
    }
}

#[async_trait]
impl EssayScorer for OpenAiEssayScorer {
    async fn score_essay(&self, request: EssayScoringRequest) -> AppResult<EssayScore> {
        let prompt = Self::build_prompt(&request);

        let body = json!({
            "model": self.model,
            "max_tokens": 1024,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let response: serde_json::Value =
            self.client.chat().create_byot(body).await.map_err(|err| {
                AppError::InternalError(format!("Essay scoring request failed: {}", err))
            })?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AppError::InternalError("Essay scoring response had no content".to_string())
            })?;

        Ok(parse_score_response(content, request.max_score))
    }
}

/// Reads the model output as JSON, salvaging what it can from free text when
/// the model ignored the format instruction.
fn parse_score_response(content: &str, max_score: f64) -> EssayScore {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(mut parsed) = serde_json::from_str::<EssayScore>(trimmed) {
        parsed.score = parsed.score.clamp(0.0, max_score);
        return parsed;
    }

    log::warn!("Essay score response was not JSON; falling back to text extraction");

    EssayScore {
        score: extract_number(trimmed, "score")
            .unwrap_or(max_score / 2.0)
            .clamp(0.0, max_score),
        feedback: trimmed
            .split("\n\n")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        confidence: extract_number(trimmed, "confidence").unwrap_or(0.7),
        suggestions: Vec::new(),
    }
}

fn extract_number(text: &str, label: &str) -> Option<f64> {
    let pattern = format!(r"(?i){}[\s:]*([0-9]+(?:\.[0-9]+)?)", label);
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Offline scorer used when no remote model is reachable: word count plus
/// structural keyword presence. Confidence is reported low so graders know
/// to review.
pub struct HeuristicEssayScorer;

#[async_trait]
impl EssayScorer for HeuristicEssayScorer {
    async fn score_essay(&self, request: EssayScoringRequest) -> AppResult<EssayScore> {
        let text = request.essay_text.to_lowercase();
        let word_count = request.essay_text.split_whitespace().count();

        let has_introduction = text.contains("introduction") || text.contains("first");
        let has_conclusion = text.contains("conclusion") || text.contains("finally");
        let mentions_question = text.contains(&request.question_text.to_lowercase());

        let max = request.max_score;
        let mut score = 0.0;

        // Word count: 20%.
        score += (word_count as f64 / 50.0).min(1.0) * (max * 0.2);

        // Structure: 30%.
        if has_introduction {
            score += max * 0.1;
        }
        if has_conclusion {
            score += max * 0.1;
        }
        if mentions_question {
            score += max * 0.1;
        }

        // Content baseline: the heuristic cannot judge substance, so it
        // grants half of the remaining 50%.
        score += max * 0.25;

        let structure = if has_introduction && has_conclusion {
            "good"
        } else {
            "fair"
        };
        let relevance = if mentions_question {
            "It addresses the question well."
        } else {
            "It could better address the question."
        };

        Ok(EssayScore {
            score: score.round().clamp(0.0, max),
            feedback: format!(
                "This essay has {} words and {} structure. {}",
                word_count, structure, relevance
            ),
            confidence: 0.5,
            suggestions: vec![
                "Ensure your essay has a clear introduction and conclusion".to_string(),
                "Directly address all parts of the question".to_string(),
                "Use specific examples to support your points".to_string(),
                "Proofread for grammar and spelling errors".to_string(),
            ],
        })
    }
}

/// Primary scorer with an automatic fallback: failures of the remote call
/// degrade to the heuristic instead of failing the grading flow.
pub struct FallbackEssayScorer {
    primary: Arc<dyn EssayScorer>,
    fallback: Arc<dyn EssayScorer>,
}

impl FallbackEssayScorer {
    pub fn new(primary: Arc<dyn EssayScorer>, fallback: Arc<dyn EssayScorer>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl EssayScorer for FallbackEssayScorer {
    async fn score_essay(&self, request: EssayScoringRequest) -> AppResult<EssayScore> {
        match self.primary.score_essay(request.clone()).await {
            Ok(score) => Ok(score),
            Err(err) => {
                log::warn!("Primary essay scorer failed, using fallback: {}", err);
                self.fallback.score_essay(request).await
            }
        }
    }
}
