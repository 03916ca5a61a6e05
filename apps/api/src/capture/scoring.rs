//! Scores one captured answer. Never fails: transport problems become a
//! zero rating whose feedback carries the error, plus a notice for the user.

use thiserror::Error;
use tracing::{error, info};

use super::machine::ScoringTicket;
use super::prompts::build_scoring_prompt;
use crate::llm_client::{GenerativeModel, LlmError};
use crate::response_parser::{parse_score, AnswerScore};
use crate::ui::Notice;

pub const QUOTA_EXCEEDED: &str = "Quota exceeded. Please wait 30 seconds or check your API plan at https://ai.google.dev/gemini-api/docs/rate-limits.";

#[derive(Debug, Error)]
enum ScoringFailure {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Invalid response format from AI")]
    NoJsonObject,
}

impl ScoringFailure {
    fn notice(&self) -> Notice {
        match self {
            ScoringFailure::Llm(e) if e.is_rate_limited() => Notice::error(QUOTA_EXCEEDED),
            other => Notice::error(format!("Error generating feedback: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub score: AnswerScore,
    pub notice: Option<Notice>,
}

async fn request_score(
    model: &dyn GenerativeModel,
    ticket: &ScoringTicket,
) -> Result<AnswerScore, ScoringFailure> {
    let prompt = build_scoring_prompt(
        &ticket.question.question,
        &ticket.user_answer,
        &ticket.question.answer,
    );
    let text = model
        .send_message(&prompt)
        .await?
        .text()
        .ok_or(LlmError::EmptyContent)?;

    if !(text.contains('{') && text.contains('}')) {
        return Err(ScoringFailure::NoJsonObject);
    }
    Ok(parse_score(&text).into_value())
}

pub async fn score_answer(model: &dyn GenerativeModel, ticket: &ScoringTicket) -> ScoringOutcome {
    match request_score(model, ticket).await {
        Ok(score) => {
            info!("Answer scored {}/10", score.ratings);
            ScoringOutcome { score, notice: None }
        }
        Err(failure) => {
            error!("Scoring failed: {failure}");
            ScoringOutcome {
                score: AnswerScore::new(0, format!("Error: {failure}")),
                notice: Some(failure.notice()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::QuestionAnswer;
    use crate::testing::ScriptedModel;

    fn ticket() -> ScoringTicket {
        ScoringTicket {
            epoch: 0,
            question: QuestionAnswer::new("What is a closure?", "A function with captured state."),
            user_answer: "A function that remembers the variables around it".to_string(),
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_question_and_both_answers() {
        let model = ScriptedModel::with_texts([r#"{"ratings": 8, "feedback": "Nice"}"#]);
        let outcome = score_answer(&model, &ticket()).await;

        assert_eq!(outcome.score, AnswerScore::new(8, "Nice"));
        assert!(outcome.notice.is_none());
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Question: \"What is a closure?\""));
        assert!(prompt.contains("User Answer: \"A function that remembers"));
        assert!(prompt.contains("Correct Answer: \"A function with captured state.\""));
    }

    #[tokio::test]
    async fn test_rate_limit_gets_quota_notice() {
        let model = ScriptedModel::with_status(429, "Resource has been exhausted");
        let outcome = score_answer(&model, &ticket()).await;

        assert_eq!(outcome.score.ratings, 0);
        assert!(outcome.score.feedback.starts_with("Error: "));
        assert_eq!(outcome.notice.unwrap().title, QUOTA_EXCEEDED);
    }

    #[tokio::test]
    async fn test_reply_without_braces_is_a_failure() {
        let model = ScriptedModel::with_texts(["Great answer, 9 out of 10"]);
        let outcome = score_answer(&model, &ticket()).await;

        assert_eq!(
            outcome.score,
            AnswerScore::new(0, "Error: Invalid response format from AI")
        );
        assert_eq!(
            outcome.notice.unwrap().title,
            "Error generating feedback: Invalid response format from AI"
        );
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_failure() {
        let model = ScriptedModel::with_texts([""]);
        let outcome = score_answer(&model, &ticket()).await;
        assert_eq!(outcome.score.feedback, "Error: No response from AI");
    }

    #[tokio::test]
    async fn test_malformed_object_uses_parser_fallback() {
        let model = ScriptedModel::with_texts([r#"{"ratings": "high", "feedback": "x"}"#]);
        let outcome = score_answer(&model, &ticket()).await;
        assert_eq!(
            outcome.score,
            AnswerScore::new(0, crate::response_parser::UNPARSABLE_FEEDBACK)
        );
        assert!(outcome.notice.is_none());
    }
}
