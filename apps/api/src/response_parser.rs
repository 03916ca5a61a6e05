//! Response parser: turns free-form model text into typed data.
//!
//! Model output is untrusted. Nothing here returns an error: every failure
//! degrades to a fixed fallback value, tagged with the reason and logged at
//! `warn`, so callers can always carry on.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::models::interview::QuestionAnswer;

pub const DEFAULT_QUESTION: &str = "Default question";
pub const DEFAULT_ANSWER: &str = "Default answer";
pub const MISSING_QUESTION: &str = "No question provided";
pub const MISSING_ANSWER: &str = "No answer provided";
pub const UNPARSABLE_FEEDBACK: &str = "Unable to parse AI response.";

pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Fallback { value: T, reason: String },
}

impl<T> ParseOutcome<T> {
    fn fallback(value: T, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Falling back on model response: {reason}");
        ParseOutcome::Fallback { value, reason }
    }

    pub fn into_value(self) -> T {
        match self {
            ParseOutcome::Parsed(value) | ParseOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback { .. })
    }
}

/// A rating plus written feedback for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerScore {
    pub ratings: u8,
    pub feedback: String,
}

impl AnswerScore {
    pub fn new(ratings: u8, feedback: impl Into<String>) -> Self {
        Self {
            ratings,
            feedback: feedback.into(),
        }
    }

    fn unparsable() -> Self {
        Self::new(0, UNPARSABLE_FEEDBACK)
    }
}

/// The single placeholder pair saved when no usable questions came back.
pub fn default_questions() -> Vec<QuestionAnswer> {
    vec![QuestionAnswer::new(DEFAULT_QUESTION, DEFAULT_ANSWER)]
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`+|\bjson\b").expect("valid fence regex"))
}

/// Substring from the first `open` to the last `close`, inclusive.
fn bound(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Strict parse first; on failure strip fence markup and try once more.
fn parse_payload(payload: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(payload).or_else(|_| {
        let stripped = fence_regex().replace_all(payload, "");
        serde_json::from_str(stripped.trim())
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Array mode: an ordered list of question/answer pairs.
///
/// The payload is bounded by whichever of `[` or `{` comes first, so an
/// object root is recognised as the wrong shape instead of being cut down to
/// an inner array.
pub fn parse_questions(text: &str) -> ParseOutcome<Vec<QuestionAnswer>> {
    let text = text.trim();
    let close = match text.find(['[', '{']).map(|i| text.as_bytes()[i]) {
        Some(b'[') => ']',
        Some(_) => '}',
        None => return ParseOutcome::fallback(default_questions(), "no JSON delimiters found"),
    };
    let open = if close == ']' { '[' } else { '{' };

    let Some(payload) = bound(text, open, close) else {
        return ParseOutcome::fallback(default_questions(), "unterminated JSON payload");
    };

    let items = match parse_payload(payload) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            return ParseOutcome::fallback(
                default_questions(),
                format!("expected an array, got {}", kind(&other)),
            )
        }
        Err(e) => return ParseOutcome::fallback(default_questions(), format!("invalid JSON: {e}")),
    };

    if items.is_empty() {
        return ParseOutcome::fallback(default_questions(), "model returned no questions");
    }

    ParseOutcome::Parsed(
        items
            .iter()
            .map(|item| {
                QuestionAnswer::new(
                    text_field(item, "question").unwrap_or(MISSING_QUESTION),
                    text_field(item, "answer").unwrap_or(MISSING_ANSWER),
                )
            })
            .collect(),
    )
}

/// Object mode: `{ratings, feedback}`. Ratings are rounded and clamped to
/// the 0..=10 scale.
pub fn parse_score(text: &str) -> ParseOutcome<AnswerScore> {
    let Some(payload) = bound(text.trim(), '{', '}') else {
        return ParseOutcome::fallback(AnswerScore::unparsable(), "no JSON object found");
    };

    let object = match parse_payload(payload) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return ParseOutcome::fallback(
                AnswerScore::unparsable(),
                format!("expected an object, got {}", kind(&other)),
            )
        }
        Err(e) => {
            return ParseOutcome::fallback(AnswerScore::unparsable(), format!("invalid JSON: {e}"))
        }
    };

    let Some(rating) = object.get("ratings").and_then(Value::as_f64) else {
        return ParseOutcome::fallback(AnswerScore::unparsable(), "ratings is missing or not a number");
    };
    let Some(feedback) = object.get("feedback").and_then(Value::as_str) else {
        return ParseOutcome::fallback(AnswerScore::unparsable(), "feedback is missing or not a string");
    };

    let ratings = rating.round().clamp(0.0, f64::from(MAX_RATING)) as u8;
    ParseOutcome::Parsed(AnswerScore::new(ratings, feedback))
}
