use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::with_store_id;
use crate::store::Document;

/// One generated question and the model's reference answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

impl QuestionAnswer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A job profile plus its generated question set (`interviews` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub tech_stack: String,
    #[serde(default, deserialize_with = "deserialize_questions")]
    pub questions: Vec<QuestionAnswer>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Interview {
    /// Maps a stored document, merging the store id into the record.
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(with_store_id(doc))
    }

    /// Tech stack entries as shown on badges.
    pub fn tech_stack_items(&self) -> Vec<&str> {
        self.tech_stack
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// The editor-owned part of an interview body. Timestamps are stamped by the
/// store, the id is assigned by it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFields<'a> {
    pub position: &'a str,
    pub description: &'a str,
    pub experience: f64,
    pub tech_stack: &'a str,
    pub questions: &'a [QuestionAnswer],
}

fn deserialize_questions<'de, D>(deserializer: D) -> Result<Vec<QuestionAnswer>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(questions_from_value(&value))
}

/// Reads a stored `questions` value. Arrays are the current shape; a string is
/// the raw model text some older documents carry.
pub fn questions_from_value(value: &Value) -> Vec<QuestionAnswer> {
    match value {
        Value::Array(items) => items.iter().filter_map(question_from_item).collect(),
        Value::String(text) => extract_legacy_questions(text),
        Value::Null => Vec::new(),
        other => {
            warn!("Unexpected questions shape in stored interview: {other}");
            Vec::new()
        }
    }
}

fn question_from_item(item: &Value) -> Option<QuestionAnswer> {
    let question = item.get("question")?.as_str()?;
    let answer = item.get("answer").and_then(Value::as_str).unwrap_or_default();
    Some(QuestionAnswer::new(question, answer))
}

fn fenced_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"json\s*([\s\S]*?)\s*```").expect("valid fenced json regex"))
}

fn question_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\*Question:\* "(.*?)"|\*Question:\* (.*?)(?:\r?\n|$)|Question: "(.*?)"|Question: (.*?)(?:\r?\n|$)"#,
        )
        .expect("valid question line regex")
    })
}

/// Pulls questions out of raw model text: a fenced JSON array when present,
/// otherwise `Question: ...` lines (with empty reference answers).
pub fn extract_legacy_questions(text: &str) -> Vec<QuestionAnswer> {
    if text.contains("json") {
        let fenced = fenced_json_regex()
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok());
        match fenced {
            Some(Value::Array(items)) => {
                return items.iter().filter_map(question_from_item).collect();
            }
            Some(_) => {}
            None => warn!("Stored questions mention json but hold no parsable fenced array"),
        }
    }

    question_line_regex()
        .captures_iter(text)
        .filter_map(|c| (1..=4).find_map(|i| c.get(i)))
        .map(|m| m.as_str().trim())
        .filter(|q| !q.is_empty())
        .map(|q| QuestionAnswer::new(q, ""))
        .collect()
}
