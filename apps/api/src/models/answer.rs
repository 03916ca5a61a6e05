use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::with_store_id;
use crate::store::Document;

/// One answered question with its score (`userAnswers` collection).
///
/// Field names are the stored wire names and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswer {
    #[serde(default)]
    pub id: Uuid,
    #[serde(rename = "mockIdRef")]
    pub mock_id_ref: Uuid,
    pub question: String,
    #[serde(default)]
    pub correct_ans: String,
    #[serde(default)]
    pub user_ans: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserAnswer {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(with_store_id(doc))
    }
}

/// Body written when an answer is saved; `createdAt` comes from the store.
#[derive(Debug, Serialize)]
pub struct NewUserAnswer<'a> {
    #[serde(rename = "mockIdRef")]
    pub mock_id_ref: Uuid,
    pub question: &'a str,
    pub correct_ans: &'a str,
    pub user_ans: &'a str,
    pub feedback: &'a str,
    pub rating: u8,
}
