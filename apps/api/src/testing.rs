//! Test doubles shared by the unit and router tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::capture::sessions::CaptureSessions;
use crate::llm_client::{GenerationResponse, GenerativeModel, LlmError};
use crate::state::AppState;
use crate::store::memory::MemoryStore;

enum Reply {
    Text(String),
    Status(u16, String),
}

/// `GenerativeModel` that answers from a script and records every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn with_texts<I>(texts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            replies: Mutex::new(texts.into_iter().map(|t| Reply::Text(t.into())).collect()),
            prompts: Mutex::default(),
        }
    }

    /// One failing call with the given HTTP status.
    pub fn with_status(status: u16, message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Reply::Status(status, message.to_string())])),
            prompts: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn send_message(&self, prompt: &str) -> Result<GenerationResponse, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(GenerationResponse::from_text(&text)),
            Some(Reply::Status(status, message)) => Err(LlmError::Api { status, message }),
            None => Err(LlmError::Api {
                status: 500,
                message: "no scripted reply left".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A fenced reply holding five question/answer pairs.
pub fn five_questions_reply() -> String {
    let items: Vec<String> = (1..=5)
        .map(|n| format!(r#"{{"question": "Question {n}?", "answer": "Answer {n}."}}"#))
        .collect();
    format!("Sure! Here are your questions:\n```json\n[{}]\n```", items.join(", "))
}

/// App state over an in-memory store and the given script.
pub fn test_state(model: ScriptedModel) -> (AppState, Arc<ScriptedModel>) {
    let model = Arc::new(model);
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        model: model.clone(),
        sessions: CaptureSessions::default(),
    };
    (state, model)
}
