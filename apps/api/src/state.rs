use std::sync::Arc;

use crate::capture::sessions::CaptureSessions;
use crate::llm_client::GenerativeModel;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres or in-memory, per `STORE_BACKEND`.
    pub store: Arc<dyn DocumentStore>,
    pub model: Arc<dyn GenerativeModel>,
    /// Live answer-capture sessions. In-process only; lost on restart.
    pub sessions: CaptureSessions,
}
