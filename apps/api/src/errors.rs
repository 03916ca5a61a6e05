use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::capture::machine::CaptureError;
use crate::editor::validation::FieldError;
use crate::store::StoreError;
use crate::ui::{Notice, Redirect};

/// Notice shown for failures the user can do nothing about.
pub const GENERIC_FAILURE: &str = "Something went wrong.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Interview {0} not found")]
    InterviewNotFound(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid form: {} field(s) failed", .0.len())]
    InvalidFields(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error ({notice}): {source}")]
    Store {
        notice: String,
        #[source]
        source: StoreError,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        AppError::Store {
            notice: GENERIC_FAILURE.to_string(),
            source,
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::AnswerTooShort { .. } | CaptureError::InvalidFeedback => {
                AppError::Validation(err.to_string())
            }
            CaptureError::InvalidTransition { .. } | CaptureError::StaleSegment { .. } => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl AppError {
    /// `map_err` adapter that attaches the notice the user should see.
    pub fn store(notice: &str) -> impl FnOnce(StoreError) -> AppError + '_ {
        move |source| AppError::Store {
            notice: notice.to_string(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let mut redirect = None;

        let (status, code, notice) = match &self {
            AppError::InterviewNotFound(id) => {
                tracing::debug!("Interview {id} not found");
                redirect = Some(Redirect::to_dashboard_after_not_found());
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    Notice::error("Interview not found."),
                )
            }
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                Notice::error(msg.clone()),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                Notice::error("Error").with_description(msg.clone()),
            ),
            AppError::InvalidFields(errors) => {
                fields = Some(errors.clone());
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    Notice::error("Error").with_description("Please fix the highlighted fields."),
                )
            }
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                Notice::error("Error").with_description(msg.clone()),
            ),
            AppError::Store {
                source: StoreError::NotFound { collection, id },
                ..
            } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                Notice::error(format!("Document {collection}/{id} not found.")),
            ),
            AppError::Store { notice, source } => {
                tracing::error!("Store error: {source}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    Notice::error("Error").with_description(notice.clone()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    Notice::error("Error").with_description(GENERIC_FAILURE),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": self.to_string(),
            "notice": notice,
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }
        if let Some(redirect) = redirect {
            error["redirect"] = json!(redirect);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
