//! Axum route handlers for the interview editor.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::validation::InterviewForm;
use super::{load_interview, save_interview, SavedInterview, GENERATION_FAILED};
use crate::dashboard::card::InterviewCard;
use crate::errors::AppError;
use crate::models::interview::Interview;
use crate::state::AppState;
use crate::ui::{
    breadcrumbs, start_path, Breadcrumb, Notice, Redirect, DASHBOARD_PATH,
    SAVE_REDIRECT_DELAY_MS,
};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SaveInterviewResponse {
    pub interview: Interview,
    pub notice: Notice,
    /// Set when the model call failed and placeholder questions were saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Notice>,
    pub redirect: Redirect,
}

impl SaveInterviewResponse {
    fn saved(saved: SavedInterview) -> Self {
        Self {
            interview: saved.interview,
            notice: Notice::success("Success!").with_description("Mock interview saved."),
            warning: saved
                .generation_failed
                .then(|| Notice::error(GENERATION_FAILED)),
            redirect: Redirect::after(DASHBOARD_PATH, SAVE_REDIRECT_DELAY_MS),
        }
    }
}

/// Field values the form starts with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValues {
    pub position: String,
    pub description: String,
    pub experience: f64,
    pub tech_stack: String,
}

#[derive(Debug, Serialize)]
pub struct EditorPage {
    pub breadcrumbs: Vec<Breadcrumb>,
    pub heading: String,
    pub form: FormValues,
    pub submit_label: &'static str,
    pub can_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview: Option<InterviewCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_link: Option<String>,
}

impl EditorPage {
    fn create() -> Self {
        Self {
            breadcrumbs: breadcrumbs(&[("Mock Interviews", DASHBOARD_PATH)], "Create"),
            heading: "Create a new mock interview".to_string(),
            form: FormValues {
                position: String::new(),
                description: String::new(),
                experience: 0.0,
                tech_stack: String::new(),
            },
            submit_label: "Create",
            can_delete: false,
            interview: None,
            start_link: None,
        }
    }

    fn edit(interview: &Interview) -> Self {
        Self {
            breadcrumbs: breadcrumbs(
                &[("Mock Interviews", DASHBOARD_PATH)],
                &interview.position,
            ),
            heading: interview.position.clone(),
            form: FormValues {
                position: interview.position.clone(),
                description: interview.description.clone(),
                experience: interview.experience,
                tech_stack: interview.tech_stack.clone(),
            },
            submit_label: "Save Changes",
            can_delete: true,
            interview: Some(InterviewCard::from_interview(interview, true)),
            start_link: Some(start_path(interview.id)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    Json(form): Json<InterviewForm>,
) -> Result<(StatusCode, Json<SaveInterviewResponse>), AppError> {
    let saved = save_interview(state.store.as_ref(), state.model.as_ref(), &form, None).await?;
    Ok((StatusCode::CREATED, Json(SaveInterviewResponse::saved(saved))))
}

/// PUT /api/v1/interviews/:id
///
/// Regenerates the question set and overwrites the stored interview.
pub async fn handle_update_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<InterviewForm>,
) -> Result<Json<SaveInterviewResponse>, AppError> {
    let saved =
        save_interview(state.store.as_ref(), state.model.as_ref(), &form, Some(id)).await?;
    Ok(Json(SaveInterviewResponse::saved(saved)))
}

/// GET /generate/create
pub async fn handle_create_page() -> Json<EditorPage> {
    Json(EditorPage::create())
}

/// GET /generate/interview/:id
pub async fn handle_interview_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EditorPage>, AppError> {
    let interview = load_interview(state.store.as_ref(), id).await?;
    Ok(Json(EditorPage::edit(&interview)))
}
