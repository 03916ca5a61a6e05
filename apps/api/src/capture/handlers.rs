//! Axum route handlers for the mock-interview page and its capture sessions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::machine::{AnswerCapture, CaptureView};
use super::{current_view, rejected, save_answer, session_gone, stop_and_score, CaptureResponse};
use crate::editor::load_interview;
use crate::errors::AppError;
use crate::models::answer::UserAnswer;
use crate::models::interview::QuestionAnswer;
use crate::state::AppState;
use crate::ui::{
    breadcrumbs, feedback_path, interview_path, start_path, Breadcrumb, Notice, Redirect,
    DASHBOARD_PATH,
};

const NO_QUESTIONS: &str = "No questions found for this interview.";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartPageQuery {
    #[serde(default)]
    pub question: usize,
}

#[derive(Debug, Serialize)]
pub struct Alert {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StartPage {
    pub interview_id: Uuid,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub alert: Alert,
    pub questions: Vec<QuestionAnswer>,
    pub active_question: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Notice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub question_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SegmentRequest {
    pub transcript: String,
    pub epoch: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    /// Move on to the next question (or the feedback page) once saved.
    #[serde(default)]
    pub advance: bool,
}

#[derive(Debug, Deserialize)]
pub struct CameraRequest {
    pub enabled: bool,
}

const IMPORTANT_NOTE: Alert = Alert {
    title: "Important Note",
    description: "Press \"Record Answer\" to begin answering the question. Once you finish \
        the interview, you'll receive feedback comparing your responses with the ideal answers. \
        Note: Your video is never recorded. You can disable the webcam anytime if preferred.",
};

/// Where to go after the answer at `view.question_index` is saved.
fn next_step(view: &CaptureView) -> Redirect {
    let next = view.question_index + 1;
    if next < view.question_count {
        Redirect::after(format!("{}?question={next}", start_path(view.interview_id)), 0)
    } else {
        Redirect::after(feedback_path(view.interview_id), 0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /generate/interview/:id/start
pub async fn handle_start_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StartPageQuery>,
) -> Result<Json<StartPage>, AppError> {
    let interview = load_interview(state.store.as_ref(), id).await?;
    let link = interview_path(id);
    let label = if interview.position.is_empty() {
        "Interview"
    } else {
        interview.position.as_str()
    };

    let error = interview
        .questions
        .is_empty()
        .then(|| Notice::error(NO_QUESTIONS));
    let active_question = query.question.min(interview.questions.len().saturating_sub(1));
    let breadcrumbs = breadcrumbs(
        &[("Mock Interviews", DASHBOARD_PATH), (label, link.as_str())],
        "Start",
    );

    Ok(Json(StartPage {
        interview_id: id,
        breadcrumbs,
        alert: IMPORTANT_NOTE,
        questions: interview.questions,
        active_question,
        error,
    }))
}

/// POST /api/v1/interviews/:id/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<CaptureResponse>), AppError> {
    let interview = load_interview(state.store.as_ref(), interview_id).await?;
    if interview.questions.is_empty() {
        return Err(AppError::Validation(NO_QUESTIONS.to_string()));
    }
    let count = interview.questions.len();
    let question = interview
        .questions
        .get(request.question_index)
        .cloned()
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Question {} does not exist; this interview has {count}",
                request.question_index + 1
            ))
        })?;

    let capture = AnswerCapture::new(
        Uuid::new_v4(),
        interview_id,
        request.question_index,
        count,
        question,
    );
    let view = capture.view();
    state.sessions.open(capture);

    Ok((StatusCode::CREATED, Json(CaptureResponse::new(view))))
}

/// GET /api/v1/sessions/:sid
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<CaptureResponse>, AppError> {
    Ok(Json(CaptureResponse::new(current_view(&state.sessions, sid)?)))
}

/// DELETE /api/v1/sessions/:sid
///
/// Leaving the page. Results still in flight for this session are dropped.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> StatusCode {
    state.sessions.close(sid);
    StatusCode::NO_CONTENT
}

/// POST /api/v1/sessions/:sid/start
pub async fn handle_start_recording(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<CaptureResponse>, AppError> {
    state
        .sessions
        .with(sid, |c| c.start_recording())
        .ok_or_else(|| session_gone(sid))??;
    Ok(Json(CaptureResponse::new(current_view(&state.sessions, sid)?)))
}

/// POST /api/v1/sessions/:sid/segments
pub async fn handle_push_segment(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(request): Json<SegmentRequest>,
) -> Result<Json<CaptureResponse>, AppError> {
    state
        .sessions
        .with(sid, |c| c.push_segment(&request.transcript, request.epoch))
        .ok_or_else(|| session_gone(sid))??;
    Ok(Json(CaptureResponse::new(current_view(&state.sessions, sid)?)))
}

/// POST /api/v1/sessions/:sid/stop
///
/// Stops capture and scores the answer. Answers under 30 characters come
/// back with a notice and no model call.
pub async fn handle_stop_recording(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<CaptureResponse>, AppError> {
    Ok(Json(
        stop_and_score(&state.sessions, state.model.as_ref(), sid).await?,
    ))
}

/// POST /api/v1/sessions/:sid/reset
pub async fn handle_record_again(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<CaptureResponse>, AppError> {
    match state
        .sessions
        .with(sid, |c| c.record_again())
        .ok_or_else(|| session_gone(sid))?
    {
        Ok(_) => Ok(Json(CaptureResponse::new(current_view(&state.sessions, sid)?))),
        Err(err) => rejected(&state.sessions, sid, err).map(Json),
    }
}

/// POST /api/v1/sessions/:sid/save
///
/// The body is optional; without `advance` the page stays on this question.
pub async fn handle_save_answer(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    request: Option<Json<SaveRequest>>,
) -> Result<Json<CaptureResponse>, AppError> {
    let advance = request
        .is_some_and(|Json(r)| r.advance)
        .then_some(|_: &UserAnswer, view: &CaptureView| Some(next_step(view)));
    Ok(Json(
        save_answer(state.store.as_ref(), &state.sessions, sid, advance).await?,
    ))
}

/// POST /api/v1/sessions/:sid/camera
pub async fn handle_toggle_camera(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(request): Json<CameraRequest>,
) -> Result<Json<CaptureResponse>, AppError> {
    let view = state
        .sessions
        .with(sid, |c| {
            c.toggle_camera(request.enabled);
            c.view()
        })
        .ok_or_else(|| session_gone(sid))?;
    Ok(Json(CaptureResponse::new(view)))
}

/// POST /api/v1/sessions/:sid/camera/error
pub async fn handle_camera_error(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<CaptureResponse>, AppError> {
    let view = state
        .sessions
        .with(sid, |c| {
            c.camera_failed();
            c.view()
        })
        .ok_or_else(|| session_gone(sid))?;
    tracing::debug!("Camera unavailable for capture session {sid}");
    Ok(Json(CaptureResponse::new(view)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::machine::CaptureState;

    fn view(index: usize, count: usize) -> CaptureView {
        let view = AnswerCapture::new(
            Uuid::new_v4(),
            Uuid::nil(),
            index,
            count,
            QuestionAnswer::new("Q", "A"),
        )
        .view();
        assert_eq!(view.state, CaptureState::Idle);
        view
    }

    #[test]
    fn test_next_step_advances_to_following_question() {
        let redirect = next_step(&view(0, 5));
        assert_eq!(
            redirect.to,
            "/generate/interview/00000000-0000-0000-0000-000000000000/start?question=1"
        );
    }

    #[test]
    fn test_next_step_after_last_question_opens_feedback() {
        let redirect = next_step(&view(4, 5));
        assert_eq!(redirect.to, feedback_path(Uuid::nil()));
    }
}
