pub mod health;

use axum::{
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};

use crate::capture::handlers as capture;
use crate::dashboard::handlers as dashboard;
use crate::editor::handlers as editor;
use crate::feedback::handlers as feedback;
use crate::state::AppState;
use crate::ui::{NotFoundPage, DASHBOARD_PATH};

async fn not_found() -> (StatusCode, Json<NotFoundPage>) {
    (StatusCode::NOT_FOUND, Json(NotFoundPage::default()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        // Page views
        .route("/generate", get(dashboard::handle_dashboard))
        .route("/generate/live", get(dashboard::handle_live_dashboard))
        .route("/generate/create", get(editor::handle_create_page))
        .route("/generate/interview/:id", get(editor::handle_interview_page))
        .route(
            "/generate/interview/:id/start",
            get(capture::handle_start_page),
        )
        .route(
            "/generate/feedback/:id",
            get(feedback::handle_feedback_page),
        )
        // Interviews API
        .route("/api/v1/interviews", post(editor::handle_create_interview))
        .route(
            "/api/v1/interviews/:id",
            put(editor::handle_update_interview)
                .delete(dashboard::handle_delete_interview),
        )
        // Capture API
        .route(
            "/api/v1/interviews/:id/sessions",
            post(capture::handle_open_session),
        )
        .route(
            "/api/v1/sessions/:sid",
            get(capture::handle_get_session).delete(capture::handle_close_session),
        )
        .route(
            "/api/v1/sessions/:sid/start",
            post(capture::handle_start_recording),
        )
        .route(
            "/api/v1/sessions/:sid/segments",
            post(capture::handle_push_segment),
        )
        .route(
            "/api/v1/sessions/:sid/stop",
            post(capture::handle_stop_recording),
        )
        .route(
            "/api/v1/sessions/:sid/reset",
            post(capture::handle_record_again),
        )
        .route(
            "/api/v1/sessions/:sid/save",
            post(capture::handle_save_answer),
        )
        .route(
            "/api/v1/sessions/:sid/camera",
            post(capture::handle_toggle_camera),
        )
        .route(
            "/api/v1/sessions/:sid/camera/error",
            post(capture::handle_camera_error),
        )
        .fallback(not_found)
        .with_state(state)
}
