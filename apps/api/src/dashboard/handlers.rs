//! Axum route handlers for the dashboard.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{future, stream, Stream, StreamExt};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::view::{DashboardPage, DashboardView};
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::{subscribe, Collection};
use crate::ui::Notice;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub notice: Notice,
}

fn render_event(view: &DashboardView) -> Event {
    Event::default()
        .event("dashboard")
        .json_data(view.render())
        .unwrap_or_else(|e| {
            error!("Failed to encode dashboard event: {e}");
            Event::default().event("error").data("encode failed")
        })
}

/// GET /generate
///
/// One snapshot of the interview list.
pub async fn handle_dashboard(State(state): State<AppState>) -> Json<DashboardPage> {
    let mut view = DashboardView::new();
    match state.store.list(Collection::Interviews).await {
        Ok(docs) => view.apply_snapshot(docs),
        Err(e) => view.apply_error(&e),
    }
    Json(view.render())
}

/// GET /generate/live
///
/// Server-sent events: the pending page first, then a full render after
/// every change to `interviews`. Closing the connection drops the
/// subscription.
pub async fn handle_live_dashboard(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let pending = render_event(&DashboardView::new());
    let updates = subscribe(state.store.clone(), Collection::Interviews)
        .into_stream()
        .scan(DashboardView::new(), |view, snapshot| {
            match snapshot {
                Ok(docs) => view.apply_snapshot(docs),
                Err(e) => view.apply_error(&e),
            }
            future::ready(Some(render_event(view)))
        });

    let events = stream::once(future::ready(pending))
        .chain(updates)
        .map(Ok::<_, Infallible>);
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// DELETE /api/v1/interviews/:id
///
/// Stored answers for the interview are left in place.
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    state
        .store
        .delete(Collection::Interviews, id)
        .await
        .map_err(AppError::store("Failed to delete interview."))?;

    info!("Deleted interview {id}");
    Ok(Json(DeleteResponse {
        id,
        notice: Notice::success("Interview deleted successfully."),
    }))
}
