//! Axum route handlers for the feedback page.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::aggregate::overall_rating;
use crate::dashboard::card::InterviewCard;
use crate::editor::load_interview;
use crate::errors::AppError;
use crate::models::answer::UserAnswer;
use crate::state::AppState;
use crate::store::{Collection, DocumentStore, Filter, StoreError};
use crate::ui::{breadcrumbs, interview_path, Breadcrumb, DASHBOARD_PATH};

const NO_FEEDBACK: &str = "No feedback available for this interview.";
const FEEDBACK_DESCRIPTION: &str = "Your personalized feedback is now available. Dive in to see \
    your strengths, areas for improvement, and tips to help you ace your next interview.";

#[derive(Debug, Serialize)]
pub struct FeedbackItem {
    pub id: Uuid,
    pub question: String,
    pub rating: u8,
    pub expected_answer: String,
    pub user_answer: String,
    pub feedback: String,
}

impl From<UserAnswer> for FeedbackItem {
    fn from(answer: UserAnswer) -> Self {
        Self {
            id: answer.id,
            question: answer.question,
            rating: answer.rating,
            expected_answer: answer.correct_ans,
            user_answer: answer.user_ans,
            feedback: answer.feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedbackPage {
    pub breadcrumbs: Vec<Breadcrumb>,
    pub heading: &'static str,
    pub description: &'static str,
    pub overall_rating: String,
    pub rating_label: String,
    pub interview: InterviewCard,
    pub items: Vec<FeedbackItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

/// Stored answers for one interview. Unreadable records are skipped.
pub async fn answers_for(
    store: &dyn DocumentStore,
    interview_id: Uuid,
) -> Result<Vec<UserAnswer>, StoreError> {
    let docs = store
        .query(
            Collection::UserAnswers,
            &[Filter::eq("mockIdRef", interview_id.to_string())],
        )
        .await?;

    Ok(docs
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id;
            UserAnswer::from_document(doc)
                .map_err(|e| warn!("Skipping unreadable answer {id}: {e}"))
                .ok()
        })
        .collect())
}

/// GET /generate/feedback/:id
pub async fn handle_feedback_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackPage>, AppError> {
    let store = state.store.as_ref();
    let (interview, answers) = tokio::join!(load_interview(store, id), answers_for(store, id));
    let interview = interview?;
    let answers = answers.map_err(AppError::store("Failed to load feedback."))?;

    let overall = overall_rating(&answers);
    let link = interview_path(id);

    Ok(Json(FeedbackPage {
        breadcrumbs: breadcrumbs(
            &[
                ("Mock Interviews", DASHBOARD_PATH),
                (interview.position.as_str(), link.as_str()),
            ],
            "Feedback",
        ),
        heading: "Congratulations!",
        description: FEEDBACK_DESCRIPTION,
        rating_label: format!("{overall} / 10"),
        overall_rating: overall,
        interview: InterviewCard::from_interview(&interview, true),
        empty_message: answers.is_empty().then_some(NO_FEEDBACK),
        items: answers.into_iter().map(FeedbackItem::from).collect(),
    }))
}
