// Answer capture workflow: the per-question state machine plus the async
// orchestration that scores and saves an answer.
//
// Remote calls run with the session registry unlocked. Their results are
// applied only if the session is still open and still on the same epoch.

pub mod handlers;
pub mod machine;
pub mod prompts;
pub mod scoring;
pub mod sessions;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::GenerativeModel;
use crate::models::answer::{NewUserAnswer, UserAnswer};
use crate::store::{Collection, DocumentStore, Filter, StoreError};
use crate::ui::{Notice, Redirect};
use machine::{CaptureError, CaptureView, SaveTicket};
use scoring::score_answer;
use sessions::CaptureSessions;

pub const SAVED: &str = "Your answer has been saved.";
pub const SAVE_FAILED: &str = "An error occurred while saving your answer.";

/// Body of every capture action: the fresh view plus one-shot notices.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResponse {
    pub view: CaptureView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Redirect>,
}

impl CaptureResponse {
    pub fn new(view: CaptureView) -> Self {
        Self {
            view,
            notices: Vec::new(),
            next: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

pub fn session_gone(id: Uuid) -> AppError {
    AppError::NotFound(format!("Capture session {id} not found"))
}

fn current_view(sessions: &CaptureSessions, id: Uuid) -> Result<CaptureView, AppError> {
    sessions.with(id, |c| c.view()).ok_or_else(|| session_gone(id))
}

/// Rejections the user can fix in place come back as a notice on the
/// unchanged view. Anything else is an error response.
fn rejected(
    sessions: &CaptureSessions,
    id: Uuid,
    err: CaptureError,
) -> Result<CaptureResponse, AppError> {
    match err {
        CaptureError::AnswerTooShort { .. } | CaptureError::InvalidFeedback => {
            debug!("Capture {id} rejected: {err}");
            Ok(CaptureResponse::new(current_view(sessions, id)?)
                .with_notice(Notice::error("Error").with_description(err.to_string())))
        }
        other => Err(other.into()),
    }
}

/// Recording → Scoring → Scored.
pub async fn stop_and_score(
    sessions: &CaptureSessions,
    model: &dyn GenerativeModel,
    id: Uuid,
) -> Result<CaptureResponse, AppError> {
    let ticket = match sessions
        .with(id, |c| c.stop_recording())
        .ok_or_else(|| session_gone(id))?
    {
        Ok(ticket) => ticket,
        Err(err) => return rejected(sessions, id, err),
    };

    let outcome = score_answer(model, &ticket).await;

    let applied = sessions.with(id, |c| {
        let applied = c.complete_scoring(ticket.epoch, outcome.score.clone());
        (applied, c.view())
    });
    let Some((applied, view)) = applied else {
        debug!("Discarding score for closed capture session {id}");
        return Err(session_gone(id));
    };
    if !applied {
        debug!("Discarding score for capture {} of session {id}", ticket.epoch);
        return Ok(CaptureResponse::new(view));
    }

    let mut response = CaptureResponse::new(view);
    response.notices.extend(outcome.notice);
    Ok(response)
}

enum SaveResult {
    Saved(UserAnswer),
    Duplicate,
}

async fn persist_answer(
    store: &dyn DocumentStore,
    ticket: &SaveTicket,
) -> Result<SaveResult, StoreError> {
    let existing = store
        .query(
            Collection::UserAnswers,
            &[
                Filter::eq("mockIdRef", ticket.interview_id.to_string()),
                Filter::eq("question", ticket.question.question.as_str()),
            ],
        )
        .await?;
    if !existing.is_empty() {
        return Ok(SaveResult::Duplicate);
    }

    let body = serde_json::to_value(NewUserAnswer {
        mock_id_ref: ticket.interview_id,
        question: &ticket.question.question,
        correct_ans: &ticket.question.answer,
        user_ans: &ticket.user_answer,
        feedback: &ticket.score.feedback,
        rating: ticket.score.ratings,
    })?;
    let id = store.create(Collection::UserAnswers, body).await?;

    Ok(SaveResult::Saved(UserAnswer {
        id,
        mock_id_ref: ticket.interview_id,
        question: ticket.question.question.clone(),
        correct_ans: ticket.question.answer.clone(),
        user_ans: ticket.user_answer.clone(),
        feedback: ticket.score.feedback.clone(),
        rating: ticket.score.ratings,
        created_at: None,
    }))
}

/// Scored → Saving → Saved, guarded by a best-effort duplicate check on
/// (interview, question). `on_saved` runs once the answer is stored and the
/// session is still live.
pub async fn save_answer<F>(
    store: &dyn DocumentStore,
    sessions: &CaptureSessions,
    id: Uuid,
    on_saved: Option<F>,
) -> Result<CaptureResponse, AppError>
where
    F: FnOnce(&UserAnswer, &CaptureView) -> Option<Redirect>,
{
    let ticket = match sessions
        .with(id, |c| c.begin_save())
        .ok_or_else(|| session_gone(id))?
    {
        Ok(ticket) => ticket,
        Err(err) => return rejected(sessions, id, err),
    };

    let result = persist_answer(store, &ticket).await;

    let (notice, answer) = match result {
        Ok(SaveResult::Saved(answer)) => (Notice::success(SAVED), Some(answer)),
        Ok(SaveResult::Duplicate) => (
            Notice::info("Already Answered").with_description("You have already answered this question."),
            None,
        ),
        Err(e) => {
            error!("Failed to save answer for session {id}: {e}");
            (Notice::error(SAVE_FAILED), None)
        }
    };

    let applied = sessions.with(id, |c| {
        let applied = match &answer {
            Some(answer) => c.complete_save(ticket.epoch, answer.id),
            None => c.abort_save(ticket.epoch),
        };
        (applied, c.view())
    });
    let Some((applied, view)) = applied else {
        debug!("Discarding save result for closed capture session {id}");
        return Err(session_gone(id));
    };
    if !applied {
        debug!("Discarding save result for capture {} of session {id}", ticket.epoch);
        return Ok(CaptureResponse::new(view));
    }

    let mut response = CaptureResponse::new(view).with_notice(notice);
    if let Some(answer) = answer {
        info!(
            "Saved answer {} for interview {} ({}/10)",
            answer.id, answer.mock_id_ref, answer.rating
        );
        response.next = on_saved.and_then(|f| f(&answer, &response.view));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::QuestionAnswer;
    use crate::response_parser::AnswerScore;
    use crate::store::memory::MemoryStore;
    use crate::testing::ScriptedModel;
    use machine::{AnswerCapture, CaptureState};

    const ANSWER: &str = "A trait object erases the concrete type behind a vtable";

    fn no_continuation() -> Option<fn(&UserAnswer, &CaptureView) -> Option<Redirect>> {
        None
    }

    fn open_recording(sessions: &CaptureSessions, interview_id: Uuid, transcript: &str) -> Uuid {
        let id = sessions.open(AnswerCapture::new(
            Uuid::new_v4(),
            interview_id,
            0,
            1,
            QuestionAnswer::new("What is a trait object?", "Dynamic dispatch via dyn Trait."),
        ));
        sessions
            .with(id, |c| {
                c.start_recording()?;
                c.push_segment(transcript, None)
            })
            .unwrap()
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_short_answer_never_calls_model() {
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_texts([r#"{"ratings": 9, "feedback": "x"}"#]);
        let id = open_recording(&sessions, Uuid::new_v4(), "Too short");

        let response = stop_and_score(&sessions, &model, id).await.unwrap();

        assert_eq!(model.calls(), 0);
        assert_eq!(response.view.state, CaptureState::Idle);
        assert_eq!(
            response.notices[0].description.as_deref(),
            Some("Your answer should be more than 30 characters.")
        );
    }

    #[tokio::test]
    async fn test_score_then_save_then_duplicate() {
        let store = MemoryStore::new();
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_texts([
            r#"{"ratings": 7, "feedback": "Mention vtables earlier."}"#,
            r#"{"ratings": 9, "feedback": "Better."}"#,
        ]);
        let interview = Uuid::new_v4();

        let first = open_recording(&sessions, interview, ANSWER);
        let scored = stop_and_score(&sessions, &model, first).await.unwrap();
        assert_eq!(scored.view.state, CaptureState::Scored);
        assert!(scored.notices.is_empty());

        let mut continued = false;
        let saved = save_answer(
            &store,
            &sessions,
            first,
            Some(|answer: &UserAnswer, _: &CaptureView| {
                continued = answer.rating == 7;
                None
            }),
        )
        .await
        .unwrap();
        assert_eq!(saved.view.state, CaptureState::Saved);
        assert_eq!(saved.notices[0].title, SAVED);
        assert!(continued);

        let second = open_recording(&sessions, interview, ANSWER);
        stop_and_score(&sessions, &model, second).await.unwrap();
        let duplicate = save_answer(&store, &sessions, second, no_continuation())
            .await
            .unwrap();

        assert_eq!(duplicate.notices[0].title, "Already Answered");
        assert_eq!(duplicate.view.state, CaptureState::Scored);
        assert_eq!(store.list(Collection::UserAnswers).await.unwrap().len(), 1);
    }

    /// Accepts writes but cannot read single documents back.
    struct WriteOnlyStore(MemoryStore);

    #[async_trait::async_trait]
    impl DocumentStore for WriteOnlyStore {
        async fn create(&self, collection: Collection, data: serde_json::Value) -> Result<Uuid, StoreError> {
            self.0.create(collection, data).await
        }

        async fn get(&self, _: Collection, _: Uuid) -> Result<Option<crate::store::Document>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn update(&self, collection: Collection, id: Uuid, patch: serde_json::Value) -> Result<(), StoreError> {
            self.0.update(collection, id, patch).await
        }

        async fn query(
            &self,
            collection: Collection,
            filters: &[Filter],
        ) -> Result<Vec<crate::store::Document>, StoreError> {
            self.0.query(collection, filters).await
        }

        async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
            self.0.delete(collection, id).await
        }

        fn changes(&self) -> tokio::sync::broadcast::Receiver<Collection> {
            self.0.changes()
        }
    }

    #[tokio::test]
    async fn test_save_does_not_depend_on_reading_the_answer_back() {
        let store = WriteOnlyStore(MemoryStore::new());
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_texts([r#"{"ratings": 8, "feedback": "Solid."}"#]);
        let interview = Uuid::new_v4();
        let id = open_recording(&sessions, interview, ANSWER);
        stop_and_score(&sessions, &model, id).await.unwrap();

        let saved = save_answer(&store, &sessions, id, no_continuation())
            .await
            .unwrap();

        assert_eq!(saved.view.state, CaptureState::Saved);
        assert_eq!(saved.notices[0].title, SAVED);
        let stored = store.0.list(Collection::UserAnswers).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(saved.view.saved_answer_id, Some(stored[0].id));
        assert_eq!(stored[0].data["mockIdRef"], interview.to_string());
    }

    #[tokio::test]
    async fn test_same_question_in_another_interview_is_not_a_duplicate() {
        let store = MemoryStore::new();
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_texts([
            r#"{"ratings": 6, "feedback": "Ok."}"#,
            r#"{"ratings": 6, "feedback": "Ok."}"#,
        ]);

        for _ in 0..2 {
            let id = open_recording(&sessions, Uuid::new_v4(), ANSWER);
            stop_and_score(&sessions, &model, id).await.unwrap();
            let saved = save_answer(&store, &sessions, id, no_continuation())
                .await
                .unwrap();
            assert_eq!(saved.view.state, CaptureState::Saved);
        }
        assert_eq!(store.list(Collection::UserAnswers).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_still_reaches_scored() {
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_status(503, "overloaded");
        let id = open_recording(&sessions, Uuid::new_v4(), ANSWER);

        let response = stop_and_score(&sessions, &model, id).await.unwrap();
        assert_eq!(response.view.state, CaptureState::Scored);
        assert!(response.notices[0].title.starts_with("Error generating feedback: "));
        let score = sessions.with(id, |c| c.score().cloned()).unwrap().unwrap();
        assert_eq!(score.ratings, 0);
        assert!(score.feedback.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_closed_session_discards_score() {
        let sessions = CaptureSessions::default();
        let model = ScriptedModel::with_texts([r#"{"ratings": 7, "feedback": "Good"}"#]);
        let id = open_recording(&sessions, Uuid::new_v4(), ANSWER);

        let ticket = sessions.with(id, |c| c.stop_recording()).unwrap().unwrap();
        sessions.close(id);
        let outcome = score_answer(&model, &ticket).await;
        assert_eq!(outcome.score, AnswerScore::new(7, "Good"));
        assert!(sessions
            .with(id, |c| c.complete_scoring(ticket.epoch, outcome.score))
            .is_none());
    }

    #[tokio::test]
    async fn test_save_before_scoring_is_a_conflict() {
        let store = MemoryStore::new();
        let sessions = CaptureSessions::default();
        let id = open_recording(&sessions, Uuid::new_v4(), ANSWER);

        let err = save_answer(&store, &sessions, id, no_continuation())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.list(Collection::UserAnswers).await.unwrap().is_empty());
    }
}
