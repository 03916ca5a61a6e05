// Interview record editor: validates the job profile, asks the model for a
// question set and persists the interview (create or overwrite).

pub mod handlers;
pub mod prompts;
pub mod validation;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{GenerativeModel, LlmError};
use crate::models::interview::{Interview, InterviewFields, QuestionAnswer};
use crate::response_parser::{default_questions, parse_questions, ParseOutcome};
use crate::store::{Collection, DocumentStore, StoreError};
use prompts::build_questions_prompt;
use validation::{validate, InterviewForm, ValidatedForm};

/// Notice shown when the model call itself fails.
pub const GENERATION_FAILED: &str = "Failed to generate questions from AI.";

/// One model call, parsed in array mode. A reply with no text parses to the
/// default question set like any other unusable reply.
pub async fn generate_questions(
    model: &dyn GenerativeModel,
    form: &ValidatedForm,
) -> Result<ParseOutcome<Vec<QuestionAnswer>>, LlmError> {
    let prompt = build_questions_prompt(form);
    let response = model.send_message(&prompt).await?;
    Ok(parse_questions(&response.text().unwrap_or_default()))
}

/// A written interview, plus whether the model call failed and the default
/// question set was saved in its place.
#[derive(Debug)]
pub struct SavedInterview {
    pub interview: Interview,
    pub generation_failed: bool,
}

/// Validates `form`, generates questions and writes the interview. With
/// `existing` set the stored interview is overwritten instead of created.
///
/// A failed model call does not abort the save: the default question set is
/// written and `generation_failed` is set so the caller can warn the user.
pub async fn save_interview(
    store: &dyn DocumentStore,
    model: &dyn GenerativeModel,
    form: &InterviewForm,
    existing: Option<Uuid>,
) -> Result<SavedInterview, AppError> {
    let form = validate(form).map_err(|errors| {
        debug!("Interview form rejected: {} field error(s)", errors.len());
        AppError::InvalidFields(errors)
    })?;

    if let Some(id) = existing {
        if store.get(Collection::Interviews, id).await?.is_none() {
            return Err(AppError::InterviewNotFound(id));
        }
    }

    let (questions, generation_failed) = match generate_questions(model, &form).await {
        Ok(outcome) => {
            if outcome.is_fallback() {
                info!("Saving placeholder questions for '{}'", form.position);
            }
            (outcome.into_value(), false)
        }
        Err(e) => {
            error!("Question generation failed for '{}': {e}", form.position);
            (default_questions(), true)
        }
    };

    let body = serde_json::to_value(InterviewFields {
        position: &form.position,
        description: &form.description,
        experience: form.experience,
        tech_stack: &form.tech_stack,
        questions: &questions,
    })
    .map_err(StoreError::from)?;

    let id = match existing {
        Some(id) => {
            store.update(Collection::Interviews, id, body).await?;
            id
        }
        None => store.create(Collection::Interviews, body).await?,
    };

    info!(
        "Saved interview {id} ({}) with {} questions",
        form.position,
        questions.len()
    );

    Ok(SavedInterview {
        interview: load_interview(store, id).await?,
        generation_failed,
    })
}

/// Reads one interview, mapping a missing document to `InterviewNotFound`.
pub async fn load_interview(store: &dyn DocumentStore, id: Uuid) -> Result<Interview, AppError> {
    let doc = store
        .get(Collection::Interviews, id)
        .await?
        .ok_or(AppError::InterviewNotFound(id))?;
    Ok(Interview::from_document(doc).map_err(StoreError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response_parser::{DEFAULT_ANSWER, DEFAULT_QUESTION};
    use crate::store::memory::MemoryStore;
    use crate::testing::{five_questions_reply, ScriptedModel};
    use serde_json::json;

    fn form() -> InterviewForm {
        InterviewForm {
            position: "Backend Engineer".to_string(),
            description: "Design and run the billing services".to_string(),
            experience: json!("3"),
            tech_stack: "Rust, Postgres".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_calls_model_once_and_persists_questions() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_texts([five_questions_reply()]);

        let saved = save_interview(&store, &model, &form(), None).await.unwrap();
        let interview = saved.interview;

        assert!(!saved.generation_failed);
        assert_eq!(model.calls(), 1);
        let prompt = &model.prompts()[0];
        for value in ["Backend Engineer", "Design and run the billing services", "3", "Rust, Postgres"] {
            assert!(prompt.contains(value), "prompt is missing {value}");
        }
        assert_eq!(interview.questions.len(), 5);
        assert!(interview.created_at.is_some());
        assert_eq!(store.list(Collection::Interviews).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_never_calls_model() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_texts([five_questions_reply()]);
        let mut bad = form();
        bad.position.clear();

        let err = save_interview(&store, &model, &bad, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidFields(ref e) if e.len() == 1));
        assert_eq!(model.calls(), 0);
        assert!(store.list(Collection::Interviews).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_saves_default_question() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_status(503, "backend unavailable");

        let saved = save_interview(&store, &model, &form(), None).await.unwrap();
        assert!(saved.generation_failed);
        assert_eq!(
            saved.interview.questions,
            vec![QuestionAnswer::new(DEFAULT_QUESTION, DEFAULT_ANSWER)]
        );
        assert_eq!(saved.interview.position, "Backend Engineer");
        assert_eq!(store.list(Collection::Interviews).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_reply_saves_default_question() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_texts(["I cannot help with that."]);

        let saved = save_interview(&store, &model, &form(), None).await.unwrap();
        assert!(!saved.generation_failed);
        assert_eq!(
            saved.interview.questions,
            vec![QuestionAnswer::new(DEFAULT_QUESTION, DEFAULT_ANSWER)]
        );
    }

    #[tokio::test]
    async fn test_edit_overwrites_fields_and_stamps_update() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_texts([
            five_questions_reply(),
            r#"[{"question": "Q", "answer": "A"}]"#.to_string(),
        ]);
        let created = save_interview(&store, &model, &form(), None)
            .await
            .unwrap()
            .interview;

        let mut edited = form();
        edited.position = "Staff Engineer".to_string();
        let updated = save_interview(&store, &model, &edited, Some(created.id))
            .await
            .unwrap()
            .interview;

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.position, "Staff Engineer");
        assert_eq!(updated.questions, vec![QuestionAnswer::new("Q", "A")]);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(store.list(Collection::Interviews).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_unknown_interview_is_not_found() {
        let store = MemoryStore::new();
        let model = ScriptedModel::with_texts([five_questions_reply()]);
        let id = Uuid::new_v4();

        let err = save_interview(&store, &model, &form(), Some(id)).await.unwrap_err();
        assert!(matches!(err, AppError::InterviewNotFound(missing) if missing == id));
        assert_eq!(model.calls(), 0);
    }
}
