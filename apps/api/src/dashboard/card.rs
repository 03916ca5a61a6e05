use serde::Serialize;
use uuid::Uuid;

use crate::models::interview::Interview;
use crate::ui::{feedback_path, interview_path, start_path};

const CREATED_FORMAT: &str = "%B %-d, %Y - %-I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionMethod {
    Get,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAction {
    pub label: &'static str,
    pub href: String,
    pub method: ActionMethod,
}

/// Summary card for one interview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewCard {
    pub id: Uuid,
    pub position: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub created_label: String,
    /// Empty when the card sits on the interview's own pages.
    pub actions: Vec<CardAction>,
}

impl InterviewCard {
    pub fn from_interview(interview: &Interview, on_mock_page: bool) -> Self {
        let id = interview.id;
        let actions = if on_mock_page {
            Vec::new()
        } else {
            vec![
                CardAction {
                    label: "View",
                    href: interview_path(id),
                    method: ActionMethod::Get,
                },
                CardAction {
                    label: "Feedback",
                    href: feedback_path(id),
                    method: ActionMethod::Get,
                },
                CardAction {
                    label: "Start",
                    href: start_path(id),
                    method: ActionMethod::Get,
                },
                CardAction {
                    label: "Delete",
                    href: format!("/api/v1/interviews/{id}"),
                    method: ActionMethod::Delete,
                },
            ]
        };

        Self {
            id,
            position: interview.position.clone(),
            description: interview.description.clone(),
            tech_stack: interview
                .tech_stack_items()
                .into_iter()
                .map(str::to_string)
                .collect(),
            created_label: interview
                .created_at
                .map(|at| at.format(CREATED_FORMAT).to_string())
                .unwrap_or_else(|| "Unknown Date".to_string()),
            actions,
        }
    }
}
