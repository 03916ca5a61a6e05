//! Dashboard list state and its pure render.

use serde::Serialize;
use tracing::{error, warn};

use super::card::InterviewCard;
use crate::models::interview::Interview;
use crate::store::{Document, StoreError};
use crate::ui::{Notice, CREATE_PATH};

/// Skeleton rows shown until the first snapshot arrives.
pub const PLACEHOLDER_ROWS: usize = 6;

const LOAD_FAILED: &str = "Something went wrong. Try again later.";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Pending,
    Loaded(Vec<Interview>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyState {
    pub title: &'static str,
    pub description: &'static str,
    pub action_label: &'static str,
    pub action_href: &'static str,
}

const EMPTY_STATE: EmptyState = EmptyState {
    title: "No Data Found",
    description: "There are no available interviews. Please add a new mock interview.",
    action_label: "Add New",
    action_href: CREATE_PATH,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DashboardBody {
    Loading { placeholders: usize },
    Cards { cards: Vec<InterviewCard> },
    Empty(EmptyState),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPage {
    pub heading: &'static str,
    pub description: &'static str,
    pub create_href: &'static str,
    pub body: DashboardBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// Holds the latest snapshot, or the pending state before the first one.
#[derive(Debug, Clone)]
pub struct DashboardView {
    state: DashboardState,
    notice: Option<Notice>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            state: DashboardState::Pending,
            notice: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Replaces the list with a full snapshot. Documents that no longer map
    /// to an interview are skipped.
    pub fn apply_snapshot(&mut self, docs: Vec<Document>) {
        let interviews = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id;
                Interview::from_document(doc)
                    .map_err(|e| warn!("Skipping unreadable interview {id}: {e}"))
                    .ok()
            })
            .collect();
        self.state = DashboardState::Loaded(interviews);
        self.notice = None;
    }

    /// A failed feed stops the loading state and shows an error notice.
    pub fn apply_error(&mut self, err: &StoreError) {
        error!("Dashboard feed failed: {err}");
        if self.state == DashboardState::Pending {
            self.state = DashboardState::Loaded(Vec::new());
        }
        self.notice = Some(Notice::error(LOAD_FAILED));
    }

    pub fn render(&self) -> DashboardPage {
        let body = match &self.state {
            DashboardState::Pending => DashboardBody::Loading {
                placeholders: PLACEHOLDER_ROWS,
            },
            DashboardState::Loaded(interviews) if interviews.is_empty() => {
                DashboardBody::Empty(EMPTY_STATE)
            }
            DashboardState::Loaded(interviews) => DashboardBody::Cards {
                cards: interviews
                    .iter()
                    .map(|i| InterviewCard::from_interview(i, false))
                    .collect(),
            },
        };

        DashboardPage {
            heading: "Dashboard",
            description: "Create and start your AI Mock interview",
            create_href: CREATE_PATH,
            body,
            notice: self.notice.clone(),
        }
    }
}
