//! View-model pieces shared by every page: transient notices, delayed
//! redirects, breadcrumbs and the route paths they point at.

use serde::Serialize;
use uuid::Uuid;

pub const DASHBOARD_PATH: &str = "/generate";
pub const CREATE_PATH: &str = "/generate/create";

/// Delay before leaving the editor after a successful save.
pub const SAVE_REDIRECT_DELAY_MS: u64 = 500;
/// Delay before bouncing back to the dashboard from a missing interview.
pub const NOT_FOUND_REDIRECT_DELAY_MS: u64 = 3000;

pub fn interview_path(id: Uuid) -> String {
    format!("/generate/interview/{id}")
}

pub fn start_path(id: Uuid) -> String {
    format!("/generate/interview/{id}/start")
}

pub fn feedback_path(id: Uuid) -> String {
    format!("/generate/feedback/{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A toast-style message for the browser to show once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Notice {
    fn new(level: NoticeLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
        }
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Navigation the browser should perform after `delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redirect {
    pub to: String,
    pub delay_ms: u64,
    /// Replace the history entry instead of pushing a new one.
    pub replace: bool,
}

impl Redirect {
    pub fn after(to: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            to: to.into(),
            delay_ms,
            replace: true,
        }
    }

    pub fn to_dashboard_after_not_found() -> Self {
        Self::after(DASHBOARD_PATH, NOT_FOUND_REDIRECT_DELAY_MS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    /// `None` marks the current page.
    pub link: Option<String>,
}

/// Home, then `items` (label, link), then the current `page`.
pub fn breadcrumbs(items: &[(&str, &str)], page: &str) -> Vec<Breadcrumb> {
    std::iter::once(Breadcrumb {
        label: "Home".to_string(),
        link: Some("/".to_string()),
    })
    .chain(items.iter().map(|(label, link)| Breadcrumb {
        label: (*label).to_string(),
        link: Some((*link).to_string()),
    }))
    .chain(std::iter::once(Breadcrumb {
        label: page.to_string(),
        link: None,
    }))
    .collect()
}

/// Static page for unmatched paths.
#[derive(Debug, Clone, Serialize)]
pub struct NotFoundPage {
    pub title: &'static str,
    pub home_link: &'static str,
}

impl Default for NotFoundPage {
    fn default() -> Self {
        Self {
            title: "404 - Page Not Found",
            home_link: DASHBOARD_PATH,
        }
    }
}
