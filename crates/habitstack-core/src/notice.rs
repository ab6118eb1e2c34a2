use serde::Serialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// One-shot user notification. Every failure ends up as one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub title: String,
    pub detail: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn info(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            title: title.into(),
            detail: detail.into(),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        let title = match err {
            Error::Validation(_) => "Invalid input",
            Error::RemoteService(_) => "Something went wrong",
            Error::AuthRequired => "Sign in required",
            Error::NotFound(_) => "Task not found",
            Error::Io(_) | Error::Json(_) => "Could not save",
        };
        Self {
            level: Level::Error,
            title: title.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Notices raised since the caller last drained them.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    notices: Vec<Notice>,
}

impl NoticeQueue {
    pub fn push(&mut self, notice: Notice) {
        tracing::debug!(level = ?notice.level, title = %notice.title, "notice raised");
        self.notices.push(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
