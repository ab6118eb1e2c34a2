//! Failure taxonomy shared by the store, workspace and preference layers.
//!
//! Nothing here is fatal to the process: every variant is eventually
//! reduced to a one-shot [`crate::notice::Notice`].

use crate::task::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before any remote or local write.
    #[error("{0}")]
    Validation(String),

    /// The hosted data service (or the local task file) failed.
    #[error("service error: {0}")]
    RemoteService(String),

    /// A mutation was attempted without an authenticated user.
    #[error("sign in required")]
    AuthRequired,

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteService(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteService(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
