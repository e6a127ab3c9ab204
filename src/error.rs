//! Error taxonomy shared by the transport, queue and bulk layers

use crate::api::RecordId;
use crate::upload::TaskId;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    /// A single call against the media backend failed.
    #[error("{operation} failed: {detail}")]
    Transport {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// One or more items of a bulk operation failed.
    #[error("{operation} failed for {failed} of {total} files: {first_detail}")]
    Aggregate {
        operation: &'static str,
        failed: usize,
        total: usize,
        first_detail: String,
    },

    /// Rejected locally before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("unknown upload task {0}")]
    UnknownTask(TaskId),

    #[error("unknown file record {0}")]
    UnknownRecord(RecordId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MediaError {
    pub(crate) fn transport(
        operation: &'static str,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        MediaError::Transport {
            operation,
            status,
            detail: detail.into(),
        }
    }

    /// Text shown to the user: the server detail when there is one.
    pub fn user_message(&self) -> String {
        match self {
            MediaError::Transport { detail, .. } => detail.clone(),
            MediaError::Aggregate { operation, .. } => format!("{} failed", operation),
            MediaError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MediaError::Validation(_))
    }
}
