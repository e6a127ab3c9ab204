//! Upload task identifiers, states and event payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue-local task identifier, allocated monotonically at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message used when the transport gives no failure detail
pub const GENERIC_UPLOAD_ERROR: &str = "Upload failed";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadState {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "success")]
    Succeeded,
    #[serde(rename = "error")]
    Failed,
}

impl UploadState {
    /// Succeeded and Failed are the states a task can be dismissed from.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Succeeded | UploadState::Failed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Pending => write!(f, "pending"),
            UploadState::Uploading => write!(f, "uploading"),
            UploadState::Succeeded => write!(f, "success"),
            UploadState::Failed => write!(f, "error"),
        }
    }
}

/// Read-only view of one queued upload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadTaskSnapshot {
    pub task_id: TaskId,
    pub file_name: String,
    pub state: UploadState,
    pub percent: u32,
    pub error: Option<String>,
    pub attempt: u32,
}

/// Events broadcast by the upload queue
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    Added {
        task_id: TaskId,
        file_name: String,
    },
    Progress {
        task_id: TaskId,
        percent: u32,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    StatusChanged {
        task_id: TaskId,
        status: UploadState,
        error: Option<String>,
    },
    Removed {
        task_id: TaskId,
    },
}

/// Integer percent of `sent` over `total`, capped at 100.
pub(crate) fn percent_of(sent: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    std::cmp::min(((sent as f64 / total as f64) * 100.0).round() as u32, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_state_display_matches_expected_strings() {
        assert_eq!(UploadState::Pending.to_string(), "pending");
        assert_eq!(UploadState::Uploading.to_string(), "uploading");
        assert_eq!(UploadState::Succeeded.to_string(), "success");
        assert_eq!(UploadState::Failed.to_string(), "error");
    }

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!UploadState::Pending.is_terminal());
        assert!(!UploadState::Uploading.is_terminal());
        assert!(UploadState::Succeeded.is_terminal());
        assert!(UploadState::Failed.is_terminal());
    }

    #[test]
    fn percent_is_rounded_and_capped() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(5, 4), 100);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = UploadEvent::StatusChanged {
            task_id: TaskId(3),
            status: UploadState::Failed,
            error: Some("quota exceeded".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status_changed");
        assert_eq!(json["status"], "error");
        assert_eq!(json["task_id"], 3);
    }
}
