//! Upload queue module with concurrent workers and per-task lifecycle
//!
//! Provides upload orchestration for the media backend with:
//! - One task per submitted file, identified by a queue-local `TaskId`
//! - Progress and status changes broadcast as `UploadEvent`s
//! - Retry of failed tasks in place and dismissal of finished ones
//! - Automatic removal of succeeded tasks after a grace period
//! - Optional admission limit on concurrent transport calls

mod queue;
mod source;
mod types;
mod worker;

pub use queue::UploadQueue;
pub use source::UploadSource;
pub use types::{TaskId, UploadEvent, UploadState, UploadTaskSnapshot, GENERIC_UPLOAD_ERROR};
