//! Client-side upload orchestration and filtered collection view for a media backend.
//!
//! `MediaManager` is the entry point for a file-management screen. The pieces
//! it wires together are usable on their own:
//! - `UploadQueue`: concurrent uploads with per-task progress, retry and expiry
//! - `RemoteCollectionStore`: the fetched collection of `FileRecord`s
//! - `CollectionView`: filtered, searched, sorted and paginated projection
//! - `SelectionSet` and `BulkActionCoordinator`: multi-file delete and download

pub mod api;
pub mod bulk;
pub mod config;
pub mod error;
pub mod manager;
pub mod notify;
pub mod selection;
pub mod store;
pub mod upload;
pub mod view;

#[cfg(test)]
mod testing;

pub use api::{FileRecord, HttpMediaApi, MediaApi, ProgressFn, RecordId};
pub use bulk::{BulkActionCoordinator, BulkOutcome, ItemResult};
pub use config::ClientConfig;
pub use error::{MediaError, MediaResult};
pub use manager::MediaManager;
pub use notify::{LogNotifier, Notice, NoticeLevel, NotificationSink};
pub use selection::SelectionSet;
pub use store::RemoteCollectionStore;
pub use upload::{TaskId, UploadEvent, UploadQueue, UploadSource, UploadState, UploadTaskSnapshot};
pub use view::{CollectionView, Projection, SortDirection, SortKey, ViewState};
