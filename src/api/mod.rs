//! Media API module - transport for the media backend
//!
//! This module is organized into submodules:
//! - `types`: Record types and the `MediaApi` trait
//! - `client`: reqwest-backed `HttpMediaApi`
//! - `list`: List operation
//! - `objects`: Object operations (delete, rename)
//! - `upload`: Multipart upload with progress
//! - `download`: Binary download

mod client;
mod download;
mod list;
mod objects;
mod types;
mod upload;

// Re-export types
pub use types::{FileRecord, MediaApi, ProgressFn, RecordId};

// Re-export client
pub use client::HttpMediaApi;

