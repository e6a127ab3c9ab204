//! Media record types and the transport seam

use crate::error::MediaResult;
use crate::upload::UploadSource;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

/// Server-assigned media identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value)
    }
}

/// One entry of `GET /media/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: RecordId,
    pub filename: String,
    #[serde(rename = "filetype", default)]
    pub mime_type: String,
    #[serde(rename = "file_size", default)]
    pub size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl FileRecord {
    pub fn new(id: impl Into<RecordId>, filename: impl Into<String>, mime_type: impl Into<String>) -> Self {
        FileRecord {
            id: id.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            size_bytes: None,
            created_at: None,
            owner: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Accepts RFC 3339 timestamps as well as naive ISO timestamps (taken as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
    {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            log::debug!("parse_timestamp: unrecognised {:?}: {}", raw, e);
            None
        }
    }
}

/// Upload progress callback: `(bytes_sent, total_bytes)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Endpoints of the media backend used by the file-management screen.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// `GET /media/list`
    async fn list(&self) -> MediaResult<Vec<FileRecord>>;

    /// `POST /media/upload`, reporting progress as the body is sent
    async fn upload(&self, source: &UploadSource, progress: ProgressFn) -> MediaResult<Vec<FileRecord>>;

    /// `DELETE /media/delete/{id}`
    async fn delete(&self, id: RecordId) -> MediaResult<()>;

    /// `PUT /media/rename/{id}?new_name=...`
    async fn rename(&self, id: RecordId, new_name: &str) -> MediaResult<()>;

    /// `GET /media/download/{id}`
    async fn download(&self, id: RecordId) -> MediaResult<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn list_entry_maps_backend_field_names() {
        let json = r#"{
            "id": 4,
            "filename": "report.pdf",
            "filetype": "application/pdf",
            "gdrive_id": "abc",
            "file_size": 2048,
            "created_at": "2024-03-05T10:20:30.123456+00:00",
            "owner": "admin@example.com"
        }"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, RecordId(4));
        assert_eq!(record.mime_type, "application/pdf");
        assert_eq!(record.size_bytes, Some(2048));
        assert_eq!(record.owner.as_deref(), Some("admin@example.com"));
        let created = record.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2024, 3, 5));
    }

    #[test]
    fn missing_optional_fields_are_absent() {
        let json = r#"{"id": 1, "filename": "a.txt", "filetype": "text/plain", "file_size": null, "created_at": null}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.size_bytes, None);
        assert_eq!(record.created_at, None);
        assert_eq!(record.owner, None);
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let parsed = parse_timestamp("2023-12-31T23:59:58").unwrap();
        assert_eq!(parsed.hour(), 23);
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
