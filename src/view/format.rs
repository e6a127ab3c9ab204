//! Display helpers for the file table

use crate::api::FileRecord;
use chrono::{DateTime, Utc};

/// Type filter presets offered above the table: `(label, mime prefix)`
pub const TYPE_FILTERS: &[(&str, &str)] = &[
    ("All", ""),
    ("Images", "image/"),
    ("PDF", "application/pdf"),
    ("Text", "text/"),
];

/// Human-readable size; unknown or zero sizes render as "-".
pub fn format_size(bytes: Option<u64>) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return "-".to_string(),
    };
    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.2} MB", value / MB)
    } else {
        format!("{:.2} GB", value / GB)
    }
}

pub fn format_date(created_at: Option<DateTime<Utc>>) -> String {
    match created_at {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Badge text: upper-cased MIME subtype, or the raw type if it has none.
pub fn type_badge(mime_type: &str) -> String {
    match mime_type.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype.to_uppercase(),
        _ => mime_type.to_string(),
    }
}

/// Owner column; the backend sends "" for unknown owners.
pub fn display_owner(record: &FileRecord) -> Option<&str> {
    record.owner.as_deref().filter(|o| !o.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Document,
    Spreadsheet,
    Archive,
    Text,
    Other,
}

impl FileKind {
    /// Icon classification by MIME type, falling back to the extension.
    pub fn of(record: &FileRecord) -> Self {
        let ext = record
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let mime = record.mime_type.as_str();

        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime == "application/pdf" || ext == "pdf" {
            FileKind::Pdf
        } else if matches!(ext.as_str(), "doc" | "docx") {
            FileKind::Document
        } else if matches!(ext.as_str(), "xls" | "xlsx") {
            FileKind::Spreadsheet
        } else if matches!(ext.as_str(), "zip" | "rar" | "7z") {
            FileKind::Archive
        } else if mime.starts_with("text/") || matches!(ext.as_str(), "txt" | "md" | "csv") {
            FileKind::Text
        } else {
            FileKind::Other
        }
    }
}
