//! Filter, search, sort and paginate a record collection

use crate::api::FileRecord;
use crate::config::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column to sort records by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Size,
    #[default]
    Date,
}

/// Sort order (ascending or descending).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Everything the projection depends on besides the records themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub search_term: String,
    /// MIME prefix; empty matches every record
    pub type_filter: String,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    /// 1-based
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            search_term: String::new(),
            type_filter: String::new(),
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            page_index: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One rendered page of the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub items: Vec<FileRecord>,
    pub filtered_count: usize,
    pub page_count: usize,
    pub page_index: usize,
}

impl Projection {
    pub fn ids(&self) -> Vec<crate::api::RecordId> {
        self.items.iter().map(|r| r.id).collect()
    }
}

/// `ceil(filtered_count / page_size)`; zero records means zero pages.
pub fn page_count(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1))
}

/// Clamp a page index into `[1, max(1, page_count)]`.
pub fn clamp_page(page_index: usize, filtered_count: usize, page_size: usize) -> usize {
    page_index.clamp(1, page_count(filtered_count, page_size).max(1))
}

fn matches_type(record: &FileRecord, type_filter: &str) -> bool {
    type_filter.is_empty() || record.mime_type.starts_with(type_filter)
}

/// `needle` must already be lower-cased.
fn matches_search(record: &FileRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.filename.to_lowercase().contains(needle)
        || record.mime_type.to_lowercase().contains(needle)
}

fn compare(a: &FileRecord, b: &FileRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .filename
            .to_lowercase()
            .cmp(&b.filename.to_lowercase())
            .then_with(|| a.filename.cmp(&b.filename)),
        SortKey::Size => a.size_bytes.unwrap_or(0).cmp(&b.size_bytes.unwrap_or(0)),
        SortKey::Date => {
            let millis = |r: &FileRecord| r.created_at.map(|d| d.timestamp_millis()).unwrap_or(0);
            millis(a).cmp(&millis(b))
        }
    }
}

/// Filter and sort a copy of `records`. The input order is never touched;
/// ties keep their input order in both directions.
pub fn filter_and_sort(records: &[FileRecord], state: &ViewState) -> Vec<FileRecord> {
    let needle = state.search_term.trim().to_lowercase();
    let mut result: Vec<FileRecord> = records
        .iter()
        .filter(|r| matches_type(r, &state.type_filter))
        .filter(|r| matches_search(r, &needle))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare(a, b, state.sort_key);
        match state.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    result
}

/// Compute the visible page. An out-of-range `page_index` is clamped.
pub fn project(records: &[FileRecord], state: &ViewState) -> Projection {
    let filtered = filter_and_sort(records, state);
    let page_size = state.page_size.max(1);
    let filtered_count = filtered.len();
    let page_index = clamp_page(state.page_index, filtered_count, page_size);

    let start = (page_index - 1) * page_size;
    let items = filtered.into_iter().skip(start).take(page_size).collect();

    Projection {
        items,
        filtered_count,
        page_count: page_count(filtered_count, page_size),
        page_index,
    }
}
