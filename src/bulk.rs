//! Multi-target delete and download with per-id outcomes

use crate::api::{MediaApi, RecordId};
use crate::error::{MediaError, MediaResult};
use crate::selection::SelectionSet;
use crate::store::RemoteCollectionStore;
use futures_util::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Result of one id within a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub id: RecordId,
    pub error: Option<String>,
}

impl ItemResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub operation: &'static str,
    pub results: Vec<ItemResult>,
}

impl BulkOutcome {
    pub fn succeeded(&self) -> Vec<RecordId> {
        self.results
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| r.id)
            .collect()
    }

    pub fn failed(&self) -> Vec<(RecordId, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.id, e)))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(ItemResult::is_ok)
    }

    /// Collapse into `MediaError::Aggregate` when any item failed.
    pub fn into_result(self) -> MediaResult<Vec<RecordId>> {
        let failed = self.failed();
        match failed.first() {
            None => Ok(self.succeeded()),
            Some((_, first_detail)) => Err(MediaError::Aggregate {
                operation: self.operation,
                failed: failed.len(),
                total: self.results.len(),
                first_detail: first_detail.to_string(),
            }),
        }
    }
}

pub struct BulkActionCoordinator {
    api: Arc<dyn MediaApi>,
    store: Arc<RemoteCollectionStore>,
}

impl BulkActionCoordinator {
    pub fn new(api: Arc<dyn MediaApi>, store: Arc<RemoteCollectionStore>) -> Self {
        BulkActionCoordinator { api, store }
    }

    /// Delete every id concurrently.
    ///
    /// Ids whose delete succeeded leave the store and the selection; failed ids stay in both.
    pub async fn bulk_delete(&self, ids: &[RecordId], selection: &mut SelectionSet) -> BulkOutcome {
        info!("bulk_delete: {} files", ids.len());
        let calls = ids.iter().map(|&id| {
            let api = self.api.clone();
            async move {
                let error = api.delete(id).await.err().map(|e| {
                    warn!("bulk_delete: {} failed error={}", id, e);
                    e.user_message()
                });
                ItemResult { id, error }
            }
        });
        let outcome = BulkOutcome {
            operation: "Bulk delete",
            results: join_all(calls).await,
        };

        let deleted = outcome.succeeded();
        let removed = self.store.remove_many(&deleted);
        selection.remove_many(&deleted);
        debug!(
            "bulk_delete: deleted={} removed_locally={} failed={}",
            deleted.len(),
            removed,
            outcome.failed().len()
        );
        outcome
    }

    /// Download each id into `dir`, one at a time. A failed item does not stop the batch.
    pub async fn bulk_download(&self, ids: &[RecordId], dir: &Path) -> BulkOutcome {
        info!("bulk_download: {} files -> {}", ids.len(), dir.display());
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let error = match self.download_to(id, dir).await {
                Ok(_) => None,
                Err(e) => {
                    warn!("bulk_download: {} failed error={}", id, e);
                    Some(e.user_message())
                }
            };
            results.push(ItemResult { id, error });
        }
        BulkOutcome {
            operation: "Bulk download",
            results,
        }
    }

    /// Fetch one record's payload and save it under its filename in `dir`.
    ///
    /// Existing files are never replaced: a taken name gets a ` (n)` suffix.
    pub async fn download_to(&self, id: RecordId, dir: &Path) -> MediaResult<PathBuf> {
        let record = self.store.get(id).ok_or(MediaError::UnknownRecord(id))?;
        let payload = self.api.download(id).await?;

        tokio::fs::create_dir_all(dir).await?;
        let (mut file, destination) =
            create_unique(dir, &local_file_name(&record.filename, id)).await?;
        file.write_all(&payload).await?;
        file.flush().await?;
        debug!(
            "download_saved: {} -> {} ({} bytes)",
            id,
            destination.display(),
            payload.len()
        );
        Ok(destination)
    }
}

/// Create `name` in `dir`, falling back to `stem (1).ext`, `stem (2).ext`, ... while taken.
async fn create_unique(dir: &Path, name: &str) -> MediaResult<(File, PathBuf)> {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (name, String::new()),
    };
    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{} ({}){}", stem, attempt, extension))
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Filename safe to join onto the download directory.
fn local_file_name(filename: &str, id: RecordId) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("download-{}", id),
        _ => cleaned,
    }
}
