//! Authoritative in-memory copy of the server's media collection

use crate::api::{FileRecord, MediaApi, RecordId};
use crate::error::{MediaError, MediaResult};
use crate::notify::{Notice, NotificationSink};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::watch;

pub struct RemoteCollectionStore {
    api: Arc<dyn MediaApi>,
    notifier: Arc<dyn NotificationSink>,
    records: RwLock<Arc<Vec<FileRecord>>>,
    revision: watch::Sender<u64>,
    last_error: Mutex<Option<String>>,
}

impl RemoteCollectionStore {
    pub fn new(api: Arc<dyn MediaApi>, notifier: Arc<dyn NotificationSink>) -> Self {
        let (revision, _) = watch::channel(0);
        RemoteCollectionStore {
            api,
            notifier,
            records: RwLock::new(Arc::new(Vec::new())),
            revision,
            last_error: Mutex::new(None),
        }
    }

    /// Replace the collection with a full list fetch.
    ///
    /// On failure the previous collection is kept and an error notice is raised.
    /// Concurrent refreshes are not ordered: the last response to arrive wins.
    pub async fn refresh(&self) -> MediaResult<usize> {
        match self.api.list().await {
            Ok(records) => {
                let count = records.len();
                self.replace_all(records);
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
                info!("collection_refresh: {} records", count);
                Ok(count)
            }
            Err(e) => {
                let message = e.user_message();
                warn!("collection_refresh: failed, keeping previous collection: {}", e);
                *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(message.clone());
                self.notifier.notify(Notice::error(message));
                Err(e)
            }
        }
    }

    /// Swap in a new collection wholesale.
    pub fn replace_all(&self, records: Vec<FileRecord>) {
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(records);
        self.bump_revision();
    }

    /// Drop a record after the server confirmed its deletion.
    pub fn remove(&self, id: RecordId) -> bool {
        self.remove_many(&[id]) > 0
    }

    pub fn remove_many(&self, ids: &[RecordId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let removed = {
            let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
            let next: Vec<FileRecord> = guard
                .iter()
                .filter(|record| !ids.contains(&record.id))
                .cloned()
                .collect();
            let removed = guard.len() - next.len();
            *guard = Arc::new(next);
            removed
        };
        if removed > 0 {
            debug!("collection_remove: {} records", removed);
            self.bump_revision();
        }
        removed
    }

    /// Patch a filename after the server confirmed the rename. Does not re-fetch.
    pub fn rename(&self, id: RecordId, new_name: &str) -> MediaResult<()> {
        {
            let mut guard = self.records.write().unwrap_or_else(PoisonError::into_inner);
            if !guard.iter().any(|record| record.id == id) {
                return Err(MediaError::UnknownRecord(id));
            }
            let next: Vec<FileRecord> = guard
                .iter()
                .map(|record| {
                    if record.id == id {
                        FileRecord {
                            filename: new_name.to_string(),
                            ..record.clone()
                        }
                    } else {
                        record.clone()
                    }
                })
                .collect();
            *guard = Arc::new(next);
        }
        debug!("collection_rename: {} -> {}", id, new_name);
        self.bump_revision();
        Ok(())
    }

    /// Current collection. The snapshot is immutable; later mutations produce a new one.
    pub fn snapshot(&self) -> Arc<Vec<FileRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: RecordId) -> Option<FileRecord> {
        self.snapshot().iter().find(|record| record.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Message of the last failed refresh, cleared by the next successful one.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Revision counter bumped on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
