//! File-management screen facade
//!
//! Wires the collection store, upload queue, view, selection and bulk
//! coordinator around one `MediaApi` and raises the user-facing notices.

use crate::api::{HttpMediaApi, MediaApi, RecordId};
use crate::bulk::{BulkActionCoordinator, BulkOutcome};
use crate::config::ClientConfig;
use crate::error::{MediaError, MediaResult};
use crate::notify::{LogNotifier, Notice, NotificationSink};
use crate::selection::SelectionSet;
use crate::store::RemoteCollectionStore;
use crate::upload::{TaskId, UploadQueue, UploadSource};
use crate::view::{CollectionView, Projection};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

pub struct MediaManager {
    api: Arc<dyn MediaApi>,
    store: Arc<RemoteCollectionStore>,
    uploads: UploadQueue,
    view: CollectionView,
    selection: SelectionSet,
    coordinator: BulkActionCoordinator,
    notifier: Arc<dyn NotificationSink>,
    download_dir: PathBuf,
}

impl MediaManager {
    /// Build against the HTTP backend described by `config`, logging notices.
    pub fn connect(config: &ClientConfig) -> MediaResult<Self> {
        let api = Arc::new(HttpMediaApi::new(config)?);
        Ok(Self::with_api(api, Arc::new(LogNotifier), config))
    }

    pub fn with_api(
        api: Arc<dyn MediaApi>,
        notifier: Arc<dyn NotificationSink>,
        config: &ClientConfig,
    ) -> Self {
        let store = Arc::new(RemoteCollectionStore::new(api.clone(), notifier.clone()));
        MediaManager {
            uploads: UploadQueue::new(api.clone(), store.clone(), config),
            view: CollectionView::new(store.clone(), config.page_size),
            selection: SelectionSet::new(),
            coordinator: BulkActionCoordinator::new(api.clone(), store.clone()),
            download_dir: config.download_dir(),
            api,
            store,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<RemoteCollectionStore> {
        &self.store
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn view(&self) -> &CollectionView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CollectionView {
        &mut self.view
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// Full re-fetch. Failures keep the current collection and raise a notice.
    pub async fn refresh(&self) -> MediaResult<usize> {
        self.store.refresh().await
    }

    /// Currently visible page.
    pub fn page(&mut self) -> Projection {
        self.view.current()
    }

    /// Header checkbox over the visible page.
    pub fn toggle_select_page(&mut self) {
        let page = self.view.current().ids();
        self.selection.toggle_all(&page);
    }

    pub fn upload_files<I>(&self, files: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = UploadSource>,
    {
        self.uploads.submit(files)
    }

    pub fn retry_upload(&self, task_id: TaskId) -> MediaResult<()> {
        self.uploads.retry(task_id)
    }

    pub fn dismiss_upload(&self, task_id: TaskId) -> MediaResult<()> {
        self.uploads.dismiss(task_id)
    }

    pub async fn delete_file(&mut self, id: RecordId) -> MediaResult<()> {
        if let Err(e) = self.api.delete(id).await {
            return Err(self.report(e));
        }
        self.store.remove(id);
        self.selection.remove_many(&[id]);
        info!("file_delete: {}", id);
        self.notifier.notify(Notice::success("File deleted"));
        Ok(())
    }

    /// Rename on the server, then patch the local record without re-fetching.
    pub async fn rename_file(&self, id: RecordId, new_name: &str) -> MediaResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(self.report(MediaError::Validation(
                "Filename cannot be empty".to_string(),
            )));
        }
        if let Err(e) = self.api.rename(id, new_name).await {
            return Err(self.report(e));
        }
        if let Err(e) = self.store.rename(id, new_name) {
            warn!("file_rename: {} renamed remotely but not held locally: {}", id, e);
        }
        info!("file_rename: {} -> {}", id, new_name);
        self.notifier.notify(Notice::success("File renamed"));
        Ok(())
    }

    pub async fn download_file(&self, id: RecordId) -> MediaResult<PathBuf> {
        match self.coordinator.download_to(id, &self.download_dir).await {
            Ok(path) => {
                self.notifier.notify(Notice::success("File downloaded"));
                Ok(path)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Delete the whole selection, including ids not on the current page.
    pub async fn bulk_delete_selected(&mut self) -> MediaResult<BulkOutcome> {
        if self.selection.is_empty() {
            return Err(self.report(MediaError::Validation("No files selected".to_string())));
        }
        let ids = self.selection.ids().to_vec();
        let outcome = self.coordinator.bulk_delete(&ids, &mut self.selection).await;
        self.announce(&outcome, "Files deleted", "Bulk delete failed");
        Ok(outcome)
    }

    /// Download the selected ids that are on the visible page, one at a time.
    pub async fn bulk_download_selected(&mut self) -> MediaResult<BulkOutcome> {
        let page = self.view.current().ids();
        let ids = self.selection.visible(&page);
        if ids.is_empty() {
            return Err(self.report(MediaError::Validation("No files selected".to_string())));
        }
        let outcome = self.coordinator.bulk_download(&ids, &self.download_dir).await;
        self.announce(&outcome, "Files downloaded", "Bulk download failed");
        Ok(outcome)
    }

    /// Cancel pending expiry timers. In-flight transfers run to completion.
    pub fn shutdown(&self) {
        self.uploads.shutdown();
    }

    fn announce(&self, outcome: &BulkOutcome, success: &str, failure: &str) {
        if outcome.is_success() {
            self.notifier.notify(Notice::success(success));
        } else {
            warn!(
                "{}: {} of {} failed",
                outcome.operation,
                outcome.failed().len(),
                outcome.results.len()
            );
            self.notifier.notify(Notice::error(failure));
        }
    }

    fn report(&self, error: MediaError) -> MediaError {
        self.notifier.notify(Notice::error(error.user_message()));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileRecord;
    use crate::testing::{init_logging, FakeApi, RecordingNotifier};
    use crate::upload::UploadState;
    use crate::view::SortKey;
    use std::sync::atomic::Ordering;

    struct Harness {
        api: Arc<FakeApi>,
        notifier: Arc<RecordingNotifier>,
        manager: MediaManager,
        _dir: tempfile::TempDir,
    }

    async fn harness(records: Vec<FileRecord>) -> Harness {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::with_records(records));
        let notifier = Arc::new(RecordingNotifier::default());
        let config = ClientConfig {
            download_dir: Some(dir.path().to_path_buf()),
            page_size: 2,
            ..Default::default()
        };
        let manager = MediaManager::with_api(api.clone(), notifier.clone(), &config);
        manager.refresh().await.unwrap();
        Harness {
            api,
            notifier,
            manager,
            _dir: dir,
        }
    }

    fn records() -> Vec<FileRecord> {
        vec![
            FileRecord::new(1, "a.txt", "text/plain"),
            FileRecord::new(2, "b.txt", "text/plain"),
            FileRecord::new(3, "c.png", "image/png"),
        ]
    }

    #[tokio::test]
    async fn empty_rename_is_rejected_without_network_call() {
        let h = harness(records()).await;
        let err = h.manager.rename_file(RecordId(1), "   ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.api.server_records()[0].filename, "a.txt");
        assert_eq!(h.notifier.errors(), vec!["Filename cannot be empty".to_string()]);
    }

    #[tokio::test]
    async fn rename_patches_store_and_notifies() {
        let h = harness(records()).await;
        h.manager.rename_file(RecordId(2), " new.txt ").await.unwrap();
        assert_eq!(h.manager.store().get(RecordId(2)).unwrap().filename, "new.txt");
        assert_eq!(h.notifier.successes(), vec!["File renamed".to_string()]);
    }

    #[tokio::test]
    async fn single_delete_drops_from_store_and_selection() {
        let mut h = harness(records()).await;
        h.manager.selection_mut().toggle(RecordId(1));
        h.manager.delete_file(RecordId(1)).await.unwrap();
        assert!(h.manager.store().get(RecordId(1)).is_none());
        assert!(h.manager.selection().is_empty());

        h.api.fail_delete(RecordId(2), "Media not found");
        let err = h.manager.delete_file(RecordId(2)).await.unwrap_err();
        assert_eq!(err.user_message(), "Media not found");
        assert!(h.manager.store().get(RecordId(2)).is_some());
        assert_eq!(h.notifier.errors(), vec!["Media not found".to_string()]);
    }

    #[tokio::test]
    async fn bulk_delete_uses_whole_selection() {
        let mut h = harness(records()).await;
        assert!(h.manager.bulk_delete_selected().await.unwrap_err().is_validation());

        h.manager.view_mut().toggle_sort(SortKey::Name);
        h.manager.toggle_select_page();
        h.manager.view_mut().next_page();
        h.manager.toggle_select_page();
        assert_eq!(h.manager.selection().len(), 3);

        h.api.fail_delete(RecordId(3), "Media not found");
        let outcome = h.manager.bulk_delete_selected().await.unwrap();
        assert_eq!(outcome.succeeded(), vec![RecordId(1), RecordId(2)]);
        assert_eq!(h.manager.selection().ids(), &[RecordId(3)]);
        assert_eq!(h.notifier.errors().last().map(String::as_str), Some("Bulk delete failed"));
    }

    #[tokio::test]
    async fn bulk_download_only_takes_visible_selection() {
        let mut h = harness(records()).await;
        h.manager.view_mut().toggle_sort(SortKey::Name);
        h.manager.selection_mut().toggle(RecordId(3));
        h.manager.toggle_select_page();

        let outcome = h.manager.bulk_download_selected().await.unwrap();
        assert_eq!(outcome.succeeded(), vec![RecordId(1), RecordId(2)]);
        assert_eq!(*h.api.downloads.lock().unwrap(), vec![RecordId(1), RecordId(2)]);
        assert_eq!(h.notifier.successes(), vec!["Files downloaded".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn uploaded_file_appears_in_view() {
        let mut h = harness(Vec::new()).await;
        let ids = h
            .manager
            .upload_files(vec![UploadSource::from_bytes("new.png", "image/png", b"png".to_vec())]);
        h.manager.uploads().settled().await;

        assert_eq!(h.manager.uploads().task(ids[0]).unwrap().state, UploadState::Succeeded);
        assert_eq!(h.api.list_calls.load(Ordering::SeqCst), 2);
        let page = h.manager.page();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].filename, "new.png");
        h.manager.shutdown();
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_notice() {
        let h = harness(records()).await;
        h.api.fail_list(Some("Failed to fetch files"));
        assert!(h.manager.refresh().await.is_err());
        assert_eq!(h.manager.store().len(), 3);
        assert_eq!(h.notifier.errors(), vec!["Failed to fetch files".to_string()]);
    }
}
