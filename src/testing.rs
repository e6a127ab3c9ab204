//! In-memory media backend and notice recorder for unit tests

use crate::api::{FileRecord, MediaApi, ProgressFn, RecordId};
use crate::error::{MediaError, MediaResult};
use crate::notify::{Notice, NoticeLevel, NotificationSink};
use crate::upload::UploadSource;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scriptable fake of the media backend.
pub(crate) struct FakeApi {
    records: Mutex<Vec<FileRecord>>,
    next_id: AtomicI64,
    list_error: Mutex<Option<String>>,
    upload_errors: Mutex<HashMap<String, Option<String>>>,
    delete_errors: Mutex<HashMap<RecordId, String>>,
    download_errors: Mutex<HashMap<RecordId, String>>,
    upload_delay: Mutex<Duration>,
    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub downloads: Mutex<Vec<RecordId>>,
    /// File names in the order their uploads started
    pub upload_order: Mutex<Vec<String>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        FakeApi {
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            list_error: Mutex::new(None),
            upload_errors: Mutex::new(HashMap::new()),
            delete_errors: Mutex::new(HashMap::new()),
            download_errors: Mutex::new(HashMap::new()),
            upload_delay: Mutex::new(Duration::from_millis(10)),
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
            upload_order: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub fn with_records(records: Vec<FileRecord>) -> Self {
        let api = FakeApi::default();
        api.set_records(records);
        api
    }

    pub fn set_records(&self, records: Vec<FileRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn server_records(&self) -> Vec<FileRecord> {
        self.records.lock().unwrap().clone()
    }

    /// `Some(detail)` makes list calls fail, `None` heals them.
    pub fn fail_list(&self, detail: Option<&str>) {
        *self.list_error.lock().unwrap() = detail.map(str::to_string);
    }

    /// Uploads of `file_name` fail; `detail = None` simulates a failure without a message.
    pub fn fail_upload(&self, file_name: &str, detail: Option<&str>) {
        self.upload_errors
            .lock()
            .unwrap()
            .insert(file_name.to_string(), detail.map(str::to_string));
    }

    pub fn heal_upload(&self, file_name: &str) {
        self.upload_errors.lock().unwrap().remove(file_name);
    }

    pub fn fail_delete(&self, id: RecordId, detail: &str) {
        self.delete_errors.lock().unwrap().insert(id, detail.to_string());
    }

    pub fn fail_download(&self, id: RecordId, detail: &str) {
        self.download_errors.lock().unwrap().insert(id, detail.to_string());
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl MediaApi for FakeApi {
    async fn list(&self) -> MediaResult<Vec<FileRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(detail) = self.list_error.lock().unwrap().clone() {
            return Err(MediaError::transport("List", Some(500), detail));
        }
        Ok(self.server_records())
    }

    async fn upload(&self, source: &UploadSource, progress: ProgressFn) -> MediaResult<Vec<FileRecord>> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_order.lock().unwrap().push(source.name().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.upload_delay.lock().unwrap();
        let total = 100;
        for sent in [25, 50, 75] {
            tokio::time::sleep(delay / 4).await;
            progress(sent, total);
        }
        tokio::time::sleep(delay / 4).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self.upload_errors.lock().unwrap().get(source.name()).cloned();
        match failure {
            Some(Some(detail)) => Err(MediaError::transport("Upload", Some(400), detail)),
            Some(None) => Err(MediaError::transport("Upload", None, "Upload failed")),
            None => {
                progress(total, total);
                let record = FileRecord::new(
                    self.next_id.fetch_add(1, Ordering::SeqCst),
                    source.name(),
                    source.mime_type(),
                );
                self.records.lock().unwrap().push(record.clone());
                Ok(vec![record])
            }
        }
    }

    async fn delete(&self, id: RecordId) -> MediaResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(detail) = self.delete_errors.lock().unwrap().get(&id).cloned() {
            return Err(MediaError::transport("Delete", Some(404), detail));
        }
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn rename(&self, id: RecordId, new_name: &str) -> MediaResult<()> {
        tokio::task::yield_now().await;
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.filename = new_name.to_string();
                Ok(())
            }
            None => Err(MediaError::transport("Rename", Some(404), "Media not found")),
        }
    }

    async fn download(&self, id: RecordId) -> MediaResult<Bytes> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.downloads.lock().unwrap().push(id);

        if let Some(detail) = self.download_errors.lock().unwrap().get(&id).cloned() {
            return Err(MediaError::transport("Download", Some(404), detail));
        }
        let name = self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.filename.clone())
            .unwrap_or_default();
        Ok(Bytes::from(format!("content of {}", name)))
    }
}

/// Route `log` output through the test harness. Safe to call from every test.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.messages(NoticeLevel::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NoticeLevel::Success)
    }

    fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
