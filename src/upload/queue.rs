//! Upload queue - owns task entries and their state transitions

use super::source::UploadSource;
use super::types::{
    percent_of, TaskId, UploadEvent, UploadState, UploadTaskSnapshot, GENERIC_UPLOAD_ERROR,
};
use super::worker::{run_admissions, run_upload, WaitingUpload, WorkerGuard};
use crate::api::MediaApi;
use crate::config::ClientConfig;
use crate::error::{MediaError, MediaResult};
use crate::store::RemoteCollectionStore;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify, Semaphore};
use tokio::task::JoinHandle;

/// Capacity of the event channel; slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 256;

struct TaskEntry {
    id: TaskId,
    source: UploadSource,
    state: UploadState,
    percent: u32,
    error: Option<String>,
    attempt: u32,
    /// Auto-expiry timer, armed on success
    expiry: Option<JoinHandle<()>>,
}

impl TaskEntry {
    fn snapshot(&self) -> UploadTaskSnapshot {
        UploadTaskSnapshot {
            task_id: self.id,
            file_name: self.source.name().to_string(),
            state: self.state,
            percent: self.percent,
            error: self.error.clone(),
            attempt: self.attempt,
        }
    }
}

pub(super) struct QueueInner {
    pub(super) api: Arc<dyn MediaApi>,
    pub(super) store: Arc<RemoteCollectionStore>,
    tasks: Mutex<Vec<TaskEntry>>,
    next_id: AtomicU64,
    limiter: Option<Arc<Semaphore>>,
    /// Feeds the admission task, spawned on first use
    admissions: Mutex<Option<mpsc::UnboundedSender<WaitingUpload>>>,
    /// Tasks handed to the admission task and not yet admitted
    pub(super) queued_admissions: AtomicUsize,
    expiry: Duration,
    events: broadcast::Sender<UploadEvent>,
    pub(super) active_workers: AtomicUsize,
    pub(super) changed: Notify,
    closed: AtomicBool,
}

/// Concurrent upload queue with per-task lifecycle tracking.
///
/// Cloning yields another handle to the same queue. All operations that start
/// transport calls must run inside a Tokio runtime.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

impl UploadQueue {
    pub fn new(
        api: Arc<dyn MediaApi>,
        store: Arc<RemoteCollectionStore>,
        config: &ClientConfig,
    ) -> Self {
        Self::with_limits(api, store, config.upload_limit(), config.success_expiry())
    }

    /// `limit = None` admits every upload immediately.
    pub fn with_limits(
        api: Arc<dyn MediaApi>,
        store: Arc<RemoteCollectionStore>,
        limit: Option<usize>,
        expiry: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        UploadQueue {
            inner: Arc::new(QueueInner {
                api,
                store,
                tasks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                limiter: limit.map(|n| Arc::new(Semaphore::new(n))),
                admissions: Mutex::new(None),
                queued_admissions: AtomicUsize::new(0),
                expiry,
                events,
                active_workers: AtomicUsize::new(0),
                changed: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Queue one task per file and start uploading. Returns ids in submission order.
    pub fn submit<I>(&self, files: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = UploadSource>,
    {
        let ids: Vec<TaskId> = {
            let mut tasks = self.inner.lock_tasks();
            files
                .into_iter()
                .map(|source| {
                    let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
                    info!("upload_submit: {} {}", id, source.name());
                    self.inner.emit(UploadEvent::Added {
                        task_id: id,
                        file_name: source.name().to_string(),
                    });
                    tasks.push(TaskEntry {
                        id,
                        source,
                        state: UploadState::Pending,
                        percent: 0,
                        error: None,
                        attempt: 1,
                        expiry: None,
                    });
                    id
                })
                .collect()
        };

        for id in &ids {
            self.launch(*id, 1);
        }
        ids
    }

    /// Re-run a failed task in place, reusing its file.
    pub fn retry(&self, task_id: TaskId) -> MediaResult<()> {
        let attempt = {
            let mut tasks = self.inner.lock_tasks();
            let entry = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or(MediaError::UnknownTask(task_id))?;
            if entry.state != UploadState::Failed {
                return Err(MediaError::Validation(format!(
                    "Only failed uploads can be retried (task {} is {})",
                    task_id, entry.state
                )));
            }
            entry.attempt += 1;
            entry.percent = 0;
            entry.error = None;
            entry.state = UploadState::Pending;
            info!("upload_retry: {} attempt={}", task_id, entry.attempt);
            self.inner.emit(UploadEvent::StatusChanged {
                task_id,
                status: UploadState::Pending,
                error: None,
            });
            entry.attempt
        };
        self.launch(task_id, attempt);
        Ok(())
    }

    /// Remove a finished task. Cancels its expiry timer if one is armed.
    pub fn dismiss(&self, task_id: TaskId) -> MediaResult<()> {
        let entry = {
            let mut tasks = self.inner.lock_tasks();
            let index = tasks
                .iter()
                .position(|t| t.id == task_id)
                .ok_or(MediaError::UnknownTask(task_id))?;
            if !tasks[index].state.is_terminal() {
                return Err(MediaError::Validation(format!(
                    "Only finished uploads can be dismissed (task {} is {})",
                    task_id, tasks[index].state
                )));
            }
            tasks.remove(index)
        };
        if let Some(timer) = entry.expiry {
            timer.abort();
        }
        info!("upload_dismiss: {}", task_id);
        self.inner.emit(UploadEvent::Removed { task_id });
        self.inner.changed.notify_waiters();
        Ok(())
    }

    /// Tasks in submission order.
    pub fn tasks(&self) -> Vec<UploadTaskSnapshot> {
        self.inner.lock_tasks().iter().map(TaskEntry::snapshot).collect()
    }

    pub fn task(&self, task_id: TaskId) -> Option<UploadTaskSnapshot> {
        self.inner
            .lock_tasks()
            .iter()
            .find(|t| t.id == task_id)
            .map(TaskEntry::snapshot)
    }

    pub fn len(&self) -> usize {
        self.inner.lock_tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until no task is pending or uploading and every worker,
    /// including its post-success refresh, has returned.
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.is_settled() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel all outstanding expiry timers. In-flight uploads still finish,
    /// but no new timers are armed afterwards.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let cancelled = self.inner.cancel_timers();
        debug!("upload_queue_shutdown: cancelled {} timers", cancelled);
    }

    /// Start the attempt now if a slot is free and nobody is queued ahead,
    /// otherwise queue it behind earlier waiters.
    fn launch(&self, task_id: TaskId, attempt: u32) {
        let guard = WorkerGuard::new(self.inner.clone());
        let Some(limiter) = &self.inner.limiter else {
            self.inner.begin_attempt(task_id, attempt);
            tokio::spawn(run_upload(guard, task_id, attempt, None));
            return;
        };

        if self.inner.queued_admissions.load(Ordering::SeqCst) == 0 {
            if let Ok(permit) = limiter.clone().try_acquire_owned() {
                self.inner.begin_attempt(task_id, attempt);
                tokio::spawn(run_upload(guard, task_id, attempt, Some(permit)));
                return;
            }
        }

        debug!("upload_waiting_for_slot: {}", task_id);
        self.inner.queued_admissions.fetch_add(1, Ordering::SeqCst);
        let waiting = WaitingUpload {
            guard,
            task_id,
            attempt,
        };
        if self.inner.admission_sender(limiter).send(waiting).is_err() {
            self.inner.queued_admissions.fetch_sub(1, Ordering::SeqCst);
            warn!("upload_waiting_for_slot: admission closed, dropping {}", task_id);
        }
    }
}

impl QueueInner {
    fn lock_tasks(&self) -> MutexGuard<'_, Vec<TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admission_sender(&self, limiter: &Arc<Semaphore>) -> mpsc::UnboundedSender<WaitingUpload> {
        let mut admissions = self
            .admissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        admissions
            .get_or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                tokio::spawn(run_admissions(limiter.clone(), receiver));
                sender
            })
            .clone()
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events.send(event);
    }

    fn is_settled(&self) -> bool {
        self.active_workers.load(Ordering::SeqCst) == 0
            && self
                .lock_tasks()
                .iter()
                .all(|t| !matches!(t.state, UploadState::Pending | UploadState::Uploading))
    }

    /// Pending -> Uploading for the given attempt. False if the task is gone
    /// or has moved on.
    pub(super) fn begin_attempt(&self, task_id: TaskId, attempt: u32) -> bool {
        let mut tasks = self.lock_tasks();
        let Some(entry) = tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.attempt == attempt)
        else {
            return false;
        };
        if entry.state != UploadState::Pending {
            return false;
        }
        entry.state = UploadState::Uploading;
        entry.percent = 0;
        info!("upload_status: {} -> {}", task_id, UploadState::Uploading);
        self.emit(UploadEvent::StatusChanged {
            task_id,
            status: UploadState::Uploading,
            error: None,
        });
        true
    }

    pub(super) fn source_for(&self, task_id: TaskId, attempt: u32) -> Option<UploadSource> {
        self.lock_tasks()
            .iter()
            .find(|t| t.id == task_id && t.attempt == attempt && t.state == UploadState::Uploading)
            .map(|t| t.source.clone())
    }

    /// Apply a transport progress report. Percent never moves backwards.
    pub(super) fn record_progress(&self, task_id: TaskId, attempt: u32, sent: u64, total: u64) {
        let mut tasks = self.lock_tasks();
        let Some(entry) = tasks.iter_mut().find(|t| {
            t.id == task_id && t.attempt == attempt && t.state == UploadState::Uploading
        }) else {
            return;
        };
        let percent = percent_of(sent, total);
        if percent <= entry.percent {
            return;
        }
        entry.percent = percent;
        self.emit(UploadEvent::Progress {
            task_id,
            percent,
            uploaded_bytes: sent,
            total_bytes: total,
        });
    }

    /// Uploading -> Succeeded, forcing 100% and arming the expiry timer.
    pub(super) fn finish_success(self: &Arc<Self>, task_id: TaskId, attempt: u32) -> bool {
        {
            let mut tasks = self.lock_tasks();
            let Some(entry) = tasks.iter_mut().find(|t| {
                t.id == task_id && t.attempt == attempt && t.state == UploadState::Uploading
            }) else {
                return false;
            };
            entry.state = UploadState::Succeeded;
            entry.percent = 100;
            entry.error = None;
            info!("upload_status: {} -> {}", task_id, UploadState::Succeeded);
            self.emit(UploadEvent::StatusChanged {
                task_id,
                status: UploadState::Succeeded,
                error: None,
            });
            if !self.closed.load(Ordering::SeqCst) {
                entry.expiry = Some(self.arm_expiry(task_id));
            }
        }
        self.changed.notify_waiters();
        true
    }

    /// Uploading -> Failed with the transport's detail (or a generic message).
    pub(super) fn finish_failure(&self, task_id: TaskId, attempt: u32, err: &MediaError) {
        {
            let mut tasks = self.lock_tasks();
            let Some(entry) = tasks.iter_mut().find(|t| {
                t.id == task_id && t.attempt == attempt && t.state == UploadState::Uploading
            }) else {
                return;
            };
            let message = Some(err.user_message())
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string());
            warn!(
                "upload_status: {} -> {} error={}",
                task_id,
                UploadState::Failed,
                message
            );
            entry.state = UploadState::Failed;
            entry.error = Some(message.clone());
            self.emit(UploadEvent::StatusChanged {
                task_id,
                status: UploadState::Failed,
                error: Some(message),
            });
        }
        self.changed.notify_waiters();
    }

    fn arm_expiry(self: &Arc<Self>, task_id: TaskId) -> JoinHandle<()> {
        let queue = Arc::downgrade(self);
        let window = self.expiry;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(queue) = queue.upgrade() {
                queue.expire(task_id);
            }
        })
    }

    fn expire(&self, task_id: TaskId) {
        let removed = {
            let mut tasks = self.lock_tasks();
            match tasks
                .iter()
                .position(|t| t.id == task_id && t.state == UploadState::Succeeded)
            {
                Some(index) => {
                    tasks.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            debug!("upload_expired: {}", task_id);
            self.emit(UploadEvent::Removed { task_id });
            self.changed.notify_waiters();
        }
    }

    fn cancel_timers(&self) -> usize {
        let mut tasks = self.lock_tasks();
        tasks
            .iter_mut()
            .filter_map(|t| t.expiry.take())
            .map(|timer| timer.abort())
            .count()
    }
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
