//! Upload worker - runs one transport attempt for one task

use super::queue::QueueInner;
use super::types::TaskId;
use crate::api::ProgressFn;
use log::{debug, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

/// Counts a worker as active for its whole lifetime, including time spent
/// waiting for an upload slot.
pub(super) struct WorkerGuard {
    queue: Arc<QueueInner>,
}

impl WorkerGuard {
    pub(super) fn new(queue: Arc<QueueInner>) -> Self {
        queue.active_workers.fetch_add(1, Ordering::SeqCst);
        WorkerGuard { queue }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.queue.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.queue.changed.notify_waiters();
    }
}

/// A Pending task queued for an upload slot
pub(super) struct WaitingUpload {
    pub(super) guard: WorkerGuard,
    pub(super) task_id: TaskId,
    pub(super) attempt: u32,
}

/// Hand out upload slots strictly in the order tasks were queued.
///
/// Runs until every sender (owned by the queue) is gone.
pub(super) async fn run_admissions(
    limiter: Arc<Semaphore>,
    mut waiting: mpsc::UnboundedReceiver<WaitingUpload>,
) {
    while let Some(next) = waiting.recv().await {
        let queue = next.guard.queue.clone();
        let Ok(permit) = limiter.clone().acquire_owned().await else {
            warn!("upload_admission: limiter closed, dropping {}", next.task_id);
            return;
        };
        queue.queued_admissions.fetch_sub(1, Ordering::SeqCst);
        if !queue.begin_attempt(next.task_id, next.attempt) {
            debug!("upload_admission: {} no longer pending", next.task_id);
            continue;
        }
        tokio::spawn(run_upload(next.guard, next.task_id, next.attempt, Some(permit)));
    }
}

/// Upload a task's file, then record the outcome and refresh the collection on success.
///
/// The task must already be Uploading for `attempt`.
pub(super) async fn run_upload(
    guard: WorkerGuard,
    task_id: TaskId,
    attempt: u32,
    permit: Option<OwnedSemaphorePermit>,
) {
    let queue = guard.queue.clone();

    let Some(source) = queue.source_for(task_id, attempt) else {
        debug!("upload_worker: {} no longer uploading", task_id);
        return;
    };

    let progress: ProgressFn = {
        let queue = Arc::downgrade(&queue);
        Arc::new(move |sent, total| {
            if let Some(queue) = queue.upgrade() {
                queue.record_progress(task_id, attempt, sent, total);
            }
        })
    };

    // Slot is held until the transport call returns
    let result = queue.api.upload(&source, progress).await;
    drop(permit);

    match result {
        Ok(created) => {
            debug!(
                "upload_worker: {} created {} records",
                task_id,
                created.len()
            );
            if queue.finish_success(task_id, attempt) {
                // Refresh failures are reported by the store and leave the task Succeeded.
                if let Err(e) = queue.store.refresh().await {
                    warn!("upload_refresh_failed: {} error={}", task_id, e);
                }
            }
        }
        Err(e) => queue.finish_failure(task_id, attempt, &e),
    }

    drop(guard);
}
