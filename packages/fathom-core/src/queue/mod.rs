//! Asynchronous job queue driving the discovery pipeline.
//!
//! Two named lanes — `high` and `default` — each FIFO, each drained by its
//! own pool of worker tasks. A job is an async closure identified by a
//! uuid and a human-readable description; its outcome lands in a registry
//! the CLI can list, so a failed store write is visible to the operator
//! rather than silently swallowed.
//!
//! There is no cancellation mid-job: a job runs to completion on one
//! worker or fails, and every remote call inside a job carries its own
//! timeout so a hung device cannot wedge a worker.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Queue lane a job is enqueued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Default,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => f.write_str("high"),
            Priority::Default => f.write_str("default"),
        }
    }
}

/// Lifecycle of a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed(String),
}

/// Registry entry for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: Uuid,
    pub queue: Priority,
    pub description: String,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type JobFn = Box<dyn FnOnce() -> JobFuture + Send>;

struct QueuedJob {
    id: Uuid,
    job: JobFn,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedJob>>>;

struct Inner {
    high_tx: mpsc::UnboundedSender<QueuedJob>,
    default_tx: mpsc::UnboundedSender<QueuedJob>,
    // Receivers live here so a lane with no workers still holds its
    // jobs instead of closing the channel.
    high_rx: SharedReceiver,
    default_rx: SharedReceiver,
    registry: Mutex<Vec<JobInfo>>,
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Handle to the in-process job queue. Cheap to clone; all clones share
/// the same lanes and registry.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    /// Create the queue and spawn its worker pools. A lane with zero
    /// workers accepts jobs but never runs them (useful in tests that
    /// only inspect what was enqueued).
    pub fn new(high_workers: usize, default_workers: usize) -> Self {
        let (high_tx, high_rx) = mpsc::unbounded_channel();
        let (default_tx, default_rx) = mpsc::unbounded_channel();

        let queue = Self {
            inner: Arc::new(Inner {
                high_tx,
                default_tx,
                high_rx: Arc::new(tokio::sync::Mutex::new(high_rx)),
                default_rx: Arc::new(tokio::sync::Mutex::new(default_rx)),
                registry: Mutex::new(Vec::new()),
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        };

        queue.spawn_workers(Priority::High, high_workers);
        queue.spawn_workers(Priority::Default, default_workers);

        queue
    }

    fn spawn_workers(&self, lane: Priority, count: usize) {
        let rx = match lane {
            Priority::High => self.inner.high_rx.clone(),
            Priority::Default => self.inner.default_rx.clone(),
        };

        for worker in 0..count {
            let rx = rx.clone();
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tracing::debug!("{} worker {} started", lane, worker);
                loop {
                    // Hold the receiver lock only while waiting for the
                    // next job so the pool drains the lane FIFO.
                    let next = { rx.lock().await.recv().await };
                    let Some(queued) = next else {
                        tracing::debug!("{} worker {} stopping, queue closed", lane, worker);
                        break;
                    };

                    inner.mark_started(queued.id);
                    let result = (queued.job)().await;
                    inner.mark_ended(queued.id, result);
                }
            });
        }
    }

    /// Enqueue an async job, returning its id. The description is what an
    /// operator sees in `fathom jobs`.
    pub fn enqueue<F, Fut>(&self, priority: Priority, description: impl Into<String>, job: F) -> Uuid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let description = description.into();

        self.inner.registry.lock().unwrap().push(JobInfo {
            id,
            queue: priority,
            description: description.clone(),
            status: JobStatus::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
            ended_at: None,
        });
        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);

        let queued = QueuedJob {
            id,
            job: Box::new(move || -> JobFuture { Box::pin(job()) }),
        };

        let tx = match priority {
            Priority::High => &self.inner.high_tx,
            Priority::Default => &self.inner.default_tx,
        };

        // The receiver lives in Inner, so the send cannot fail while
        // this handle exists.
        let _ = tx.send(queued);
        tracing::debug!("Enqueued [{}] {}", priority, description);

        id
    }

    /// Wait until no job is queued or running. Lets CLI commands run the
    /// work they enqueued to completion before exiting. The periodic
    /// re-check covers a completion notification landing between the
    /// counter read and the wait registration.
    pub async fn wait_until_idle(&self) {
        loop {
            if self.inner.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            let _ = tokio::time::timeout(
                std::time::Duration::from_millis(50),
                self.inner.idle.notified(),
            )
            .await;
        }
    }

    /// Snapshot of every registry entry, oldest first.
    pub fn jobs(&self) -> Vec<JobInfo> {
        self.inner.registry.lock().unwrap().clone()
    }

    /// Jobs currently queued or running.
    pub fn active(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Jobs that ended in failure.
    pub fn failed(&self) -> Vec<JobInfo> {
        self.jobs()
            .into_iter()
            .filter(|j| matches!(j.status, JobStatus::Failed(_)))
            .collect()
    }

    /// Drop finished and failed entries from the registry.
    pub fn clear_registry(&self) -> usize {
        let mut registry = self.inner.registry.lock().unwrap();
        let before = registry.len();
        registry.retain(|j| matches!(j.status, JobStatus::Queued | JobStatus::Started));
        before - registry.len()
    }
}

impl Inner {
    fn mark_started(&self, id: Uuid) {
        let mut registry = self.registry.lock().unwrap();
        if let Some(info) = registry.iter_mut().find(|j| j.id == id) {
            info.status = JobStatus::Started;
            info.started_at = Some(Utc::now());
        }
    }

    fn mark_ended(&self, id: Uuid, result: Result<()>) {
        {
            let mut registry = self.registry.lock().unwrap();
            if let Some(info) = registry.iter_mut().find(|j| j.id == id) {
                info.ended_at = Some(Utc::now());
                info.status = match &result {
                    Ok(()) => JobStatus::Finished,
                    Err(e) => {
                        tracing::error!("Job failed: {}: {:#}", info.description, e);
                        JobStatus::Failed(format!("{:#}", e))
                    }
                };
            }
        }
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.idle.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn jobs_run_and_finish() {
        let queue = JobQueue::new(1, 1);
        let counter = Arc::new(AtomicU32::new(0));

        for lane in [Priority::High, Priority::Default] {
            let counter = counter.clone();
            queue.enqueue(lane, format!("bump {}", lane), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        queue.wait_until_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(
            queue
                .jobs()
                .iter()
                .all(|j| j.status == JobStatus::Finished)
        );
        assert!(queue.failed().is_empty());
    }

    #[tokio::test]
    async fn lane_is_fifo_with_one_worker() {
        let queue = JobQueue::new(1, 0);
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5u32 {
            let order = order.clone();
            queue.enqueue(Priority::High, format!("job {}", n), move || async move {
                order.lock().unwrap().push(n);
                Ok(())
            });
        }

        queue.wait_until_idle().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn failures_land_in_the_registry() {
        let queue = JobQueue::new(1, 1);

        queue.enqueue(Priority::Default, "doomed", || async {
            Err(anyhow::anyhow!("store rejected a write"))
        });

        queue.wait_until_idle().await;

        let failed = queue.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].description, "doomed");
        match &failed[0].status {
            JobStatus::Failed(msg) => assert!(msg.contains("store rejected")),
            other => panic!("unexpected status {:?}", other),
        }

        assert_eq!(queue.clear_registry(), 1);
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn zero_worker_lane_holds_jobs() {
        let queue = JobQueue::new(0, 0);
        queue.enqueue(Priority::High, "held", || async { Ok(()) });

        assert_eq!(queue.active(), 1);
        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Queued);
    }
}
