//! Trigger side of the controller: a deduplicating work queue drained by a
//! fixed pool of workers.
//!
//! A key is never processed by two workers at once. A key enqueued while it
//! is in flight is parked and re-queued once the running invocation ends, so
//! bursts of triggers collapse into at most one extra run.

use kubebuild_core::{AppV1, ObjectKey, Resource};
use kubebuild_storage::DynStore;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinSet;

use crate::reconcile::{Action, DEFAULT_REQUEUE_AFTER, Reconcile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub workers: usize,
    /// Interval between full relists of every App. `None` disables resync.
    pub resync_interval: Option<Duration>,
    /// Delay before retrying a key whose invocation returned an error.
    pub error_requeue_after: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            resync_interval: Some(Duration::from_secs(300)),
            error_requeue_after: DEFAULT_REQUEUE_AFTER,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    in_flight: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
}

impl QueueState {
    /// Returns `true` if a new entry was pushed.
    fn push(&mut self, key: ObjectKey) -> bool {
        if self.in_flight.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        if !self.queued.insert(key.clone()) {
            return false;
        }
        self.queue.push_back(key);
        true
    }
}

#[derive(Debug, Default)]
pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub(crate) async fn add(&self, key: ObjectKey) {
        let pushed = self.state.lock().await.push(key);
        if pushed {
            self.notify.notify_one();
        }
    }

    /// Waits for the next key and marks it in flight.
    pub(crate) async fn next(&self) -> ObjectKey {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(key) = state.queue.pop_front() {
                    state.queued.remove(&key);
                    state.in_flight.insert(key.clone());
                    if !state.queue.is_empty() {
                        self.notify.notify_one();
                    }
                    return key;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Releases an in-flight key, re-queueing it if it was triggered meanwhile.
    pub(crate) async fn done(&self, key: &ObjectKey) {
        let pushed = {
            let mut state = self.state.lock().await;
            state.in_flight.remove(key);
            if state.dirty.remove(key) {
                state.push(key.clone())
            } else {
                false
            }
        };
        if pushed {
            self.notify.notify_one();
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }
}

/// Cloneable handle for feeding keys to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    queue: Arc<WorkQueue>,
}

impl ControllerHandle {
    pub async fn enqueue(&self, key: ObjectKey) {
        tracing::trace!(app = %key, "enqueue");
        self.queue.add(key).await;
    }

    /// Enqueue `key` after `delay` without blocking the caller.
    pub fn enqueue_after(&self, key: ObjectKey, delay: Duration) {
        let queue = self.queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Number of keys waiting to be picked up.
    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }
}

pub struct Controller {
    reconciler: Arc<dyn Reconcile>,
    store: DynStore,
    config: ControllerConfig,
    handle: ControllerHandle,
}

impl Controller {
    pub fn new(reconciler: Arc<dyn Reconcile>, store: DynStore, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            store,
            config,
            handle: ControllerHandle {
                queue: Arc::new(WorkQueue::default()),
            },
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    /// Drive the queue until `shutdown` flips to `true`.
    ///
    /// In-flight invocations are not cancelled internally; they are dropped
    /// with their worker task at shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let workers = self.config.workers.max(1);
        tracing::info!(
            workers,
            resync_secs = self.config.resync_interval.map(|d| d.as_secs()),
            store = self.store.backend_name(),
            "controller started"
        );

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            tasks.spawn(worker_loop(
                id,
                self.reconciler.clone(),
                self.handle.clone(),
                self.config.error_requeue_after,
            ));
        }
        tasks.spawn(resync_loop(
            self.store.clone(),
            self.handle.clone(),
            self.config.resync_interval,
        ));

        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        tasks.shutdown().await;
        tracing::info!("controller stopped");
    }
}

async fn worker_loop(
    id: usize,
    reconciler: Arc<dyn Reconcile>,
    handle: ControllerHandle,
    error_requeue_after: Duration,
) {
    loop {
        let key = handle.queue.next().await;
        tracing::debug!(worker = id, app = %key, "processing");

        match reconciler.reconcile(&key).await {
            Ok(Action::Done) => {}
            Ok(Action::RequeueAfter(delay)) => handle.enqueue_after(key.clone(), delay),
            Err(e) if e.is_not_found() => {
                // The App is gone; a later write enqueues it again
                tracing::debug!(worker = id, app = %key, error = %e, "App not found, dropping key");
            }
            Err(e) => {
                tracing::error!(
                    worker = id,
                    app = %key,
                    error = %e,
                    retry_ms = error_requeue_after.as_millis() as u64,
                    "reconcile failed"
                );
                handle.enqueue_after(key.clone(), error_requeue_after);
            }
        }

        handle.queue.done(&key).await;
    }
}

async fn resync_loop(store: DynStore, handle: ControllerHandle, interval: Option<Duration>) {
    loop {
        match store.list_all(AppV1::KIND).await {
            Ok(apps) => {
                let mut count = 0usize;
                for value in apps {
                    match AppV1::from_value(value) {
                        Ok(app) => {
                            handle.enqueue(app.key()).await;
                            count += 1;
                        }
                        Err(e) => tracing::warn!(error = %e, "skipping malformed App during resync"),
                    }
                }
                tracing::debug!(apps = count, "resync enqueued");
            }
            Err(e) => tracing::warn!(error = %e, "resync list failed"),
        }

        match interval {
            Some(interval) => tokio::time::sleep(interval).await,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[tokio::test]
    async fn test_queue_dedups_pending_keys() {
        let queue = WorkQueue::default();
        queue.add(key("a")).await;
        queue.add(key("a")).await;
        queue.add(key("b")).await;
        assert_eq!(queue.len().await, 2);

        assert_eq!(queue.next().await, key("a"));
        assert_eq!(queue.next().await, key("b"));
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_queue_parks_in_flight_keys() {
        let queue = WorkQueue::default();
        queue.add(key("a")).await;
        let in_flight = queue.next().await;

        queue.add(key("a")).await;
        queue.add(key("a")).await;
        assert_eq!(queue.len().await, 0);

        queue.done(&in_flight).await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.next().await, key("a"));

        queue.done(&key("a")).await;
        assert_eq!(queue.len().await, 0);
    }
}
