// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Deduplicating work queue with per-item retry backoff.
//!
//! An item is pending at most once. Items handed out by [`WorkQueue::dequeue`] stay
//! "processing" until acknowledged; enqueuing such an item marks it dirty and it is queued
//! again only once the current attempt is acknowledged, so no two workers ever hold the
//! same item.

pub mod backoff;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub use backoff::ExponentialBackoff;

#[derive(Debug)]
struct QueueState<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    failures: HashMap<K, u32>,
}

impl<K> Default for QueueState<K> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            dirty: HashSet::new(),
            processing: HashSet::new(),
            failures: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Inner<K> {
    state: Mutex<QueueState<K>>,
    notify: Notify,
    backoff: ExponentialBackoff,
    shutdown: CancellationToken,
}

/// Cloneable handle to a shared work queue
#[derive(Debug)]
pub struct WorkQueue<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    pub fn new(backoff: ExponentialBackoff, shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                backoff,
                shutdown,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<K>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an item unless it is already pending
    pub fn enqueue(&self, key: K) {
        if self.is_shutting_down() {
            return;
        }

        let mut state = self.state();
        if !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);

        self.inner.notify.notify_one();
    }

    /// Add an item once `delay` has elapsed, dropped if the queue shuts down first
    pub fn enqueue_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            self.enqueue(key);
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = queue.inner.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => queue.enqueue(key),
            }
        });
    }

    /// Wait for the next item, `None` once the queue is shut down
    pub async fn dequeue(&self) -> Option<K> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if self.is_shutting_down() {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            tokio::select! {
                _ = self.inner.shutdown.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Finish processing an item and forget its failures
    pub fn ack_success(&self, key: &K) {
        self.state().failures.remove(key);
        self.done(key);
    }

    /// Finish processing an item and retry it after its backoff delay
    ///
    /// Returns the delay chosen for the retry.
    pub fn ack_failure(&self, key: &K) -> Duration {
        let delay = {
            let mut state = self.state();
            let failures = state.failures.entry(key.clone()).or_insert(0);
            let delay = self.inner.backoff.delay(*failures);
            *failures = failures.saturating_add(1);
            delay
        };

        self.done(key);
        self.enqueue_after(key.clone(), delay);
        delay
    }

    /// Release an item, queueing it again if it was enqueued while processing
    fn done(&self, key: &K) {
        let mut state = self.state();
        state.processing.remove(key);

        if state.dirty.contains(key) && !self.is_shutting_down() {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Consecutive failures recorded for an item
    pub fn failures(&self, key: &K) -> u32 {
        self.state().failures.get(key).copied().unwrap_or_default()
    }

    /// Number of items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out items; blocked and future `dequeue` calls return `None`
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Resolves once the queue starts shutting down
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await
    }
}
