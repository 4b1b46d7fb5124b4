// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use futures::{FutureExt, Stream, StreamExt};
use kube::api::Api;
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::Client;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use kvs_operator_common::config::ControllerConfig;
use kvs_operator_common::telemetry::{debug, error, info, info_span, warn, Instrument};

use crate::controller::context::Context;
use crate::controller::keyvault_secret::reconcile;
use crate::controller::object_key::ObjectKey;
use crate::controller::watch::{admit, SpecEventAdapter};
use crate::crd::KeyvaultSecret;
use crate::error::{ControllerError, Result};
use crate::queue::{ExponentialBackoff, WorkQueue};
use crate::secretstore::SecretStore;

/// Feeds watch events into the work queue and runs the reconcile workers
#[derive(Clone)]
pub struct Dispatcher {
    queue: WorkQueue<ObjectKey>,
    ctx: Context,
}

impl Dispatcher {
    pub fn new(queue: WorkQueue<ObjectKey>, ctx: Context) -> Self {
        Self { queue, ctx }
    }

    pub fn queue(&self) -> &WorkQueue<ObjectKey> {
        &self.queue
    }

    /// Enqueue the identities admitted from a watch stream until it ends or the queue closes
    pub async fn feed<S>(&self, events: S)
    where
        S: Stream<Item = std::result::Result<watcher::Event<KeyvaultSecret>, watcher::Error>> + Send,
    {
        let mut adapter = SpecEventAdapter::new();
        tokio::pin!(events);

        loop {
            tokio::select! {
                _ = self.queue.closed() => break,
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        for change in adapter.handle(&event) {
                            match admit(&change) {
                                Some(key) => self.queue.enqueue(key),
                                None => debug!(
                                    event = "SkippingUnchanged",
                                    key = %change.key(),
                                ),
                            }
                        }
                    }
                    Some(Err(e)) => warn!(
                        event = "WatchError",
                        error = %e,
                    ),
                    None => break,
                },
            }
        }

        debug!(event = "WatchStopped");
    }

    /// Take one identity off the queue, reconcile it and acknowledge the result
    ///
    /// # Returns
    /// `false` once the queue has shut down
    pub async fn process_next(&self) -> bool {
        let Some(key) = self.queue.dequeue().await else {
            return false;
        };

        let span = info_span!("reconcile", key = %key);
        let attempt = AssertUnwindSafe(reconcile(&key, &self.ctx).instrument(span)).catch_unwind();
        match attempt.await {
            Ok(Ok(outcome)) => {
                info!(
                    event = "Reconciled",
                    key = %key,
                    outcome = %outcome,
                );
                self.queue.ack_success(&key);
            }
            Ok(Err(e)) => {
                let retry_in = self.queue.ack_failure(&key);
                error!(
                    event = "ReconcileFailed",
                    key = %key,
                    error = %e,
                    retry_in_ms = retry_in.as_millis() as u64,
                );
            }
            Err(panic) => {
                let retry_in = self.queue.ack_failure(&key);
                error!(
                    event = "ReconcilePanicked",
                    key = %key,
                    error = panic_message(panic.as_ref()),
                    retry_in_ms = retry_in.as_millis() as u64,
                );
            }
        }

        true
    }

    /// Run `workers` reconcile loops until the queue shuts down
    ///
    /// Returns once every worker has finished the item it was processing.
    pub async fn run(&self, workers: usize) {
        let mut tasks = JoinSet::new();

        for worker in 0..workers.max(1) {
            let dispatcher = self.clone();
            tasks.spawn(async move {
                while dispatcher.process_next().await {}
                debug!(event = "WorkerStopped", worker = worker);
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(
                    event = "WorkerPanicked",
                    error = %e,
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Watch KeyvaultSecrets and keep their Secrets in sync until `shutdown` is cancelled
///
/// # Arguments
/// * `client` - The Kubernetes client
/// * `config` - Controller settings
/// * `store` - Where secret values are read from
/// * `shutdown` - Stops the watch and the workers when cancelled
pub async fn start(
    client: Client,
    config: &ControllerConfig,
    store: Arc<dyn SecretStore>,
    shutdown: CancellationToken,
) -> Result<()> {
    let api: Api<KeyvaultSecret> = match config.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let (reader, writer) = reflector::store();
    let events = watcher(api, watcher::Config::default())
        .default_backoff()
        .reflect(writer);

    let backoff = ExponentialBackoff::new(
        Duration::from_millis(config.backoff_base_ms),
        Duration::from_secs(config.backoff_max_secs),
    );
    let ctx = Context::from_client(client, reader.clone(), store, &config.reporter);
    let dispatcher = Dispatcher::new(WorkQueue::new(backoff, shutdown.clone()), ctx);

    let watch = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.feed(events).await }
    });

    info!(
        event = "WaitingForCache",
        namespace = config.namespace.as_deref().unwrap_or("*"),
    );
    tokio::select! {
        _ = shutdown.cancelled() => {}
        ready = reader.wait_until_ready() => {
            ready.map_err(|e| ControllerError::UnknownError(e.to_string()))?
        }
    }

    info!(
        event = "ControllerStarted",
        workers = config.workers,
    );
    dispatcher.run(config.workers).await;

    watch.await.map_err(|e| ControllerError::UnknownError(e.to_string()))?;
    info!(event = "ControllerStopped");

    Ok(())
}
