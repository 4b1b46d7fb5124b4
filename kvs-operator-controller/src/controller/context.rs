// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use kube::Client;
use kube::runtime::reflector::Store;
use std::sync::Arc;

use crate::controller::events::{EventPublisher, KubeEventPublisher};
use crate::controller::traits::{SecretWriter, SpecCache};
use crate::controller::utils::KubeSecretWriter;
use crate::crd::KeyvaultSecret;
use crate::secretstore::SecretStore;

// Context struct to hold the collaborators shared by all reconcile workers
#[derive(Clone)]
pub struct Context {
    pub cache: Arc<dyn SpecCache>,
    pub secrets: Arc<dyn SecretWriter>,
    pub events: Arc<dyn EventPublisher>,
    pub store: Arc<dyn SecretStore>,
}

impl Context {
    pub fn new(
        cache: Arc<dyn SpecCache>,
        secrets: Arc<dyn SecretWriter>,
        events: Arc<dyn EventPublisher>,
        store: Arc<dyn SecretStore>,
    ) -> Self {
        Self { cache, secrets, events, store }
    }

    /// Wire the Kubernetes backed collaborators around a reflector store
    pub fn from_client(client: Client, cache: Store<KeyvaultSecret>, store: Arc<dyn SecretStore>, reporter: &str) -> Self {
        Self::new(
            Arc::new(cache),
            Arc::new(KubeSecretWriter::new(client.clone())),
            Arc::new(KubeEventPublisher::new(client, reporter)),
            store,
        )
    }
}
