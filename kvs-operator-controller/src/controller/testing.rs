// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! In-memory collaborators for reconciler and dispatcher tests.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use kube::api::ObjectMeta;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::controller::context::Context;
use crate::controller::events::EventPublisher;
use crate::controller::object_key::ObjectKey;
use crate::controller::traits::{SecretWriter, SpecCache};
use crate::crd::{KeyvaultSecret, KeyvaultSecretSpec, SecretEntry};
use crate::error::{ControllerError, Result};
use crate::secretstore::SecretStore;

pub fn keyvault_secret(namespace: &str, name: &str, secret_name: &str, items: Vec<SecretEntry>) -> KeyvaultSecret {
    KeyvaultSecret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{}", name)),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: KeyvaultSecretSpec {
            secret_name: secret_name.to_string(),
            items,
        },
    }
}

pub fn direct(vault_name: &str, output_key: &str) -> SecretEntry {
    SecretEntry {
        vault_name: vault_name.to_string(),
        output_key: output_key.to_string(),
        ..Default::default()
    }
}

pub fn templated(template: &str, output_key: &str) -> SecretEntry {
    SecretEntry {
        template: template.to_string(),
        output_key: output_key.to_string(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeCache {
    objects: Mutex<HashMap<ObjectKey, Arc<KeyvaultSecret>>>,
}

impl FakeCache {
    pub fn insert(&self, resource: KeyvaultSecret) {
        let key = ObjectKey::from_resource(&resource).unwrap();
        self.objects.lock().unwrap().insert(key, Arc::new(resource));
    }
}

impl SpecCache for FakeCache {
    fn get(&self, key: &ObjectKey) -> Option<Arc<KeyvaultSecret>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

/// Secret writer over a map, recording every call as `"<verb> <namespace>/<name>"`
#[derive(Default)]
pub struct FakeSecretWriter {
    secrets: Mutex<BTreeMap<ObjectKey, Secret>>,
    calls: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

impl FakeSecretWriter {
    pub fn get(&self, key: &ObjectKey) -> Option<Secret> {
        self.secrets.lock().unwrap().get(key).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every write fail as if the API server were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn record(&self, verb: &str, secret: &Secret) -> Result<ObjectKey> {
        let key = ObjectKey::from_resource(secret).unwrap();
        self.calls.lock().unwrap().push(format!("{} {}", verb, key));

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ControllerError::UnknownError("connection refused".to_string()));
        }
        Ok(key)
    }
}

#[async_trait]
impl SecretWriter for FakeSecretWriter {
    async fn replace(&self, secret: &Secret) -> Result<Secret> {
        let key = self.record("replace", secret)?;
        let mut secrets = self.secrets.lock().unwrap();

        match secrets.get_mut(&key) {
            Some(existing) => {
                *existing = secret.clone();
                Ok(secret.clone())
            }
            None => Err(ControllerError::NotFoundError(secret.name_any())),
        }
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        let key = self.record("create", secret)?;
        self.secrets.lock().unwrap().insert(key, secret.clone());
        Ok(secret.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub object: String,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<PublishedEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        _type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events.lock().unwrap().push(PublishedEvent {
            object: format!(
                "{}/{}",
                resource_ref.namespace.clone().unwrap_or_default(),
                resource_ref.name.clone().unwrap_or_default()
            ),
            reason: reason.to_string(),
            note,
        });
    }
}

/// A context whose collaborators stay reachable for assertions
pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub secrets: Arc<FakeSecretWriter>,
    pub events: Arc<RecordingEventPublisher>,
    pub ctx: Context,
}

impl Harness {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        let cache = Arc::new(FakeCache::default());
        let secrets = Arc::new(FakeSecretWriter::default());
        let events = Arc::new(RecordingEventPublisher::default());
        let ctx = Context::new(cache.clone(), secrets.clone(), events.clone(), store);

        Self { cache, secrets, events, ctx }
    }
}
