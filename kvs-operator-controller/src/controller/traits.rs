// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::runtime::reflector::{ObjectRef, Store};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::controller::object_key::ObjectKey;
use crate::crd::KeyvaultSecret;
use crate::error::Result;

// Trait to build a child Resource from a specification and its resolved values
pub trait FromSpec<T> {
    fn from_spec(spec: &T, data: BTreeMap<String, ByteString>, owner_ref: OwnerReference) -> Self;
}

// Read-only view of the specifications known to the controller
pub trait SpecCache: Send + Sync {
    fn get(&self, key: &ObjectKey) -> Option<Arc<KeyvaultSecret>>;
}

impl SpecCache for Store<KeyvaultSecret> {
    fn get(&self, key: &ObjectKey) -> Option<Arc<KeyvaultSecret>> {
        Store::get(self, &ObjectRef::new(&key.name).within(&key.namespace))
    }
}

// Writes derived Secrets back to the cluster
//
// `replace` fails with `ControllerError::NotFoundError` when the Secret does not exist yet.
#[async_trait]
pub trait SecretWriter: Send + Sync {
    async fn replace(&self, secret: &Secret) -> Result<Secret>;
    async fn create(&self, secret: &Secret) -> Result<Secret>;
}
