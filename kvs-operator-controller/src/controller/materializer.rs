// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use k8s_openapi::ByteString;
use std::collections::BTreeMap;

use kvs_operator_common::telemetry::debug;

use crate::crd::{KeyvaultSecretSpec, SecretEntry};
use crate::error::Result;
use crate::secretstore::SecretStore;
use crate::template;

/// Resolved Secret data keyed by output key
pub type SecretData = BTreeMap<String, ByteString>;

/// Resolves specification entries into Secret data
pub struct SecretMaterializer<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> SecretMaterializer<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Resolve every entry in declared order
    ///
    /// The first invalid or failing entry aborts the whole materialization and no data
    /// is returned. Later entries overwrite earlier ones with the same output key.
    ///
    /// # Arguments
    /// * `spec` - The specification to resolve
    ///
    /// # Returns
    /// The complete Secret data
    pub async fn materialize(&self, spec: &KeyvaultSecretSpec) -> Result<SecretData> {
        let mut data = SecretData::new();

        for entry in &spec.items {
            let value = self.resolve_entry(entry).await?;
            data.insert(entry.output_key.clone(), ByteString(value.into_bytes()));
        }

        Ok(data)
    }

    /// Resolve a single entry to its value
    pub async fn resolve_entry(&self, entry: &SecretEntry) -> Result<String> {
        entry.validate()?;

        if entry.is_template_entry() {
            debug!(event = "RenderingTemplate", key = entry.output_key.as_str());
            return Ok(template::render(&entry.template, self.store).await?);
        }

        debug!(
            event = "FetchingSecret",
            key = entry.output_key.as_str(),
            secret = entry.vault_name.as_str(),
        );
        Ok(self.store.get_secret_value_for_version(&entry.vault_name, &entry.vault_version).await?)
    }
}
