// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::secretstore::{SecretStore, VaultError, VaultResult, LATEST_VERSION};

/// In-memory secret store keyed by `(name, version)`
///
/// Every lookup is recorded so callers can assert which versions were requested.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: HashMap<(String, String), VaultResult<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest value of a secret
    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.with_version(name, LATEST_VERSION, value)
    }

    pub fn with_version(mut self, name: &str, version: &str, value: &str) -> Self {
        self.values.insert((name.to_string(), version.to_string()), Ok(value.to_string()));
        self
    }

    /// Make lookups of `name` at its latest version fail with `error`
    pub fn with_error(mut self, name: &str, error: VaultError) -> Self {
        self.values.insert((name.to_string(), LATEST_VERSION.to_string()), Err(error));
        self
    }

    /// Lookups performed so far, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret_value_for_version(&self, name: &str, version: &str) -> VaultResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), version.to_string()));
        }

        self.values
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(VaultError::NotFound { name: name.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_lookup_uses_empty_version() {
        let store = MemorySecretStore::new().with_secret("k1", "v1");

        assert_eq!(store.get_secret_value("k1").await.unwrap(), "v1");
        assert_eq!(store.calls(), vec![("k1".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn versions_are_distinct() {
        let store = MemorySecretStore::new()
            .with_secret("k1", "latest")
            .with_version("k1", "v2", "second");

        assert_eq!(store.get_secret_value_for_version("k1", "v2").await.unwrap(), "second");
        assert_eq!(store.get_secret_value("k1").await.unwrap(), "latest");
    }

    #[tokio::test]
    async fn unknown_secret_is_not_found() {
        let store = MemorySecretStore::new();

        assert_eq!(
            store.get_secret_value("missing").await,
            Err(VaultError::NotFound { name: "missing".to_string() })
        );
    }
}
