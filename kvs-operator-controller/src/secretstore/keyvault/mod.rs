// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Azure Key Vault secrets through the Azure SDK.

pub mod auth;

use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_core::http::StatusCode;
use azure_security_keyvault_secrets::models::{Secret, SecretClientGetSecretOptions};
use azure_security_keyvault_secrets::SecretClient;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use kvs_operator_common::config::VaultConfig;
use kvs_operator_common::telemetry::debug;

use crate::secretstore::{SecretStore, VaultError, VaultResult};

pub use auth::Credentials;

/// Key Vault client resolving secrets of a single vault
pub struct KeyVaultClient {
    client: SecretClient,
    vault_url: String,
}

impl Debug for KeyVaultClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("KeyVaultClient")
            .field("vault_url", &self.vault_url)
            .finish_non_exhaustive()
    }
}

impl KeyVaultClient {
    /// Build a client from configuration, resolving credentials once
    pub fn new(config: &VaultConfig) -> VaultResult<Self> {
        let vault_url = vault_url(&config.name)?;
        let credentials = Credentials::resolve(config)?;

        Self::with_credential(vault_url, credentials.token_credential()?)
    }

    pub fn with_credential(vault_url: String, credential: Arc<dyn TokenCredential>) -> VaultResult<Self> {
        let client = SecretClient::new(&vault_url, credential, None)
            .map_err(|e| VaultError::Config(format!("invalid vault url {}: {}", vault_url, e)))?;

        Ok(Self { client, vault_url })
    }

    pub fn vault_url(&self) -> &str {
        &self.vault_url
    }
}

/// Turn a vault name into its URL, passing full URLs through
pub fn vault_url(name: &str) -> VaultResult<String> {
    if name.is_empty() {
        return Err(VaultError::Config("no vault name set".to_string()));
    }

    if name.starts_with("https://") || name.starts_with("http://") {
        Ok(name.to_string())
    } else {
        Ok(format!("https://{}.vault.azure.net/", name))
    }
}

/// Map a failed request to an error by the HTTP status the vault answered with
fn error_for_status(status: Option<StatusCode>, name: &str, message: String) -> VaultError {
    match status {
        Some(StatusCode::NotFound) => VaultError::NotFound { name: name.to_string() },
        Some(StatusCode::Unauthorized | StatusCode::Forbidden) => VaultError::Unauthorized(message),
        _ => VaultError::Transport(message),
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret_value_for_version(&self, name: &str, version: &str) -> VaultResult<String> {
        debug!(event = "FetchingSecret", secret = name, version = version);

        let options = (!version.is_empty()).then(|| SecretClientGetSecretOptions {
            secret_version: Some(version.to_string()),
            ..Default::default()
        });

        let response = self.client
            .get_secret(name, options)
            .await
            .map_err(|e| error_for_status(e.http_status(), name, e.to_string()))?;

        let secret = serde_json::from_slice::<Secret>(&response.into_body())
            .map_err(|e| VaultError::Transport(format!("invalid response for secret {}: {}", name, e)))?;

        secret.value.ok_or_else(|| VaultError::NotFound { name: name.to_string() })
    }
}
