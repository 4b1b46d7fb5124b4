// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Sources of secret values addressed by name and version.

pub mod keyvault;
pub mod memory;

use async_trait::async_trait;
use std::result;
use thiserror::Error;

pub use keyvault::KeyVaultClient;
pub use memory::MemorySecretStore;

/// The empty version selects the latest version of a secret
pub const LATEST_VERSION: &str = "";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("secret {name} not found")]
    NotFound { name: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Transport(String),
    #[error("invalid vault configuration: {0}")]
    Config(String),
}

pub type VaultResult<T> = result::Result<T, VaultError>;

/// A store of secret values, shared by all reconcile workers
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve the latest version of a secret
    async fn get_secret_value(&self, name: &str) -> VaultResult<String> {
        self.get_secret_value_for_version(name, LATEST_VERSION).await
    }

    /// Resolve a specific version of a secret, the latest when `version` is empty
    async fn get_secret_value_for_version(&self, name: &str, version: &str) -> VaultResult<String>;
}
