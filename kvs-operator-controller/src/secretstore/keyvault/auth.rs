// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Service principal credentials for Key Vault.

use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::ClientSecretCredential;
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use kvs_operator_common::config::VaultConfig;
use kvs_operator_common::telemetry::debug;

use crate::secretstore::{VaultError, VaultResult};

/// Service principal used to authenticate against Azure AD
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Subset of the cloud provider config file written to every AKS node
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureJson {
    #[serde(default)]
    tenant_id: String,
    #[serde(default)]
    aad_client_id: String,
    #[serde(default)]
    aad_client_secret: String,
}

impl Credentials {
    /// Use the explicitly configured service principal, falling back to the node credential file
    pub fn resolve(config: &VaultConfig) -> VaultResult<Self> {
        match config.service_principal() {
            Some((tenant_id, client_id, client_secret)) => Ok(Credentials {
                tenant_id: tenant_id.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            }),
            None => Self::from_file(&config.credentials_file),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let azure_json: AzureJson = serde_json::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        if azure_json.tenant_id.is_empty() || azure_json.aad_client_id.is_empty() || azure_json.aad_client_secret.is_empty() {
            return Err(VaultError::Config(format!(
                "{} must set tenantId, aadClientId and aadClientSecret",
                path.display()
            )));
        }

        Ok(Credentials {
            tenant_id: azure_json.tenant_id,
            client_id: azure_json.aad_client_id,
            client_secret: azure_json.aad_client_secret,
        })
    }

    /// Token credential for the service principal
    ///
    /// No token is requested here; the credential fetches one on first use and caches it
    /// until shortly before it expires.
    pub fn token_credential(&self) -> VaultResult<Arc<dyn TokenCredential>> {
        debug!(
            event = "CreatingCredential",
            tenant = self.tenant_id.as_str(),
            client = self.client_id.as_str(),
        );

        let credential: Arc<dyn TokenCredential> = ClientSecretCredential::new(
            &self.tenant_id,
            self.client_id.clone(),
            Secret::new(self.client_secret.clone()),
            None,
        )
        .map_err(|e| VaultError::Config(format!("invalid service principal: {}", e)))?;

        Ok(credential)
    }
}
