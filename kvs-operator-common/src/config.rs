// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::path::Path;
use serde::{Serialize, Deserialize};
use figment::{Figment, Error, providers::{Format, Json, Yaml, Env, Serialized}};

use crate::constant::{ENV_PREFIX, KEYVAULT_ENV_PREFIX, DEFAULT_CREDENTIALS_FILE, DEFAULT_REPORTER};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[allow(unused)]
#[derive(Default)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub vault: VaultConfig,
}


#[derive(Debug, Deserialize, Serialize, Clone)]
#[allow(unused)]
pub struct ControllerConfig {
    /// Number of concurrent reconcile workers
    #[serde(default)]
    pub workers: usize,
    /// Restrict the watch to a single namespace, all namespaces when unset
    #[serde(default)]
    pub namespace: Option<String>,
    /// Initial retry delay after a failed reconcile
    #[serde(default)]
    pub backoff_base_ms: u64,
    /// Upper bound for the retry delay
    #[serde(default)]
    pub backoff_max_secs: u64,
    /// Component name reported on Kubernetes Events
    #[serde(default)]
    pub reporter: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            workers: 1,
            namespace: None,
            backoff_base_ms: 5,
            backoff_max_secs: 1000,
            reporter: DEFAULT_REPORTER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[allow(unused)]
pub struct VaultConfig {
    /// Key Vault name or full vault URL
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Node credential file used when no explicit credentials are set
    #[serde(default)]
    pub credentials_file: String,
}

impl VaultConfig {
    /// Explicit service principal credentials, if all three parts are set
    pub fn service_principal(&self) -> Option<(&str, &str, &str)> {
        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant), Some(client), Some(secret))
                if !tenant.is_empty() && !client.is_empty() && !secret.is_empty() =>
            {
                Some((tenant.as_str(), client.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            name: String::new(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            credentials_file: DEFAULT_CREDENTIALS_FILE.to_string(),
        }
    }
}

pub struct AppConfigBuilder {
    figment: Figment,
}

impl AppConfigBuilder {
    pub fn with_file(&mut self, path: &str) -> &mut Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.figment = match extension {
            "json" => self.figment.clone().merge(Json::file(path)),
            "yaml" | "yml" => self.figment.clone().merge(Yaml::file(path)),
            _ => self.figment.clone(),
        };
        self
    }

    pub fn with_env(&mut self) -> &mut Self {
        self.figment = self.figment.clone().merge(Env::prefixed(&format!("{}__", ENV_PREFIX)).split("__"));
        self
    }

    /// Merge the `KEYVAULT_TENANT_ID`, `KEYVAULT_CLIENT_ID` and `KEYVAULT_CLIENT_SECRET`
    /// variables into the vault section
    pub fn with_keyvault_env(&mut self) -> &mut Self {
        self.figment = self.figment.clone().merge(
            Env::prefixed(KEYVAULT_ENV_PREFIX)
                .only(&["tenant_id", "client_id", "client_secret"])
                .map(|key| format!("vault.{}", key.as_str()).into())
        );
        self
    }

    pub fn with_override_option(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.figment = self.figment.clone().merge(Serialized::default(key, value));
        }
        self
    }

    pub fn with_override_number(&mut self, key: &str, value: Option<u64>) -> &mut Self {
        if let Some(value) = value {
            self.figment = self.figment.clone().merge(Serialized::default(key, value));
        }
        self
    }

    pub fn build(&self) -> Result<AppConfig, Error> {
        self.figment.extract()
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        AppConfigBuilder {
            figment: Figment::from(Serialized::defaults(AppConfig::default()))
        }
    }
}
