// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, Result};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    kind = "KeyvaultSecret",
    group = "secretcontroller.io",
    version = "v1alpha1",
    doc = "KeyvaultSecret declares a Kubernetes Secret whose values are read from Azure Key Vault.",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Secret", "type":"string", "description":"Name of the generated Secret", "jsonPath":".spec.secretName"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KeyvaultSecretSpec {
    #[serde(default)]
    /// Name of the Secret to create, defaults to the name of this resource
    pub secret_name: String,
    #[serde(default)]
    /// Entries to resolve into keys of the Secret
    pub items: Vec<SecretEntry>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretEntry {
    /// Name of the secret in the vault
    pub vault_name: String,
    /// Version of the vault secret, latest when empty
    pub vault_version: String,
    /// Key of the generated Secret that receives the value
    pub output_key: String,
    /// Template rendered into the value, may call `secretValue` and `secretValueForVersion`
    pub template: String,
}

impl SecretEntry {
    pub fn is_template_entry(&self) -> bool {
        !self.template.is_empty()
    }

    /// Check that the entry names an output key and exactly one source
    pub fn validate(&self) -> Result<()> {
        if self.output_key.is_empty() {
            return Err(ControllerError::ValidationError(
                "outputKey must be set".to_string()
            ));
        }

        match (self.vault_name.is_empty(), self.template.is_empty()) {
            (true, true) => Err(ControllerError::ValidationError(format!(
                "entry {}: one of vaultName and template must be set",
                self.output_key
            ))),
            (false, false) => Err(ControllerError::ValidationError(format!(
                "entry {}: vaultName and template are mutually exclusive",
                self.output_key
            ))),
            _ => Ok(()),
        }
    }
}

impl KeyvaultSecret {
    /// Name of the derived Secret
    pub fn target_secret_name(&self) -> String {
        if self.spec.secret_name.is_empty() {
            self.name_any()
        } else {
            self.spec.secret_name.clone()
        }
    }
}
