// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Api, PostParams}, Client, Config, ResourceExt,
    config::{KubeConfigOptions, Kubeconfig},
};

use crate::controller::traits::SecretWriter;
use crate::error::{ControllerError, Result};

pub static FIELD_MANAGER: &str = "secretcontroller.io";
pub static MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub static MANAGED_BY: &str = "keyvault-secret-operator";
pub static DATA_HASH_ANNOTATION: &str = "secretcontroller.io/data-hash";


/// Create a new kube client
///
/// Uses the given kubeconfig when set, otherwise infers the configuration from the
/// environment or the default service account.
///
/// # Arguments
/// * `kubeconfig`: Optional path to a kubeconfig file
///
/// # Returns
/// A Result containing the kube Client or an error
pub async fn create_k8s_client(kubeconfig: Option<&str>) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Client::try_default().await.map_err(ControllerError::from);
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| ControllerError::UnknownError(format!("invalid kubeconfig {}: {}", path, e)))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| ControllerError::UnknownError(format!("invalid kubeconfig {}: {}", path, e)))?;

    Client::try_from(config).map_err(ControllerError::from)
}

/// Map a 404 from the API server to `NotFoundError`
///
/// # Arguments
/// * `error`: The error returned by the API call
/// * `name`: The name of the object the call was made for
pub fn not_found_as(error: kube::Error, name: &str) -> ControllerError {
    match error {
        kube::Error::Api(response) if response.code == 404 => ControllerError::NotFoundError(name.to_string()),
        error => ControllerError::from(error),
    }
}

/// Whether an error means the object does not exist
pub fn is_not_found(error: &ControllerError) -> bool {
    matches!(error, ControllerError::NotFoundError(_))
}

/// Secret writer backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretWriter {
    client: Client,
}

impl KubeSecretWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, secret: &Secret) -> Result<Api<Secret>> {
        let namespace = secret.namespace().ok_or(
            ControllerError::MissingObjectKeyError("Expected Secret to be namespaced via metadata.namespace")
        )?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SecretWriter for KubeSecretWriter {
    async fn replace(&self, secret: &Secret) -> Result<Secret> {
        let name = secret.name_any();
        self.api(secret)?
            .replace(&name, &Self::post_params(), secret)
            .await
            .map_err(|e| not_found_as(e, &name))
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        self.api(secret)?
            .create(&Self::post_params(), secret)
            .await
            .map_err(ControllerError::from)
    }
}
