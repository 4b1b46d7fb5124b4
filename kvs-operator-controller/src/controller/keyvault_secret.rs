// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use kvs_operator_common::telemetry::{info, warn};
use kvs_operator_common::utils::compute_object_hash;

use crate::controller::context::Context;
use crate::controller::events::{ACTION_SYNC, MESSAGE_SECRET_CREATED, REASON_CREATED};
use crate::controller::materializer::SecretMaterializer;
use crate::controller::object_key::ObjectKey;
use crate::controller::traits::FromSpec;
use crate::controller::utils::{is_not_found, DATA_HASH_ANNOTATION, MANAGED_BY, MANAGED_BY_LABEL};
use crate::crd::KeyvaultSecret;
use crate::error::{ControllerError, Result};

pub static SECRET_TYPE_OPAQUE: &str = "Opaque";

/// What a reconcile did to the derived Secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The existing Secret was replaced with freshly resolved data
    Synced,
    /// The Secret did not exist and was created
    Created,
    /// The specification is gone, nothing to do
    Deleted,
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let outcome = match self {
            ReconcileOutcome::Synced => "Synced",
            ReconcileOutcome::Created => "Created",
            ReconcileOutcome::Deleted => "Deleted",
        };
        write!(f, "{}", outcome)
    }
}

impl FromSpec<KeyvaultSecret> for Secret {
    /// Build the derived Secret for a KeyvaultSecret
    ///
    /// # Arguments
    /// * `resource` - The owning KeyvaultSecret
    /// * `data` - The resolved values keyed by output key
    /// * `owner_ref` - Controller reference back to `resource`
    ///
    /// # Returns
    /// The Secret to write
    fn from_spec(resource: &KeyvaultSecret, data: BTreeMap<String, ByteString>, owner_ref: OwnerReference) -> Self {
        let data_hash = compute_object_hash(&data).unwrap_or_default();

        Secret {
            metadata: ObjectMeta {
                name: Some(resource.target_secret_name()),
                namespace: resource.namespace(),
                owner_references: Some(vec![owner_ref]),
                labels: Some(BTreeMap::from([
                    (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
                ])),
                annotations: Some(BTreeMap::from([
                    (DATA_HASH_ANNOTATION.to_string(), data_hash),
                ])),
                ..Default::default()
            },
            type_: Some(SECRET_TYPE_OPAQUE.to_string()),
            data: Some(data),
            ..Default::default()
        }
    }
}

/// Drive one KeyvaultSecret to convergence
///
/// Looks the specification up in the local cache, resolves every entry and writes the
/// complete Secret, replacing it when it exists and creating it otherwise. Nothing is
/// written unless every entry resolved.
///
/// # Arguments
/// * `key` - Identity of the KeyvaultSecret
/// * `ctx` - The controller context
///
/// # Returns
/// What happened to the derived Secret
pub async fn reconcile(key: &ObjectKey, ctx: &Context) -> Result<ReconcileOutcome> {
    let Some(resource) = ctx.cache.get(key) else {
        info!(
            event = "SpecificationDeleted",
            key = %key,
        );
        return Ok(ReconcileOutcome::Deleted);
    };

    // The owner reference lets the API server cascade-delete the Secret with its owner
    let owner_ref = resource.controller_owner_ref(&()).ok_or(
        ControllerError::MissingObjectKeyError("Expected KeyvaultSecret to have metadata.name and metadata.uid")
    )?;

    let data = SecretMaterializer::new(ctx.store.as_ref())
        .materialize(&resource.spec)
        .await?;
    let secret = Secret::from_spec(&resource, data, owner_ref);
    let secret_name = secret.name_any();

    let outcome = match ctx.secrets.replace(&secret).await {
        Ok(_) => ReconcileOutcome::Synced,
        Err(e) if is_not_found(&e) => {
            info!(
                event = "CreatingSecret",
                key = %key,
                secret = secret_name.as_str(),
            );
            ctx.secrets.create(&secret).await?;
            ReconcileOutcome::Created
        }
        Err(e) => return Err(e),
    };

    ctx.events
        .publish(
            &resource.object_ref(&()),
            EventType::Normal,
            REASON_CREATED,
            ACTION_SYNC,
            Some(MESSAGE_SECRET_CREATED.to_string()),
        )
        .await;

    if resource.spec.items.is_empty() {
        warn!(
            event = "EmptySpecification",
            key = %key,
            secret = secret_name.as_str(),
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{direct, keyvault_secret, templated, Harness, PublishedEvent};
    use crate::secretstore::{MemorySecretStore, SecretStore, VaultError};
    use crate::template::TemplateError;
    use std::sync::Arc;

    fn store() -> Arc<dyn SecretStore> {
        Arc::new(
            MemorySecretStore::new()
                .with_secret("db-user", "app")
                .with_secret("db-pass", "hunter2")
                .with_error("broken", VaultError::Transport("connection reset".to_string())),
        )
    }

    fn key() -> ObjectKey {
        ObjectKey::new("team-a", "db")
    }

    fn bytes(value: &str) -> ByteString {
        ByteString(value.as_bytes().to_vec())
    }

    #[test]
    fn derived_secret_shape() {
        let resource = keyvault_secret("team-a", "db", "db-credentials", vec![]);
        let owner_ref = resource.controller_owner_ref(&()).unwrap();
        let data = BTreeMap::from([("user".to_string(), bytes("app"))]);

        let secret = Secret::from_spec(&resource, data.clone(), owner_ref);

        assert_eq!(secret.metadata.name.as_deref(), Some("db-credentials"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(secret.data, Some(data.clone()));
        assert_eq!(secret.labels().get(MANAGED_BY_LABEL).map(String::as_str), Some(MANAGED_BY));
        assert_eq!(
            secret.annotations().get(DATA_HASH_ANNOTATION),
            Some(&compute_object_hash(&data).unwrap())
        );

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "KeyvaultSecret");
        assert_eq!(owners[0].uid, "uid-db");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn secret_name_defaults_to_resource_name() {
        let resource = keyvault_secret("team-a", "db", "", vec![]);
        let owner_ref = resource.controller_owner_ref(&()).unwrap();

        let secret = Secret::from_spec(&resource, BTreeMap::new(), owner_ref);

        assert_eq!(secret.metadata.name.as_deref(), Some("db"));
    }

    #[tokio::test]
    async fn missing_specification_is_treated_as_deleted() {
        let harness = Harness::new(store());

        let outcome = reconcile(&key(), &harness.ctx).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Deleted);
        assert!(harness.secrets.calls().is_empty());
        assert!(harness.events.events().is_empty());
    }

    #[tokio::test]
    async fn first_reconcile_creates_the_secret() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-user", "user"),
            templated("[[ secretValue \"db-user\" ]]:[[ secretValue \"db-pass\" ]]", "pair"),
        ]));

        let outcome = reconcile(&key(), &harness.ctx).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(harness.secrets.calls(), vec![
            "replace team-a/db-credentials".to_string(),
            "create team-a/db-credentials".to_string(),
        ]);

        let secret = harness.secrets.get(&ObjectKey::new("team-a", "db-credentials")).unwrap();
        assert_eq!(secret.data.unwrap(), BTreeMap::from([
            ("pair".to_string(), bytes("app:hunter2")),
            ("user".to_string(), bytes("app")),
        ]));
        assert_eq!(harness.events.events(), vec![PublishedEvent {
            object: "team-a/db".to_string(),
            reason: "Created".to_string(),
            note: Some("Key Vault Secret created successfully".to_string()),
        }]);
    }

    #[tokio::test]
    async fn repeated_reconcile_replaces_with_identical_data() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-user", "user"),
        ]));
        let target = ObjectKey::new("team-a", "db-credentials");

        assert_eq!(reconcile(&key(), &harness.ctx).await.unwrap(), ReconcileOutcome::Created);
        let first = harness.secrets.get(&target).unwrap();

        assert_eq!(reconcile(&key(), &harness.ctx).await.unwrap(), ReconcileOutcome::Synced);
        assert_eq!(harness.secrets.get(&target).unwrap(), first);
        assert_eq!(harness.secrets.calls().last().map(String::as_str), Some("replace team-a/db-credentials"));
        assert_eq!(harness.events.events().len(), 2);
    }

    #[tokio::test]
    async fn failing_entry_writes_nothing() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-user", "user"),
            direct("broken", "pass"),
        ]));

        let result = reconcile(&key(), &harness.ctx).await;

        assert!(matches!(result, Err(ControllerError::VaultError(_))));
        assert!(harness.secrets.calls().is_empty());
        assert!(harness.events.events().is_empty());
    }

    #[tokio::test]
    async fn failing_entry_keeps_previous_secret() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-user", "user"),
        ]));
        reconcile(&key(), &harness.ctx).await.unwrap();
        let target = ObjectKey::new("team-a", "db-credentials");
        let before = harness.secrets.get(&target).unwrap();

        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-pass", "user"),
            direct("", "pass"),
        ]));

        assert!(matches!(
            reconcile(&key(), &harness.ctx).await,
            Err(ControllerError::ValidationError(_))
        ));
        assert_eq!(harness.secrets.get(&target).unwrap(), before);
    }

    #[tokio::test]
    async fn template_syntax_error_is_fatal() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            templated("[[ secretValue \"db-user\" ", "user"),
        ]));

        let result = reconcile(&key(), &harness.ctx).await;

        assert!(matches!(
            result,
            Err(ControllerError::TemplateError(TemplateError::UnclosedAction(_)))
        ));
        assert!(harness.secrets.calls().is_empty());
    }

    #[tokio::test]
    async fn template_lookup_error_is_written_as_value() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            templated("[[ secretValue \"broken\" ]]", "pass"),
        ]));

        assert_eq!(reconcile(&key(), &harness.ctx).await.unwrap(), ReconcileOutcome::Created);

        let secret = harness.secrets.get(&ObjectKey::new("team-a", "db-credentials")).unwrap();
        assert_eq!(secret.data.unwrap()["pass"], bytes("connection reset"));
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let harness = Harness::new(store());
        harness.cache.insert(keyvault_secret("team-a", "db", "db-credentials", vec![
            direct("db-user", "user"),
        ]));
        harness.secrets.set_unavailable(true);

        assert!(matches!(
            reconcile(&key(), &harness.ctx).await,
            Err(ControllerError::UnknownError(_))
        ));
        assert_eq!(harness.secrets.calls(), vec!["replace team-a/db-credentials".to_string()]);
        assert!(harness.events.events().is_empty());
    }

    #[tokio::test]
    async fn missing_uid_is_an_error() {
        let harness = Harness::new(store());
        let mut resource = keyvault_secret("team-a", "db", "db-credentials", vec![]);
        resource.metadata.uid = None;
        harness.cache.insert(resource);

        assert!(matches!(
            reconcile(&key(), &harness.ctx).await,
            Err(ControllerError::MissingObjectKeyError(_))
        ));
    }
}
