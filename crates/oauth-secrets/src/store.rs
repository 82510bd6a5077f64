//! SecretStore trait and its Kubernetes implementation
//!
//! The trait abstracts the API server so the orchestrator can be driven by
//! the in-memory mock in unit tests.

use crate::error::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::debug;

/// Get/Create/Update gateway to the secret store.
///
/// Implementations map the store's "resource not found" condition to
/// [`StoreError::NotFound`]. No caching, retries or batching.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the secret `name` in `namespace`.
    async fn get(&self, name: &str, namespace: &str) -> Result<Secret, StoreError>;

    /// Create `secret`. Fails if it already exists.
    async fn create(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Replace `secret` as a whole. Fails on a stale `resourceVersion`.
    async fn update(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

/// [`SecretStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    /// Creates a store using `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Name and namespace of an object about to be written.
fn object_ref(secret: &Secret) -> Result<(&str, &str), StoreError> {
    let name = secret
        .metadata
        .name
        .as_deref()
        .ok_or(StoreError::MissingMetadata("name"))?;
    let namespace = secret
        .metadata
        .namespace
        .as_deref()
        .ok_or(StoreError::MissingMetadata("namespace"))?;
    Ok((name, namespace))
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<Secret, StoreError> {
        debug!(secret = name, namespace, "Getting secret");
        self.api(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, name, namespace))
    }

    async fn create(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (name, namespace) = object_ref(secret)?;
        debug!(secret = name, namespace, "Creating secret");
        self.api(namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| StoreError::from_kube(e, name, namespace))
    }

    async fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (name, namespace) = object_ref(secret)?;
        debug!(secret = name, namespace, "Replacing secret");
        self.api(namespace)
            .replace(name, &PostParams::default(), secret)
            .await
            .map_err(|e| StoreError::from_kube(e, name, namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_object_ref_requires_name_and_namespace() {
        let mut secret = Secret {
            metadata: ObjectMeta {
                name: Some("foo".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(object_ref(&secret), Err(StoreError::MissingMetadata("namespace"))));

        secret.metadata.namespace = Some("ns".to_string());
        assert_eq!(object_ref(&secret).unwrap(), ("foo", "ns"));

        secret.metadata.name = None;
        assert!(matches!(object_ref(&secret), Err(StoreError::MissingMetadata("name"))));
    }
}
