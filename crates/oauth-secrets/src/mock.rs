//! Mock SecretStore for unit testing
//!
//! This module provides an in-memory implementation of [`SecretStore`] that
//! can be used in unit tests without a running cluster. It mimics the API
//! server's write semantics closely enough for the orchestrator: creating an
//! existing secret is a 409 `AlreadyExists`, replacing with a stale
//! `resourceVersion` is a 409 `Conflict`.

use crate::error::StoreError;
use crate::store::SecretStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// A call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `get(name, namespace)`
    Get {
        /// Secret name
        name: String,
        /// Secret namespace
        namespace: String,
    },
    /// `create(secret)`
    Create {
        /// Secret name
        name: String,
        /// Secret namespace
        namespace: String,
    },
    /// `update(secret)`
    Update {
        /// Secret name
        name: String,
        /// Secret namespace
        namespace: String,
    },
}

impl StoreCall {
    /// Whether the call writes to the store.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, StoreCall::Create { .. } | StoreCall::Update { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Get,
    Create,
    Update,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    code: u16,
    reason: String,
}

/// Mock SecretStore for testing
///
/// Stores secrets in memory keyed by `(namespace, name)`. Clones share state,
/// so a test can keep a handle while the orchestrator borrows another.
#[derive(Debug, Clone, Default)]
pub struct MockSecretStore {
    secrets: Arc<Mutex<HashMap<(String, String), Secret>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failures: Arc<Mutex<HashMap<(Op, String), InjectedFailure>>>,
    next_resource_version: Arc<Mutex<u64>>,
}

impl MockSecretStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret to the mock store (for test setup)
    ///
    /// Panics if the secret has no name or namespace.
    pub fn add_secret(&self, mut secret: Secret) {
        let key = key_of(&secret).expect("test secret needs name and namespace");
        secret.metadata.resource_version = Some(self.bump_resource_version());
        self.secrets.lock().unwrap().insert(key, secret);
    }

    /// Add a secret with a single `data` entry (for test setup)
    pub fn add_secret_with_data(&self, name: &str, namespace: &str, key: &str, value: &[u8]) {
        let mut secret = secret_named(name, namespace);
        secret.data = Some(BTreeMap::from([(
            key.to_string(),
            k8s_openapi::ByteString(value.to_vec()),
        )]));
        self.add_secret(secret);
    }

    /// Add a secret without any data (for test setup)
    pub fn add_empty_secret(&self, name: &str, namespace: &str) {
        self.add_secret(secret_named(name, namespace));
    }

    /// Current copy of a stored secret
    pub fn secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Raw bytes of `data[key]` of a stored secret
    pub fn data_value(&self, name: &str, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.secret(name, namespace)?
            .data?
            .get(key)
            .map(|v| v.0.clone())
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }

    /// Whether the store holds no secrets
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of create/update calls received so far
    pub fn write_count(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.is_write()).count()
    }

    /// Forget recorded calls (stored secrets are kept)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make `get(name, _)` fail with an API error
    pub fn fail_get(&self, name: &str, code: u16, reason: &str) {
        self.inject(Op::Get, name, code, reason);
    }

    /// Make `create` of `name` fail with an API error
    pub fn fail_create(&self, name: &str, code: u16, reason: &str) {
        self.inject(Op::Create, name, code, reason);
    }

    /// Make `update` of `name` fail with an API error
    pub fn fail_update(&self, name: &str, code: u16, reason: &str) {
        self.inject(Op::Update, name, code, reason);
    }

    fn inject(&self, op: Op, name: &str, code: u16, reason: &str) {
        self.failures.lock().unwrap().insert(
            (op, name.to_string()),
            InjectedFailure {
                code,
                reason: reason.to_string(),
            },
        );
    }

    fn injected(&self, op: Op, name: &str) -> Result<(), StoreError> {
        match self.failures.lock().unwrap().get(&(op, name.to_string())) {
            Some(failure) => Err(StoreError::Api {
                code: failure.code,
                reason: failure.reason.clone(),
                message: format!("injected {:?} failure for secret {}", op, name),
            }),
            None => Ok(()),
        }
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn bump_resource_version(&self) -> String {
        let mut version = self.next_resource_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }
}

fn secret_named(name: &str, namespace: &str) -> Secret {
    let mut secret = Secret::default();
    secret.metadata.name = Some(name.to_string());
    secret.metadata.namespace = Some(namespace.to_string());
    secret
}

fn key_of(secret: &Secret) -> Result<(String, String), StoreError> {
    let name = secret
        .metadata
        .name
        .clone()
        .ok_or(StoreError::MissingMetadata("name"))?;
    let namespace = secret
        .metadata
        .namespace
        .clone()
        .ok_or(StoreError::MissingMetadata("namespace"))?;
    Ok((namespace, name))
}

fn api_error(code: u16, reason: &str, message: String) -> StoreError {
    StoreError::Api {
        code,
        reason: reason.to_string(),
        message,
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<Secret, StoreError> {
        self.record(StoreCall::Get {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        self.injected(Op::Get, name)?;

        self.secret(name, namespace).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    async fn create(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (namespace, name) = key_of(secret)?;
        self.record(StoreCall::Create {
            name: name.clone(),
            namespace: namespace.clone(),
        });
        self.injected(Op::Create, &name)?;

        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace, name);
        if secrets.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("secrets \"{}\" already exists", key.1),
            ));
        }

        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(self.bump_resource_version());
        secrets.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let (namespace, name) = key_of(secret)?;
        self.record(StoreCall::Update {
            name: name.clone(),
            namespace: namespace.clone(),
        });
        self.injected(Op::Update, &name)?;

        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace, name);
        let Some(current) = secrets.get(&key) else {
            return Err(StoreError::NotFound {
                name: key.1,
                namespace: key.0,
            });
        };

        if let Some(version) = &secret.metadata.resource_version {
            if current.metadata.resource_version.as_ref() != Some(version) {
                return Err(api_error(
                    409,
                    "Conflict",
                    format!(
                        "Operation cannot be fulfilled on secrets \"{}\": the object has been modified",
                        key.1
                    ),
                ));
            }
        }

        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(self.bump_resource_version());
        secrets.insert(key, stored.clone());
        Ok(stored)
    }
}
