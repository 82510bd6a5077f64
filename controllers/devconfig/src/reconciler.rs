//! Reconciliation logic for AutomotiveDevConfig CRDs.
//!
//! This module ensures the OAuth proxy secrets exist in the namespace of
//! every `AutomotiveDevConfig` and records the result in its status.
//! Retries are scheduled by the watcher from the per-resource backoff kept
//! here; the secret orchestrator itself never retries.
//!
//! Several resources may share a namespace. Ensure passes for one namespace
//! are serialised so two of them never race to create the same secret.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::status::{build_status, status_needs_update, StatusWriter};
use crds::{AutomotiveDevConfig, DevConfigPhase};
use kube_runtime::controller::Action;
use oauth_secrets::{ensure_secrets, EnsuredSecret, SecretDescriptor, SecretOutcome, SecretStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Periodic resync of a healthy resource, so deleted secrets are recreated
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Status message of a Ready resource
pub const READY_MESSAGE: &str = "OAuth proxy secrets are in place";

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10), // 1 minute min, 10 minutes max
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Reconciles AutomotiveDevConfig resources.
pub struct Reconciler {
    secret_store: Box<dyn SecretStore>,
    status_writer: Box<dyn StatusWriter>,
    catalog: Vec<SecretDescriptor>,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    /// One lock per namespace, held for the duration of an ensure pass
    namespace_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Key of a resource in the backoff table.
pub fn resource_key(config: &AutomotiveDevConfig) -> String {
    format!(
        "{}/{}",
        config.metadata.namespace.as_deref().unwrap_or("default"),
        config.metadata.name.as_deref().unwrap_or("<unknown>")
    )
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        secret_store: Box<dyn SecretStore>,
        status_writer: Box<dyn StatusWriter>,
        catalog: Vec<SecretDescriptor>,
    ) -> Self {
        Self {
            secret_store,
            status_writer,
            catalog,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            namespace_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Reconciles an AutomotiveDevConfig resource.
    ///
    /// This method:
    /// 1. Validates the build configuration
    /// 2. Ensures the OAuth proxy secrets in the resource's namespace
    /// 3. Updates the status to Ready or Failed
    ///
    /// Failures are returned so the watcher can requeue with backoff.
    pub async fn reconcile_dev_config(&self, config: &AutomotiveDevConfig) -> Result<Action, ControllerError> {
        let name = config.metadata.name.as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("AutomotiveDevConfig missing name".to_string()))?;
        let namespace = config.metadata.namespace.as_deref()
            .unwrap_or("default");

        info!("Reconciling AutomotiveDevConfig {}/{}", namespace, name);

        if let Err(msg) = config.spec.validate() {
            warn!("Invalid AutomotiveDevConfig {}/{}: {}", namespace, name, msg);
            self.update_status(config, name, namespace, DevConfigPhase::Failed, Some(msg.clone())).await;
            return Err(ControllerError::InvalidConfig(msg));
        }

        match self.ensure_oauth_secrets(namespace).await {
            Ok(ensured) => {
                let changed = ensured
                    .iter()
                    .filter(|s| s.outcome != SecretOutcome::Unchanged)
                    .count();
                if changed > 0 {
                    info!("AutomotiveDevConfig {}/{}: {} OAuth secret(s) created or repaired", namespace, name, changed);
                }

                self.update_status(config, name, namespace, DevConfigPhase::Ready, Some(READY_MESSAGE.to_string())).await;
                self.reset_error(&resource_key(config));
                Ok(Action::requeue(RESYNC_INTERVAL))
            }
            Err(e) => {
                // Logged once by the watcher's error policy
                self.update_status(config, name, namespace, DevConfigPhase::Failed, Some(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Ensures the catalog's secrets in `namespace`.
    ///
    /// Waits for any other pass on the same namespace to finish first.
    pub async fn ensure_oauth_secrets(&self, namespace: &str) -> Result<Vec<EnsuredSecret>, ControllerError> {
        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let ensured = ensure_secrets(self.secret_store.as_ref(), namespace, &self.catalog).await?;
        for secret in &ensured {
            debug!("OAuth secret {}/{} {}", namespace, secret.name, secret.outcome);
        }
        Ok(ensured)
    }

    fn namespace_lock(&self, namespace: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.namespace_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(namespace.to_string()).or_default().clone()
    }

    /// Write status if phase or message changed. Failures are logged, not returned.
    async fn update_status(
        &self,
        config: &AutomotiveDevConfig,
        name: &str,
        namespace: &str,
        phase: DevConfigPhase,
        message: Option<String>,
    ) {
        if !status_needs_update(config.status.as_ref(), phase, message.as_deref()) {
            debug!("AutomotiveDevConfig {}/{} status unchanged", namespace, name);
            return;
        }

        let status = build_status(phase, message);
        if let Err(e) = self.status_writer.write_status(name, namespace, &status).await {
            error!("Failed to update AutomotiveDevConfig {}/{} status: {}", namespace, name, e);
        }
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Forget the backoff state of a resource (on successful reconciliation)
    ///
    /// A healthy resource has no entry, so the table only holds resources
    /// that are currently failing.
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    #[cfg(test)]
    fn tracked_backoff_count(&self) -> usize {
        self.backoff_states.lock().map(|states| states.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{AutomotiveDevConfigSpec, AutomotiveDevConfigStatus, BuildConfig};
    use k8s_openapi::api::core::v1::Secret;
    use oauth_secrets::{oauth_proxy_catalog, MockSecretStore, StoreError, COOKIE_SECRET_KEY};

    const NS: &str = "automotive-dev-operator-system";

    /// Records every status write
    #[derive(Clone, Default)]
    struct RecordingStatusWriter {
        writes: Arc<Mutex<Vec<(String, String, AutomotiveDevConfigStatus)>>>,
    }

    impl RecordingStatusWriter {
        fn writes(&self) -> Vec<(String, String, AutomotiveDevConfigStatus)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl StatusWriter for RecordingStatusWriter {
        async fn write_status(
            &self,
            name: &str,
            namespace: &str,
            status: &AutomotiveDevConfigStatus,
        ) -> Result<(), ControllerError> {
            self.writes
                .lock()
                .unwrap()
                .push((name.to_string(), namespace.to_string(), status.clone()));
            Ok(())
        }
    }

    fn reconciler() -> (Reconciler, MockSecretStore, RecordingStatusWriter) {
        let store = MockSecretStore::new();
        let writer = RecordingStatusWriter::default();
        let reconciler = Reconciler::new(
            Box::new(store.clone()),
            Box::new(writer.clone()),
            oauth_proxy_catalog(),
        );
        (reconciler, store, writer)
    }

    fn dev_config(spec: AutomotiveDevConfigSpec) -> AutomotiveDevConfig {
        let mut config = AutomotiveDevConfig::new("config", spec);
        config.metadata.namespace = Some(NS.to_string());
        config
    }

    #[tokio::test]
    async fn test_reconcile_creates_secrets_and_reports_ready() {
        let (reconciler, store, writer) = reconciler();

        let action = reconciler
            .reconcile_dev_config(&dev_config(AutomotiveDevConfigSpec::default()))
            .await
            .unwrap();

        assert_eq!(action, Action::requeue(RESYNC_INTERVAL));
        assert!(store.data_value("ado-webui-oauth-proxy", NS, COOKIE_SECRET_KEY).is_some());
        assert!(store.data_value("ado-build-api-oauth-proxy", NS, COOKIE_SECRET_KEY).is_some());

        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "config");
        assert_eq!(writes[0].1, NS);
        assert_eq!(writes[0].2.phase, DevConfigPhase::Ready);
    }

    #[tokio::test]
    async fn test_reconcile_skips_unchanged_status() {
        let (reconciler, _store, writer) = reconciler();
        let mut config = dev_config(AutomotiveDevConfigSpec::default());
        config.status = Some(AutomotiveDevConfigStatus {
            phase: DevConfigPhase::Ready,
            message: Some(READY_MESSAGE.to_string()),
            last_updated: None,
        });

        reconciler.reconcile_dev_config(&config).await.unwrap();

        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_invalid_spec_reports_failed() {
        let (reconciler, store, writer) = reconciler();
        let config = dev_config(AutomotiveDevConfigSpec {
            build_config: Some(BuildConfig {
                use_memory_volumes: true,
                ..Default::default()
            }),
        });

        let err = reconciler.reconcile_dev_config(&config).await.unwrap_err();

        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert!(store.calls().is_empty());
        let writes = writer.writes();
        assert_eq!(writes[0].2.phase, DevConfigPhase::Failed);
        assert!(writes[0].2.message.as_deref().unwrap().contains("memoryVolumeSize"));
    }

    #[tokio::test]
    async fn test_reconcile_store_failure_reports_failed() {
        let (reconciler, store, writer) = reconciler();
        store.fail_get("ado-webui-oauth-proxy", 403, "Forbidden");

        let err = reconciler
            .reconcile_dev_config(&dev_config(AutomotiveDevConfigSpec::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::Secrets(_)));
        // Fail-fast: the second secret is never looked at
        assert_eq!(store.calls().len(), 1);
        let writes = writer.writes();
        assert_eq!(writes[0].2.phase, DevConfigPhase::Failed);
        assert!(writes[0].2.message.as_deref().unwrap().contains("ado-webui-oauth-proxy"));
    }

    #[tokio::test]
    async fn test_ensure_oauth_secrets_is_idempotent() {
        let (reconciler, store, _writer) = reconciler();

        reconciler.ensure_oauth_secrets(NS).await.unwrap();
        store.clear_calls();
        let ensured = reconciler.ensure_oauth_secrets(NS).await.unwrap();

        assert!(ensured.iter().all(|s| s.outcome == SecretOutcome::Unchanged));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_backoff_grows_and_resets() {
        let (reconciler, _store, _writer) = reconciler();
        let key = "ns/config";

        reconciler.increment_error(key);
        assert_eq!(reconciler.get_backoff_for_resource(key), (60, 1));
        reconciler.increment_error(key);
        assert_eq!(reconciler.get_backoff_for_resource(key), (60, 2));
        reconciler.increment_error(key);
        assert_eq!(reconciler.get_backoff_for_resource(key), (120, 3));

        reconciler.reset_error(key);
        assert_eq!(reconciler.tracked_backoff_count(), 0);
        assert_eq!(reconciler.get_backoff_for_resource(key), (60, 0));
    }

    #[tokio::test]
    async fn test_success_drops_backoff_entry() {
        let (reconciler, _store, _writer) = reconciler();
        let config = dev_config(AutomotiveDevConfigSpec::default());
        let key = resource_key(&config);

        reconciler.increment_error(&key);
        reconciler.increment_error("other-ns/other");
        assert_eq!(reconciler.tracked_backoff_count(), 2);

        reconciler.reconcile_dev_config(&config).await.unwrap();

        assert_eq!(reconciler.tracked_backoff_count(), 1);
        assert_eq!(reconciler.get_backoff_for_resource(&key), (60, 0));
    }

    /// Yields to the runtime before every call, so concurrent passes interleave
    struct YieldingStore(MockSecretStore);

    #[async_trait::async_trait]
    impl SecretStore for YieldingStore {
        async fn get(&self, name: &str, namespace: &str) -> Result<Secret, StoreError> {
            tokio::task::yield_now().await;
            self.0.get(name, namespace).await
        }

        async fn create(&self, secret: &Secret) -> Result<Secret, StoreError> {
            tokio::task::yield_now().await;
            self.0.create(secret).await
        }

        async fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
            tokio::task::yield_now().await;
            self.0.update(secret).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_in_one_namespace() {
        let store = MockSecretStore::new();
        let reconciler = Reconciler::new(
            Box::new(YieldingStore(store.clone())),
            Box::new(RecordingStatusWriter::default()),
            oauth_proxy_catalog(),
        );

        let mut first = AutomotiveDevConfig::new("a", AutomotiveDevConfigSpec::default());
        first.metadata.namespace = Some(NS.to_string());
        let mut second = AutomotiveDevConfig::new("b", AutomotiveDevConfigSpec::default());
        second.metadata.namespace = Some(NS.to_string());

        let (a, b) = tokio::join!(
            reconciler.reconcile_dev_config(&first),
            reconciler.reconcile_dev_config(&second),
        );

        assert!(a.is_ok(), "first reconcile failed: {:?}", a.err());
        assert!(b.is_ok(), "second reconcile failed: {:?}", b.err());
        // Each secret is created once; the later pass finds it in place
        assert_eq!(store.len(), 2);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_resource_key() {
        let config = dev_config(AutomotiveDevConfigSpec::default());
        assert_eq!(resource_key(&config), "automotive-dev-operator-system/config");
    }
}
