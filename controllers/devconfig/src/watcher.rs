//! Kubernetes resource watchers.
//!
//! This module watches AutomotiveDevConfig resources and triggers
//! reconciliation using kube_runtime::Controller, which handles reconnection
//! and serialises reconciles of the same object.

use crate::error::ControllerError;
use crate::reconciler::{resource_key, Reconciler};
use crds::AutomotiveDevConfig;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    controller::{self, Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    dev_config_api: Api<AutomotiveDevConfig>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, dev_config_api: Api<AutomotiveDevConfig>) -> Self {
        Self {
            reconciler,
            dev_config_api,
        }
    }

    /// Starts watching AutomotiveDevConfig resources.
    ///
    /// Runs until the watch stream ends.
    pub async fn watch_dev_configs(&self) -> Result<(), ControllerError> {
        info!("Starting AutomotiveDevConfig watcher");

        // Error policy: requeue with Fibonacci backoff per resource
        let error_policy = |obj: Arc<AutomotiveDevConfig>, error: &ControllerError, ctx: Arc<Reconciler>| {
            let key = resource_key(&obj);
            ctx.increment_error(&key);
            let (backoff_seconds, error_count) = ctx.get_backoff_for_resource(&key);
            warn!(
                "Reconciliation error for AutomotiveDevConfig {} (attempt {}), retrying in {}s: {}",
                key, error_count, backoff_seconds, error
            );
            Action::requeue(Duration::from_secs(backoff_seconds))
        };

        let reconcile = |obj: Arc<AutomotiveDevConfig>, ctx: Arc<Reconciler>| async move {
            debug!("Reconciling AutomotiveDevConfig {}", resource_key(&obj));
            ctx.reconcile_dev_config(&obj).await
        };

        // Debounce batches bursts of events for the same object
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(1))
            .concurrency(2);

        Controller::new(self.dev_config_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _action)) => debug!("Reconciled AutomotiveDevConfig {}", obj.name),
                    // Already reported by the error policy
                    Err(controller::Error::ReconcilerFailed(_, obj)) => {
                        debug!("Reconcile of AutomotiveDevConfig {} failed", obj.name)
                    }
                    Err(e) => error!("Controller error for AutomotiveDevConfig: {}", e),
                }
            })
            .await;

        Ok(())
    }
}
