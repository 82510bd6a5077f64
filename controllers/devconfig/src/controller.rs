//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the secret store and the AutomotiveDevConfig watcher together.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::status::KubeStatusWriter;
use crate::watcher::Watcher;
use crds::AutomotiveDevConfig;
use kube::{Api, Client};
use oauth_secrets::{oauth_proxy_catalog, KubeSecretStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Main controller for AutomotiveDevConfig management.
pub struct Controller {
    dev_config_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Watches `namespace`, or every namespace when `None`.
    pub async fn new(namespace: Option<String>) -> Result<Self, ControllerError> {
        info!("Initializing AutomotiveDevConfig Controller");

        if rustls::crypto::ring::default_provider().install_default().is_err() {
            debug!("rustls crypto provider already installed");
        }

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        let dev_config_api: Api<AutomotiveDevConfig> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let reconciler = Reconciler::new(
            Box::new(KubeSecretStore::new(kube_client.clone())),
            Box::new(KubeStatusWriter::new(kube_client)),
            oauth_proxy_catalog(),
        );

        let watcher = Watcher::new(Arc::new(reconciler), dev_config_api);

        // Start watcher in a background task
        let dev_config_watcher = tokio::spawn(async move {
            watcher.watch_dev_configs().await
        });

        Ok(Self { dev_config_watcher })
    }

    /// Runs the controller until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("AutomotiveDevConfig Controller running");

        self.dev_config_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("AutomotiveDevConfig watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("AutomotiveDevConfig watcher error: {}", e)))?;

        info!("AutomotiveDevConfig Controller stopped");
        Ok(())
    }
}
