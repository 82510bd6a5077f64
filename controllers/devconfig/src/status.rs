//! Status reporting for AutomotiveDevConfig resources.
//!
//! The reconciler writes status through the `StatusWriter` trait so it can be
//! unit tested without an API server.

use crate::error::ControllerError;
use async_trait::async_trait;
use chrono::Utc;
use crds::{AutomotiveDevConfig, AutomotiveDevConfigStatus, DevConfigPhase};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;

/// Writes the status subresource of an AutomotiveDevConfig.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write_status(
        &self,
        name: &str,
        namespace: &str,
        status: &AutomotiveDevConfigStatus,
    ) -> Result<(), ControllerError>;
}

/// [`StatusWriter`] that merge-patches the status subresource.
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn write_status(
        &self,
        name: &str,
        namespace: &str,
        status: &AutomotiveDevConfigStatus,
    ) -> Result<(), ControllerError> {
        let api: Api<AutomotiveDevConfig> = Api::namespaced(self.client.clone(), namespace);
        let status_patch = serde_json::json!({
            "status": status
        });

        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }
}

/// Status with the given phase and message, stamped now.
pub fn build_status(phase: DevConfigPhase, message: Option<String>) -> AutomotiveDevConfigStatus {
    AutomotiveDevConfigStatus {
        phase,
        message,
        last_updated: Some(Utc::now()),
    }
}

/// Whether the observed status differs from the desired phase and message.
///
/// `lastUpdated` is ignored so a steady state does not keep patching the
/// object and re-triggering the watch.
pub fn status_needs_update(
    current: Option<&AutomotiveDevConfigStatus>,
    phase: DevConfigPhase,
    message: Option<&str>,
) -> bool {
    match current {
        Some(status) => status.phase != phase || status.message.as_deref() != message,
        None => true,
    }
}
