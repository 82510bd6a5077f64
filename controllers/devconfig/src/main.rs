//! AutomotiveDevConfig Controller
//!
//! Watches `AutomotiveDevConfig` resources and, for each one, makes sure the
//! OAuth proxy secrets of the web UI and build API exist in the resource's
//! namespace with a random `cookie-secret`. The resource status reports
//! whether that succeeded.

mod backoff;
mod controller;
mod error;
mod reconciler;
mod status;
mod watcher;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting AutomotiveDevConfig Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok().filter(|ns| !ns.is_empty());

    info!("Configuration:");
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("all namespaces"));

    let controller = Controller::new(namespace).await?;
    controller.run().await?;

    Ok(())
}
