//! K8sGPT Controller
//!
//! Reconciles each K8sGPT custom resource into the workload that runs the
//! analysis engine: a Deployment plus its Service, ServiceAccount and
//! cluster-read RBAC. Deletion is guarded by a finalizer so the
//! cluster-scoped RBAC objects are torn down with the instance.

mod backoff;
mod controller;
mod error;
mod reconciler;
mod resources;
mod watcher;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting K8sGPT Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        namespace.as_deref().unwrap_or("all namespaces")
    );

    // Initialize and run controller
    let controller = Controller::new(namespace).await?;
    controller.run().await?;

    Ok(())
}
