//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the reconciler and the K8sGPT watcher together.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::K8sGPT;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for K8sGPT resource management.
pub struct Controller {
    k8sgpt_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// With a namespace the controller watches K8sGPT objects in that
    /// namespace only; without one it watches the whole cluster.
    pub async fn new(namespace: Option<String>) -> Result<Self, ControllerError> {
        info!("Initializing K8sGPT Controller");

        let kube_client = Client::try_default().await?;

        let k8sgpt_api: Api<K8sGPT> = match namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let reconciler = Arc::new(Reconciler::new(kube_client));
        let watcher_instance = Arc::new(Watcher::new(reconciler, k8sgpt_api));

        let k8sgpt_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_k8sgpts().await })
        };

        Ok(Self { k8sgpt_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("K8sGPT Controller running");

        // The watcher should run forever; its exit is a failure either way.
        self.k8sgpt_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("K8sGPT watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("K8sGPT watcher error: {}", e)))?;

        Ok(())
    }
}
