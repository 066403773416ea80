//! Reconciliation entry points for the K8sGPT CRD.
//!
//! The watcher hands every observed K8sGPT to one of the two passes here;
//! all object-level work happens in the [`crate::resources`] module.

use crate::error::ControllerError;
use crate::resources::{self, SyncMode};
use crds::K8sGPT;
use kube::{Client, ResourceExt};
use tracing::info;

/// Reconciles K8sGPT instances against the cluster.
pub struct Reconciler {
    client: Client,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Kubernetes client shared by the reconciliation passes.
    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Brings the managed objects of one K8sGPT in line with its spec.
    pub async fn reconcile_k8sgpt(&self, cr: &K8sGPT) -> Result<(), ControllerError> {
        info!("Reconciling K8sGPT {}", cr.name_any());
        resources::sync(&self.client, cr, SyncMode::Sync).await
    }

    /// Tears down the managed objects of a K8sGPT being deleted.
    ///
    /// Runs from the finalizer hook. The cluster-scoped role and binding
    /// have no owner-reference path to garbage collection, so this pass is
    /// the only thing that removes them.
    pub async fn cleanup_k8sgpt(&self, cr: &K8sGPT) -> Result<(), ControllerError> {
        info!("Cleaning up K8sGPT {}", cr.name_any());
        resources::sync(&self.client, cr, SyncMode::Destroy).await
    }
}
