//! Kubernetes resource watcher.
//!
//! This module watches K8sGPT resources for changes and triggers
//! reconciliation using kube_runtime::Controller, wrapped in a finalizer so
//! deletion runs the cleanup pass before the object disappears.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::K8sGPT;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Finalizer guarding cleanup of the managed objects.
///
/// The cluster-scoped ClusterRole and ClusterRoleBinding cannot be garbage
/// collected through the namespaced owner reference, so deletion must pass
/// through the cleanup hook before the finalizer is lifted.
pub const FINALIZER_NAME: &str = "core.k8sgpt.ai/resources-cleanup";

/// Watches K8sGPT resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    k8sgpt_api: Api<K8sGPT>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, k8sgpt_api: Api<K8sGPT>) -> Self {
        Self {
            reconciler,
            k8sgpt_api,
        }
    }

    /// Starts watching K8sGPT resources. Runs until the watch stream ends.
    pub async fn watch_k8sgpts(&self) -> Result<(), ControllerError> {
        info!("Starting K8sGPT watcher");

        // Error policy: requeue with a fixed delay on errors
        let error_policy = |obj: Arc<K8sGPT>,
                            error: &FinalizerError<ControllerError>,
                            _ctx: Arc<Reconciler>| {
            error!("Reconciliation error for K8sGPT {}: {}", obj.name_any(), error);
            Action::requeue(Duration::from_secs(60))
        };

        let reconcile = |obj: Arc<K8sGPT>, ctx: Arc<Reconciler>| async move {
            debug!("Reconciling K8sGPT {}", obj.name_any());

            // The finalizer edit must go through an Api scoped to the
            // object's own namespace.
            let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
            let api: Api<K8sGPT> = Api::namespaced(ctx.client().clone(), &namespace);

            let reconciler = ctx.clone();
            finalizer(&api, FINALIZER_NAME, obj, |event| async move {
                match event {
                    Event::Apply(cr) => {
                        reconciler.reconcile_k8sgpt(&cr).await?;
                        Ok(Action::await_change())
                    }
                    Event::Cleanup(cr) => {
                        reconciler.cleanup_k8sgpt(&cr).await?;
                        Ok(Action::await_change())
                    }
                }
            })
            .await
        };

        // Debounce batches bursts of updates to one object; concurrency
        // bounds the number of instances reconciled at once.
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(3);

        Controller::new(self.k8sgpt_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                if let Err(e) = res {
                    error!("Controller error for K8sGPT: {}", e);
                }
            })
            .await;

        Ok(())
    }
}
