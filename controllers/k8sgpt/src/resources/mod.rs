//! Desired-state builders and the sync pass for one K8sGPT instance.
//!
//! Each K8sGPT custom resource owns a fixed topology of five objects:
//! Service, ServiceAccount, ClusterRole, ClusterRoleBinding, Deployment.
//! The builders here are pure functions from the CR to one desired object
//! each; [`sync`] walks them in order and either applies or deletes them.

pub mod apply;
pub mod deployment;
pub mod rbac;
pub mod service;
#[cfg(test)]
mod builders_test;

use crate::error::ControllerError;
use crds::K8sGPT;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Api, Client, Resource};
use tracing::{debug, info};

/// Shared name for the Service, ServiceAccount, ClusterRole and binding.
pub const APP_NAME: &str = "k8sgpt";
/// Name of the managed Deployment, also used as the pod selector label.
pub const DEPLOYMENT_NAME: &str = "k8sgpt-deployment";

/// What a sync pass should do with the desired objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Create absent objects, patch the spec of stateful ones
    Sync,
    /// Delete the objects, tolerating ones already gone
    Destroy,
}

/// One fully built desired object, tagged by kind so a pass can walk the
/// topology as a list while keeping the typed API per kind.
#[derive(Debug, Clone)]
pub enum DesiredObject {
    /// The k8sgpt Service
    Service(Service),
    /// The k8sgpt ServiceAccount
    ServiceAccount(ServiceAccount),
    /// The cluster-read ClusterRole
    ClusterRole(ClusterRole),
    /// Binding of the ServiceAccount to the ClusterRole
    ClusterRoleBinding(ClusterRoleBinding),
    /// The k8sgpt Deployment
    Deployment(Deployment),
}

impl DesiredObject {
    fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "Service",
            Self::ServiceAccount(_) => "ServiceAccount",
            Self::ClusterRole(_) => "ClusterRole",
            Self::ClusterRoleBinding(_) => "ClusterRoleBinding",
            Self::Deployment(_) => "Deployment",
        }
    }

    async fn apply(&self, client: &Client, namespace: &str) -> Result<(), ControllerError> {
        match self {
            Self::Service(svc) => {
                apply::apply(&Api::namespaced(client.clone(), namespace), svc).await
            }
            Self::ServiceAccount(sa) => {
                apply::apply(&Api::namespaced(client.clone(), namespace), sa).await
            }
            Self::ClusterRole(role) => apply::apply(&Api::all(client.clone()), role).await,
            Self::ClusterRoleBinding(binding) => {
                apply::apply(&Api::all(client.clone()), binding).await
            }
            Self::Deployment(deploy) => {
                apply::apply(&Api::namespaced(client.clone(), namespace), deploy).await
            }
        }
    }

    async fn destroy(&self, client: &Client, namespace: &str) -> Result<(), ControllerError> {
        match self {
            Self::Service(svc) => {
                apply::delete(&Api::namespaced(client.clone(), namespace), svc).await
            }
            Self::ServiceAccount(sa) => {
                apply::delete(&Api::namespaced(client.clone(), namespace), sa).await
            }
            Self::ClusterRole(role) => apply::delete(&Api::all(client.clone()), role).await,
            Self::ClusterRoleBinding(binding) => {
                apply::delete(&Api::all(client.clone()), binding).await
            }
            Self::Deployment(deploy) => {
                apply::delete(&Api::namespaced(client.clone(), namespace), deploy).await
            }
        }
    }
}

/// Builds the five desired objects in their fixed order.
///
/// The ServiceAccount precedes the Deployment that references it; the API
/// server would accept either order, so this is defensive only.
pub fn desired_objects(cr: &K8sGPT) -> Result<Vec<DesiredObject>, ControllerError> {
    Ok(vec![
        DesiredObject::Service(service::service(cr)?),
        DesiredObject::ServiceAccount(rbac::service_account(cr)?),
        DesiredObject::ClusterRole(rbac::cluster_role(cr)?),
        DesiredObject::ClusterRoleBinding(rbac::cluster_role_binding(cr)?),
        DesiredObject::Deployment(deployment::deployment(cr)?),
    ])
}

/// Reconciles every managed object of one K8sGPT instance.
///
/// Objects are processed sequentially; the first fatal error aborts the
/// pass and objects already written stay written (no rollback).
pub async fn sync(client: &Client, cr: &K8sGPT, mode: SyncMode) -> Result<(), ControllerError> {
    let namespace = cr.metadata.namespace.as_deref().unwrap_or("default");
    let objects = desired_objects(cr)?;

    // The deployment sources its password from this secret; a dangling
    // reference must fail before anything is written.
    if mode == SyncMode::Sync {
        if let Some(secret) = &cr.spec.ai.secret {
            ensure_secret_exists(client, namespace, &secret.name).await?;
        }
    }

    for object in &objects {
        match mode {
            SyncMode::Sync => {
                match object.apply(client, namespace).await {
                    Ok(()) => info!("synced {} for {}", object.kind(), namespace),
                    Err(ControllerError::Kube(ref e)) if apply::is_already_exists(e) => {
                        debug!("{} already exists, leaving it as-is", object.kind());
                    }
                    Err(e) => return Err(e),
                }
            }
            SyncMode::Destroy => {
                object.destroy(client, namespace).await?;
                info!("destroyed {} for {}", object.kind(), namespace);
            }
        }
    }

    Ok(())
}

async fn ensure_secret_exists(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<(), ControllerError> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match secrets.get_opt(name).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ControllerError::MissingSecret(name.to_string())),
        Err(e) => {
            debug!("failed to look up secret {}/{}: {}", namespace, name, e);
            Err(ControllerError::MissingSecret(name.to_string()))
        }
    }
}

/// Owner reference pointing every desired object back at its K8sGPT.
///
/// All five builders stamp this one value, which is what makes cascade
/// deletion of the namespaced objects correct.
pub(crate) fn owner_reference(cr: &K8sGPT) -> Result<OwnerReference, ControllerError> {
    Ok(OwnerReference {
        api_version: K8sGPT::api_version(&()).into_owned(),
        kind: K8sGPT::kind(&()).into_owned(),
        name: cr
            .metadata
            .name
            .clone()
            .ok_or_else(|| ControllerError::MissingName("K8sGPT".to_string()))?,
        uid: cr.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Metadata shared by the builders: conventional name, owner reference,
/// and a namespace for the namespaced kinds.
pub(crate) fn object_meta(
    cr: &K8sGPT,
    name: &str,
    namespaced: bool,
) -> Result<ObjectMeta, ControllerError> {
    Ok(ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespaced
            .then(|| cr.metadata.namespace.clone().unwrap_or_else(|| "default".to_string())),
        owner_references: Some(vec![owner_reference(cr)?]),
        ..Default::default()
    })
}
