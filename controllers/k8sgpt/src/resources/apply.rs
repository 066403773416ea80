//! Create-or-patch primitives for managed objects.
//!
//! One generic apply path serves every managed kind. The per-kind merge
//! strategy lives in a registry expressed as an associated constant on
//! [`ManagedResource`]: stateful kinds (Deployment, Service) carry a
//! spec-only merge, stateless kinds carry none and are only created when
//! absent. Writes racing with other reconciliation passes are retried on
//! optimistic-concurrency conflicts.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Maximum write attempts for one object before a conflict is surfaced.
const CONFLICT_RETRY_ATTEMPTS: u32 = 5;
/// First conflict retry delay in milliseconds.
const CONFLICT_BACKOFF_MIN_MS: u64 = 10;
/// Conflict retry delay cap in milliseconds.
const CONFLICT_BACKOFF_MAX_MS: u64 = 160;

/// A Kubernetes kind managed by the sync pass.
///
/// `SPEC_MERGE` is the kind's entry in the merge-strategy registry: `Some`
/// means the cluster object's spec is overwritten with the desired spec on
/// every pass (metadata and status are preserved), `None` means the object
/// is created once and otherwise left untouched.
pub trait ManagedResource:
    Resource<DynamicType: Default> + Clone + Debug + DeserializeOwned + Serialize
{
    /// Optional spec-only merge strategy for this kind.
    const SPEC_MERGE: Option<fn(&mut Self, &Self)>;
}

fn merge_deployment_spec(existing: &mut Deployment, desired: &Deployment) {
    existing.spec = desired.spec.clone();
}

fn merge_service_spec(existing: &mut Service, desired: &Service) {
    existing.spec = desired.spec.clone();
}

impl ManagedResource for Deployment {
    const SPEC_MERGE: Option<fn(&mut Self, &Self)> = Some(merge_deployment_spec);
}

impl ManagedResource for Service {
    const SPEC_MERGE: Option<fn(&mut Self, &Self)> = Some(merge_service_spec);
}

impl ManagedResource for ServiceAccount {
    const SPEC_MERGE: Option<fn(&mut Self, &Self)> = None;
}

impl ManagedResource for ClusterRole {
    const SPEC_MERGE: Option<fn(&mut Self, &Self)> = None;
}

impl ManagedResource for ClusterRoleBinding {
    const SPEC_MERGE: Option<fn(&mut Self, &Self)> = None;
}

/// Creates the desired object, or merges its spec into the existing one.
///
/// The fetch-and-write step is retried on optimistic-concurrency conflicts
/// (the resource version moved between read and write) with a bounded
/// Fibonacci backoff; every other error propagates immediately.
pub async fn apply<K: ManagedResource>(api: &Api<K>, desired: &K) -> Result<(), ControllerError> {
    let name = object_name(desired)?;

    let mut backoff = FibonacciBackoff::new(CONFLICT_BACKOFF_MIN_MS, CONFLICT_BACKOFF_MAX_MS);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match apply_once(api, &name, desired).await {
            Err(ControllerError::Kube(ref e))
                if is_conflict(e) && attempt < CONFLICT_RETRY_ATTEMPTS =>
            {
                let delay = backoff.next_backoff();
                debug!(
                    "conflict applying {} (attempt {}), retrying in {:?}",
                    name, attempt, delay
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

/// One fetch-and-write cycle. The existing object is re-read on every call
/// so a retry after a conflict picks up the new resource version.
async fn apply_once<K: ManagedResource>(
    api: &Api<K>,
    name: &str,
    desired: &K,
) -> Result<(), ControllerError> {
    match api.get_opt(name).await? {
        None => {
            api.create(&PostParams::default(), desired).await?;
            debug!("created {}", name);
            Ok(())
        }
        Some(existing) => {
            let Some(merge) = K::SPEC_MERGE else {
                // Stateless kind, nothing to reconcile once it exists.
                return Ok(());
            };
            let mut updated = existing;
            merge(&mut updated, desired);
            api.replace(name, &PostParams::default(), &updated).await?;
            debug!("patched spec of {}", name);
            Ok(())
        }
    }
}

/// Deletes the object; an absent object counts as success.
pub async fn delete<K: ManagedResource>(api: &Api<K>, desired: &K) -> Result<(), ControllerError> {
    let name = object_name(desired)?;
    match api.delete(&name, &DeleteParams::default()).await {
        Ok(_) => {
            debug!("deleted {}", name);
            Ok(())
        }
        Err(ref e) if is_not_found(e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn object_name<K: ManagedResource>(desired: &K) -> Result<String, ControllerError> {
    desired.meta().name.clone().ok_or_else(|| {
        ControllerError::MissingName(K::kind(&K::DynamicType::default()).into_owned())
    })
}

/// True for a write rejected because the resource version moved.
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "Conflict")
}

/// True for a create rejected because the object is already there.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists")
}

/// True for a read or delete against an absent object.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
