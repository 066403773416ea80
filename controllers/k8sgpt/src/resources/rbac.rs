//! RBAC objects granting the k8sgpt pod read access to the cluster.
//!
//! The analysis engine lists and inspects arbitrary resources, so the role
//! is intentionally broad. The ClusterRole and ClusterRoleBinding are
//! cluster-scoped and cannot be garbage-collected through the namespaced
//! owner reference; the destroy pass deletes them explicitly.

use crate::error::ControllerError;
use crds::K8sGPT;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};

use super::{object_meta, APP_NAME};

/// Builds the ServiceAccount the deployment pods run as.
pub fn service_account(cr: &K8sGPT) -> Result<ServiceAccount, ControllerError> {
    Ok(ServiceAccount {
        metadata: object_meta(cr, APP_NAME, true)?,
        ..Default::default()
    })
}

/// Builds the cluster-wide read role for the analysis engine.
pub fn cluster_role(cr: &K8sGPT) -> Result<ClusterRole, ControllerError> {
    Ok(ClusterRole {
        metadata: object_meta(cr, APP_NAME, false)?,
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec!["*".to_string()]),
                resources: Some(vec!["*".to_string()]),
                verbs: vec![
                    "create".to_string(),
                    "list".to_string(),
                    "get".to_string(),
                    "watch".to_string(),
                    "delete".to_string(),
                ],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["apiextensions.k8s.io".to_string()]),
                resources: Some(vec!["*".to_string()]),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
        ]),
        ..Default::default()
    })
}

/// Binds the ServiceAccount in the instance namespace to the ClusterRole.
pub fn cluster_role_binding(cr: &K8sGPT) -> Result<ClusterRoleBinding, ControllerError> {
    let namespace = cr
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());

    Ok(ClusterRoleBinding {
        metadata: object_meta(cr, APP_NAME, false)?,
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: APP_NAME.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: APP_NAME.to_string(),
            namespace: Some(namespace),
            ..Default::default()
        }]),
    })
}
