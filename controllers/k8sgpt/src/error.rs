//! Controller-specific error types.
//!
//! This module defines error types specific to the K8sGPT controller
//! that are not covered by upstream library errors.

use thiserror::Error;
use kube::Error as KubeError;

/// Errors that can occur in the K8sGPT controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid K8sGPT spec
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A secret named by the spec is absent from the target namespace
    #[error("referenced secret {0} does not exist, cannot create deployment")]
    MissingSecret(String),

    /// A desired object carries no name; nothing can be applied
    #[error("{0} is missing a name")]
    MissingName(String),

    /// Resource watch failed
    #[error("resource watch failed: {0}")]
    Watch(String),
}
