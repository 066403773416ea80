//! K8sGPT CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the K8sGPT operator.

pub mod k8sgpt;

pub use k8sgpt::*;
