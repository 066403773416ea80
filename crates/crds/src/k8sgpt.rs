//! K8sGPT CRD
//!
//! Describes one managed K8sGPT instance: which image to run, which AI
//! backend it talks to, and (optionally) where it keeps its remote cache.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The only AI backend that accepts an engine override.
pub const AZURE_OPENAI: &str = "azureopenai";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.k8sgpt.ai",
    version = "v1alpha1",
    kind = "K8sGPT",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct K8sGPTSpec {
    /// Container image repository (e.g. "ghcr.io/k8sgpt-ai/k8sgpt")
    pub repository: String,

    /// Container image tag
    pub version: String,

    /// AI backend selection
    pub ai: AiConfig,

    /// Optional remote analysis cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_cache: Option<RemoteCacheConfig>,
}

/// AI backend configuration for the managed deployment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Backend provider name (e.g. "openai", "azureopenai")
    pub backend: String,

    /// Model name passed to the backend
    pub model: String,

    /// Engine override, only valid with the azureopenai backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Base URL override for self-hosted backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Secret holding the backend API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretRef>,
}

/// Reference to one key inside a Secret in the K8sGPT's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Secret name
    pub name: String,

    /// Key within the secret
    pub key: String,
}

/// Remote cache configuration.
///
/// The provider is a tagged choice rather than a pair of optional blocks,
/// so a remote cache with no provider (or two) cannot be constructed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCacheConfig {
    /// Secret holding the provider credentials
    pub credentials: CredentialsRef,

    /// Which cloud provider backs the cache
    pub provider: RemoteCacheProvider,
}

/// Reference to the Secret holding remote-cache credentials.
///
/// The keys read from the secret are fixed per provider; only the secret
/// name is configurable.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRef {
    /// Secret name
    pub name: String,
}

/// Supported remote-cache providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteCacheProvider {
    /// Azure Blob Storage, authenticated via a client id/tenant id/secret triple
    Azure,

    /// AWS S3, authenticated via an access-key pair
    S3,
}
