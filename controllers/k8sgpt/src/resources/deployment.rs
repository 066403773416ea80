//! Deployment running the k8sgpt analysis server.
//!
//! This is the only builder with real logic: the container environment is
//! assembled from the AI backend configuration and the optional remote
//! cache credentials, and the engine override is validated against the
//! backend before anything reaches the cluster.

use crate::error::ControllerError;
use crds::{K8sGPT, RemoteCacheProvider, AZURE_OPENAI};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource, PodSpec,
    PodTemplateSpec, ResourceRequirements, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

use super::service::{selector_labels, SERVE_PORT};
use super::{object_meta, APP_NAME, DEPLOYMENT_NAME};

/// Scratch volume holding the k8sgpt config and cache directories.
const DATA_VOLUME: &str = "k8sgpt-vol";
const DATA_MOUNT_PATH: &str = "/k8sgpt-data";

/// Builds the single-replica Deployment for one K8sGPT instance.
pub fn deployment(cr: &K8sGPT) -> Result<Deployment, ControllerError> {
    let spec = &cr.spec;

    Ok(Deployment {
        metadata: object_meta(cr, DEPLOYMENT_NAME, true)?,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                    labels: Some(selector_labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(APP_NAME.to_string()),
                    containers: vec![Container {
                        name: APP_NAME.to_string(),
                        image: Some(format!("{}:{}", spec.repository, spec.version)),
                        image_pull_policy: Some("Always".to_string()),
                        args: Some(vec!["serve".to_string()]),
                        ports: Some(vec![ContainerPort {
                            container_port: SERVE_PORT,
                            ..Default::default()
                        }]),
                        env: Some(container_env(cr)?),
                        resources: Some(container_resources()),
                        volume_mounts: Some(vec![VolumeMount {
                            name: DATA_VOLUME.to_string(),
                            mount_path: DATA_MOUNT_PATH.to_string(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![Volume {
                        name: DATA_VOLUME.to_string(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Assembles the container environment from the instance configuration.
///
/// An engine override is only meaningful for the Azure OpenAI backend; any
/// other combination is rejected before the deployment is built.
pub(crate) fn container_env(cr: &K8sGPT) -> Result<Vec<EnvVar>, ControllerError> {
    let ai = &cr.spec.ai;

    let mut env = vec![
        plain_env("K8SGPT_MODEL", &ai.model),
        plain_env("K8SGPT_BACKEND", &ai.backend),
        plain_env("XDG_CONFIG_HOME", "/k8sgpt-data/.config"),
        plain_env("XDG_CACHE_HOME", "/k8sgpt-data/.cache"),
    ];

    if let Some(secret) = &ai.secret {
        env.push(secret_env("K8SGPT_PASSWORD", &secret.name, &secret.key));
    }

    if let Some(cache) = &cr.spec.remote_cache {
        let credentials = &cache.credentials.name;
        match cache.provider {
            RemoteCacheProvider::Azure => {
                env.push(secret_env("AZURE_CLIENT_ID", credentials, "azure_client_id"));
                env.push(secret_env("AZURE_TENANT_ID", credentials, "azure_tenant_id"));
                env.push(secret_env(
                    "AZURE_CLIENT_SECRET",
                    credentials,
                    "azure_client_secret",
                ));
            }
            RemoteCacheProvider::S3 => {
                env.push(secret_env(
                    "AWS_ACCESS_KEY_ID",
                    credentials,
                    "aws_access_key_id",
                ));
                env.push(secret_env(
                    "AWS_SECRET_ACCESS_KEY",
                    credentials,
                    "aws_secret_access_key",
                ));
            }
        }
    }

    // Empty strings count as unset for the two optional overrides.
    if let Some(base_url) = ai.base_url.as_deref().filter(|s| !s.is_empty()) {
        env.push(plain_env("K8SGPT_BASEURL", base_url));
    }

    if let Some(engine) = ai.engine.as_deref().filter(|s| !s.is_empty()) {
        if ai.backend != AZURE_OPENAI {
            return Err(ControllerError::Validation(
                "engine is supported only by the azureopenai backend".to_string(),
            ));
        }
        env.push(plain_env("K8SGPT_ENGINE", engine));
    }

    Ok(env)
}

fn container_resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("0.2".to_string())),
            ("memory".to_string(), Quantity("156Mi".to_string())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("1".to_string())),
            ("memory".to_string(), Quantity("512Mi".to_string())),
        ])),
        ..Default::default()
    }
}

fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn secret_env(name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
