//! Service exposing the k8sgpt analysis API inside the cluster.

use crate::error::ControllerError;
use crds::K8sGPT;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use std::collections::BTreeMap;

use super::{object_meta, APP_NAME, DEPLOYMENT_NAME};

/// gRPC port served by the k8sgpt deployment.
pub const SERVE_PORT: i32 = 8080;

/// Builds the ClusterIP Service selecting the k8sgpt deployment pods.
pub fn service(cr: &K8sGPT) -> Result<Service, ControllerError> {
    Ok(Service {
        metadata: object_meta(cr, APP_NAME, true)?,
        spec: Some(ServiceSpec {
            selector: Some(selector_labels()),
            ports: Some(vec![ServicePort {
                port: SERVE_PORT,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Label set shared by the Service selector and the deployment pods.
pub(crate) fn selector_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), DEPLOYMENT_NAME.to_string())])
}
