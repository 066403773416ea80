//! Emits the K8sGPT CRD manifest as YAML on stdout.
//!
//! Usage: `cargo run --bin crdgen > config/crd/k8sgpt.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::K8sGPT::crd())?);
    Ok(())
}
