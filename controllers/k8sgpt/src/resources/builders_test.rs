#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::resources::apply::ManagedResource;
    use crate::resources::deployment::container_env;
    use crate::resources::{deployment, desired_objects, rbac, service, DesiredObject};
    use crds::{
        AiConfig, CredentialsRef, K8sGPT, K8sGPTSpec, RemoteCacheConfig, RemoteCacheProvider,
        SecretRef,
    };
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{EnvVar, Service, ServiceAccount};
    use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
    use kube::api::ObjectMeta;

    fn test_cr() -> K8sGPT {
        let mut cr = K8sGPT::new(
            "my-k8sgpt",
            K8sGPTSpec {
                repository: "ghcr.io/k8sgpt-ai/k8sgpt".to_string(),
                version: "v0.3.8".to_string(),
                ai: AiConfig {
                    backend: "openai".to_string(),
                    model: "gpt-3.5-turbo".to_string(),
                    engine: None,
                    base_url: None,
                    secret: None,
                },
                remote_cache: None,
            },
        );
        cr.metadata.namespace = Some("k8sgpt-system".to_string());
        cr.metadata.uid = Some("0000-1111".to_string());
        cr
    }

    fn env_names(env: &[EnvVar]) -> Vec<&str> {
        env.iter().map(|e| e.name.as_str()).collect()
    }

    fn find<'a>(env: &'a [EnvVar], name: &str) -> Option<&'a EnvVar> {
        env.iter().find(|e| e.name == name)
    }

    fn assert_owned_by_cr(meta: &ObjectMeta) {
        let refs = meta.owner_references.as_ref().expect("owner references");
        assert_eq!(refs.len(), 1);
        let owner = &refs[0];
        assert_eq!(owner.api_version, "core.k8sgpt.ai/v1alpha1");
        assert_eq!(owner.kind, "K8sGPT");
        assert_eq!(owner.name, "my-k8sgpt");
        assert_eq!(owner.uid, "0000-1111");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }

    #[test]
    fn test_all_objects_carry_the_owner_reference() {
        let cr = test_cr();

        for object in desired_objects(&cr).expect("builders") {
            match object {
                DesiredObject::Service(o) => assert_owned_by_cr(&o.metadata),
                DesiredObject::ServiceAccount(o) => assert_owned_by_cr(&o.metadata),
                DesiredObject::ClusterRole(o) => assert_owned_by_cr(&o.metadata),
                DesiredObject::ClusterRoleBinding(o) => assert_owned_by_cr(&o.metadata),
                DesiredObject::Deployment(o) => assert_owned_by_cr(&o.metadata),
            }
        }
    }

    #[test]
    fn test_namespaced_objects_land_in_the_cr_namespace() {
        let cr = test_cr();

        let svc = service::service(&cr).expect("service");
        let sa = rbac::service_account(&cr).expect("service account");
        let deploy = deployment::deployment(&cr).expect("deployment");
        assert_eq!(svc.metadata.namespace.as_deref(), Some("k8sgpt-system"));
        assert_eq!(sa.metadata.namespace.as_deref(), Some("k8sgpt-system"));
        assert_eq!(deploy.metadata.namespace.as_deref(), Some("k8sgpt-system"));

        let role = rbac::cluster_role(&cr).expect("cluster role");
        let binding = rbac::cluster_role_binding(&cr).expect("binding");
        assert_eq!(role.metadata.namespace, None);
        assert_eq!(binding.metadata.namespace, None);
    }

    #[test]
    fn test_nameless_cr_is_rejected() {
        let mut cr = test_cr();
        cr.metadata.name = None;

        let err = service::service(&cr).expect_err("nameless cr");
        assert!(matches!(err, ControllerError::MissingName(_)));
    }

    #[test]
    fn test_service_selects_the_deployment_pods() {
        let cr = test_cr();

        let svc = service::service(&cr).expect("service");
        let deploy = deployment::deployment(&cr).expect("deployment");

        let selector = svc.spec.as_ref().and_then(|s| s.selector.as_ref()).expect("selector");
        let pod_labels = deploy
            .spec
            .as_ref()
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.as_ref())
            .expect("pod labels");
        assert_eq!(selector, pod_labels);
        assert_eq!(selector.get("app").map(String::as_str), Some("k8sgpt-deployment"));
        // Selection happens through spec.selector; the Service itself is unlabeled
        assert_eq!(svc.metadata.labels, None);
    }

    #[test]
    fn test_binding_points_at_the_role_and_service_account() {
        let cr = test_cr();
        let binding = rbac::cluster_role_binding(&cr).expect("binding");

        assert_eq!(binding.role_ref.kind, "ClusterRole");
        assert_eq!(binding.role_ref.name, "k8sgpt");
        let subjects = binding.subjects.expect("subjects");
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].kind, "ServiceAccount");
        assert_eq!(subjects[0].name, "k8sgpt");
        assert_eq!(subjects[0].namespace.as_deref(), Some("k8sgpt-system"));
    }

    #[test]
    fn test_deployment_container_shape() {
        let cr = test_cr();
        let deploy = deployment::deployment(&cr).expect("deployment");

        let spec = deploy.spec.expect("spec");
        assert_eq!(spec.replicas, Some(1));

        let pod = spec.template.spec.expect("pod spec");
        assert_eq!(pod.service_account_name.as_deref(), Some("k8sgpt"));
        assert_eq!(pod.containers.len(), 1);

        let container = &pod.containers[0];
        assert_eq!(
            container.image.as_deref(),
            Some("ghcr.io/k8sgpt-ai/k8sgpt:v0.3.8")
        );
        assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));
        assert_eq!(container.args, Some(vec!["serve".to_string()]));
        assert_eq!(
            container.ports.as_ref().map(|p| p[0].container_port),
            Some(8080)
        );

        let mounts = container.volume_mounts.as_ref().expect("mounts");
        assert_eq!(mounts[0].name, "k8sgpt-vol");
        assert_eq!(mounts[0].mount_path, "/k8sgpt-data");
    }

    #[test]
    fn test_base_env_for_a_minimal_spec() {
        let cr = test_cr();
        let env = container_env(&cr).expect("env");

        assert_eq!(
            env_names(&env),
            vec![
                "K8SGPT_MODEL",
                "K8SGPT_BACKEND",
                "XDG_CONFIG_HOME",
                "XDG_CACHE_HOME",
            ]
        );
        assert_eq!(
            find(&env, "K8SGPT_MODEL").and_then(|e| e.value.as_deref()),
            Some("gpt-3.5-turbo")
        );
        assert_eq!(
            find(&env, "XDG_CONFIG_HOME").and_then(|e| e.value.as_deref()),
            Some("/k8sgpt-data/.config")
        );
    }

    #[test]
    fn test_password_sourced_from_the_referenced_secret() {
        let mut cr = test_cr();
        cr.spec.ai.secret = Some(SecretRef {
            name: "openai-key".to_string(),
            key: "api-key".to_string(),
        });

        let env = container_env(&cr).expect("env");
        let password = find(&env, "K8SGPT_PASSWORD").expect("password var");
        let selector = password
            .value_from
            .as_ref()
            .and_then(|s| s.secret_key_ref.as_ref())
            .expect("secret key ref");
        assert_eq!(selector.name.as_str(), "openai-key");
        assert_eq!(selector.key, "api-key");
    }

    #[test]
    fn test_base_url_is_forwarded() {
        let mut cr = test_cr();
        cr.spec.ai.base_url = Some("http://llm.internal:11434".to_string());

        let env = container_env(&cr).expect("env");
        assert_eq!(
            find(&env, "K8SGPT_BASEURL").and_then(|e| e.value.as_deref()),
            Some("http://llm.internal:11434")
        );
    }

    #[test]
    fn test_empty_overrides_are_treated_as_unset() {
        let mut cr = test_cr();
        cr.spec.ai.base_url = Some(String::new());
        cr.spec.ai.engine = Some(String::new());

        // An empty engine on a non-azureopenai backend is not an error
        let env = container_env(&cr).expect("env");
        assert!(find(&env, "K8SGPT_BASEURL").is_none());
        assert!(find(&env, "K8SGPT_ENGINE").is_none());
    }

    #[test]
    fn test_engine_requires_the_azure_openai_backend() {
        let mut cr = test_cr();
        cr.spec.ai.engine = Some("gpt4-deployment".to_string());

        let err = container_env(&cr).expect_err("openai backend with engine");
        assert!(matches!(err, ControllerError::Validation(_)));
    }

    #[test]
    fn test_engine_forwarded_for_azure_openai() {
        let mut cr = test_cr();
        cr.spec.ai.backend = "azureopenai".to_string();
        cr.spec.ai.engine = Some("gpt4-deployment".to_string());

        let env = container_env(&cr).expect("env");
        assert_eq!(
            find(&env, "K8SGPT_ENGINE").and_then(|e| e.value.as_deref()),
            Some("gpt4-deployment")
        );
    }

    #[test]
    fn test_azure_cache_injects_the_credential_triple() {
        let mut cr = test_cr();
        cr.spec.remote_cache = Some(RemoteCacheConfig {
            credentials: CredentialsRef {
                name: "azure-creds".to_string(),
            },
            provider: RemoteCacheProvider::Azure,
        });

        let env = container_env(&cr).expect("env");
        for (var, key) in [
            ("AZURE_CLIENT_ID", "azure_client_id"),
            ("AZURE_TENANT_ID", "azure_tenant_id"),
            ("AZURE_CLIENT_SECRET", "azure_client_secret"),
        ] {
            let selector = find(&env, var)
                .and_then(|e| e.value_from.as_ref())
                .and_then(|s| s.secret_key_ref.as_ref())
                .expect(var);
            assert_eq!(selector.name.as_str(), "azure-creds");
            assert_eq!(selector.key, key);
        }
        assert!(find(&env, "AWS_ACCESS_KEY_ID").is_none());
        assert!(find(&env, "AWS_SECRET_ACCESS_KEY").is_none());
    }

    #[test]
    fn test_s3_cache_injects_the_access_key_pair() {
        let mut cr = test_cr();
        cr.spec.remote_cache = Some(RemoteCacheConfig {
            credentials: CredentialsRef {
                name: "s3-creds".to_string(),
            },
            provider: RemoteCacheProvider::S3,
        });

        let env = container_env(&cr).expect("env");
        for (var, key) in [
            ("AWS_ACCESS_KEY_ID", "aws_access_key_id"),
            ("AWS_SECRET_ACCESS_KEY", "aws_secret_access_key"),
        ] {
            let selector = find(&env, var)
                .and_then(|e| e.value_from.as_ref())
                .and_then(|s| s.secret_key_ref.as_ref())
                .expect(var);
            assert_eq!(selector.name.as_str(), "s3-creds");
            assert_eq!(selector.key, key);
        }
        assert!(find(&env, "AZURE_CLIENT_ID").is_none());
    }

    #[test]
    fn test_merge_registry_covers_the_stateful_kinds_only() {
        assert!(Deployment::SPEC_MERGE.is_some());
        assert!(Service::SPEC_MERGE.is_some());
        assert!(ServiceAccount::SPEC_MERGE.is_none());
        assert!(ClusterRole::SPEC_MERGE.is_none());
        assert!(ClusterRoleBinding::SPEC_MERGE.is_none());
    }

    #[test]
    fn test_spec_merge_preserves_existing_metadata() {
        let cr = test_cr();
        let desired = deployment::deployment(&cr).expect("deployment");

        let mut existing = desired.clone();
        existing.metadata.resource_version = Some("42".to_string());
        existing.spec.as_mut().expect("spec").replicas = Some(3);

        let merge = Deployment::SPEC_MERGE.expect("merge strategy");
        merge(&mut existing, &desired);

        assert_eq!(existing.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(existing.spec.and_then(|s| s.replicas), Some(1));
    }
}
