//! The three deployment jobs: fetch secrets, create namespace, create deployment

use crate::job::{Job, JobError, JobSpec};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use vault_deploy_core::{ClusterConnector, DeployConfig, DeployError, deployment, fetch, namespace};
use vault_rs::SecretReader;

pub const FETCH_SECRETS: JobSpec = JobSpec {
    id: "fetch-secrets",
    title: "Get secrets from vault",
    description: "Get secrets from vault",
    priority: 0,
};

pub const CREATE_NAMESPACE: JobSpec = JobSpec {
    id: "create-namespace",
    title: "Create kubernetes namespace",
    description: "Create kubernetes namespace if not exist",
    priority: 10,
};

pub const CREATE_DEPLOYMENT: JobSpec = JobSpec {
    id: "create-deployment",
    title: "Create kubernetes app deployment",
    description: "Create kubernetes app deplyment",
    priority: 20,
};

/// Collaborators shared by the jobs
#[derive(Clone)]
pub struct DeployContext {
    pub config: Arc<DeployConfig>,
    pub secrets: Arc<dyn SecretReader>,
    pub cluster: Arc<dyn ClusterConnector>,
}

impl DeployContext {
    pub fn new(
        config: Arc<DeployConfig>,
        secrets: Arc<dyn SecretReader>,
        cluster: Arc<dyn ClusterConnector>,
    ) -> Self {
        Self {
            config,
            secrets,
            cluster,
        }
    }

    async fn connect(&self) -> Result<Box<dyn vault_deploy_core::ClusterClient>, JobError> {
        let client = self
            .cluster
            .connect(&self.config.staging.kube_conf_file)
            .await
            .map_err(DeployError::from)?;
        Ok(client)
    }
}

pub struct FetchSecretsJob {
    ctx: DeployContext,
}

#[async_trait]
impl Job for FetchSecretsJob {
    fn spec(&self) -> JobSpec {
        FETCH_SECRETS
    }

    async fn run(&self) -> Result<(), JobError> {
        fetch::stage_secrets(self.ctx.secrets.as_ref(), &self.ctx.config).await?;
        Ok(())
    }
}

pub struct CreateNamespaceJob {
    ctx: DeployContext,
}

#[async_trait]
impl Job for CreateNamespaceJob {
    fn spec(&self) -> JobSpec {
        CREATE_NAMESPACE
    }

    async fn run(&self) -> Result<(), JobError> {
        let client = self.ctx.connect().await?;
        namespace::create_namespace(client.as_ref(), &self.ctx.config).await?;
        Ok(())
    }
}

pub struct CreateDeploymentJob {
    ctx: DeployContext,
}

#[async_trait]
impl Job for CreateDeploymentJob {
    fn spec(&self) -> JobSpec {
        CREATE_DEPLOYMENT
    }

    async fn run(&self) -> Result<(), JobError> {
        let client = self.ctx.connect().await?;
        deployment::create_deployment(client.as_ref(), &self.ctx.config).await?;
        Ok(())
    }
}

/// The three jobs in registration order
pub fn standard_jobs(ctx: DeployContext) -> Vec<Box<dyn Job>> {
    vec![
        Box::new(FetchSecretsJob { ctx: ctx.clone() }),
        Box::new(CreateNamespaceJob { ctx: ctx.clone() }),
        Box::new(CreateDeploymentJob { ctx }),
    ]
}

pub fn standard_pipeline(ctx: DeployContext) -> Result<Pipeline, JobError> {
    Pipeline::with_jobs(standard_jobs(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use base64::{Engine as _, engine::general_purpose};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Namespace;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use vault_deploy_core::{ClusterClient, ClusterError};
    use vault_rs::{Secret, VaultError};

    struct FakeVault {
        conf: String,
        version: String,
    }

    #[async_trait]
    impl SecretReader for FakeVault {
        async fn read(&self, path: &str) -> Result<Secret, VaultError> {
            let data = match path {
                "secret/data/kube-conf" => json!({ "data": { "conf": self.conf } }),
                "secret/data/nginx" => json!({ "data": { "version": self.version } }),
                _ => return Err(VaultError::SecretNotFound(path.to_string())),
            };
            Ok(Secret::new(path, data.as_object().unwrap().clone()))
        }
    }

    /// Records what was created and which kubeconfig each connect saw
    #[derive(Default)]
    struct FakeCluster {
        kubeconfigs: Mutex<Vec<String>>,
        namespaces: Arc<Mutex<Vec<String>>>,
        deployments: Arc<Mutex<Vec<(String, Deployment)>>>,
    }

    struct FakeClient {
        namespaces: Arc<Mutex<Vec<String>>>,
        deployments: Arc<Mutex<Vec<(String, Deployment)>>>,
    }

    #[async_trait]
    impl ClusterClient for FakeClient {
        async fn create_namespace(&self, ns: &Namespace) -> Result<(), ClusterError> {
            let name = ns.metadata.name.clone().unwrap_or_default();
            let mut namespaces = self.namespaces.lock().unwrap();
            if namespaces.contains(&name) {
                return Err(ClusterError::AlreadyExists {
                    kind: "namespace".into(),
                    name,
                });
            }
            namespaces.push(name);
            Ok(())
        }

        async fn create_deployment(
            &self,
            namespace: &str,
            deployment: &Deployment,
        ) -> Result<(), ClusterError> {
            self.deployments
                .lock()
                .unwrap()
                .push((namespace.to_string(), deployment.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl ClusterConnector for FakeCluster {
        async fn connect(&self, kubeconfig: &Path) -> Result<Box<dyn ClusterClient>, ClusterError> {
            let yaml = std::fs::read_to_string(kubeconfig).map_err(|source| {
                ClusterError::KubeconfigRead {
                    path: PathBuf::from(kubeconfig),
                    source,
                }
            })?;
            self.kubeconfigs.lock().unwrap().push(yaml);
            Ok(Box::new(FakeClient {
                namespaces: self.namespaces.clone(),
                deployments: self.deployments.clone(),
            }))
        }
    }

    fn context(dir: &Path, version: &str, cluster: Arc<FakeCluster>) -> DeployContext {
        let mut config = DeployConfig::default();
        config.staging.kube_conf_file = dir.join("kube-conf");
        config.staging.app_version_file = dir.join("app-version");

        let vault = FakeVault {
            conf: general_purpose::STANDARD.encode("server: https://localhost:6443\n"),
            version: version.to_string(),
        };
        DeployContext::new(Arc::new(config), Arc::new(vault), cluster)
    }

    #[test]
    fn test_registration_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "1.2.3", Arc::new(FakeCluster::default()));
        let pipeline = standard_pipeline(ctx).unwrap();

        let jobs = pipeline.jobs();
        assert_eq!(jobs, vec![FETCH_SECRETS, CREATE_NAMESPACE, CREATE_DEPLOYMENT]);
        let priorities: Vec<_> = jobs.iter().map(|j| j.priority).collect();
        assert_eq!(priorities, vec![0, 10, 20]);
        assert_eq!(jobs[0].title, "Get secrets from vault");
        assert_eq!(jobs[1].description, "Create kubernetes namespace if not exist");
        assert_eq!(jobs[2].description, "Create kubernetes app deplyment");
    }

    #[tokio::test]
    async fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let mut pipeline = standard_pipeline(context(dir.path(), "1.2.3", cluster.clone())).unwrap();

        let report = pipeline.run_all().await;
        assert!(report.succeeded(), "{:?}", report.failure());

        assert_eq!(
            *cluster.kubeconfigs.lock().unwrap(),
            vec![
                "server: https://host.docker.internal:6443\n".to_string(),
                "server: https://host.docker.internal:6443\n".to_string(),
            ]
        );
        assert_eq!(*cluster.namespaces.lock().unwrap(), vec!["nginx".to_string()]);

        let deployments = cluster.deployments.lock().unwrap();
        assert_eq!(deployments.len(), 1);
        let (namespace, deployment) = &deployments[0];
        assert_eq!(namespace, "nginx");
        let image = deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
            .image
            .clone();
        assert_eq!(image.as_deref(), Some("nginx:1.2.3"));
    }

    #[tokio::test]
    async fn test_namespace_before_fetch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let mut pipeline = standard_pipeline(context(dir.path(), "1.2.3", cluster.clone())).unwrap();

        let err = pipeline.run_job(CREATE_NAMESPACE.id).await.unwrap_err();
        assert!(matches!(err, JobError::OutOfOrder { .. }));
        assert!(cluster.kubeconfigs.lock().unwrap().is_empty());
        assert!(!dir.path().join("kube-conf").exists());
    }

    #[tokio::test]
    async fn test_existing_namespace_fails_run_without_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(FakeCluster::default());
        cluster.namespaces.lock().unwrap().push("nginx".to_string());
        let mut pipeline = standard_pipeline(context(dir.path(), "1.2.3", cluster.clone())).unwrap();

        let report = pipeline.run_all().await;
        let failure = report.failure().unwrap();
        assert_eq!(failure.spec, CREATE_NAMESPACE);
        assert_eq!(
            failure.error.as_deref(),
            Some("Cluster error: namespace 'nginx' already exists")
        );

        // Staged files from the successful fetch stay in place
        assert!(dir.path().join("kube-conf").exists());
        assert_eq!(pipeline.state(CREATE_DEPLOYMENT.id), Some(JobState::Pending));
        assert!(cluster.deployments.lock().unwrap().is_empty());
    }
}
