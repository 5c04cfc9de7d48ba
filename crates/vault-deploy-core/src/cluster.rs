//! Kubernetes client helpers
//!
//! Creates a K8s client from the staged kubeconfig file and wraps the two
//! create calls the workflow needs behind [`ClusterClient`].

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    Client, Config,
    api::{Api, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
};
use std::path::{Path, PathBuf};

/// Error type for K8s operations
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Failed to read kubeconfig {}: {source}", .path.display())]
    KubeconfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigParse(String),
    #[error("Failed to create K8s client: {0}")]
    ClientCreate(String),
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("K8s API error ({code} {reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },
    #[error("K8s transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    /// Classify a kube error for an object of `kind` named `name`
    pub fn from_kube(kind: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
                ClusterError::AlreadyExists {
                    kind: kind.to_string(),
                    name: name.to_string(),
                }
            }
            kube::Error::Api(resp) => ClusterError::Api {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            },
            other => ClusterError::Transport(other.to_string()),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }

    /// Whether the API server was never reached
    pub fn is_transport(&self) -> bool {
        matches!(self, ClusterError::Transport(_))
    }
}

/// Create calls against the target cluster
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<(), ClusterError>;

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), ClusterError>;
}

/// Builds a [`ClusterClient`] from a kubeconfig file
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, kubeconfig: &Path) -> Result<Box<dyn ClusterClient>, ClusterError>;
}

/// Create a Kubernetes client from a kubeconfig file
pub async fn kube_client_from_file(path: &Path) -> Result<Client, ClusterError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ClusterError::KubeconfigRead {
            path: path.to_path_buf(),
            source,
        })?;

    kube_client_from_yaml(&yaml).await
}

/// Create a Kubernetes client from kubeconfig YAML
pub async fn kube_client_from_yaml(yaml: &str) -> Result<Client, ClusterError> {
    let kubeconfig = parse_kubeconfig(yaml)?;

    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| ClusterError::ClientCreate(e.to_string()))?;

    Client::try_from(config).map_err(|e| ClusterError::ClientCreate(e.to_string()))
}

fn parse_kubeconfig(yaml: &str) -> Result<Kubeconfig, ClusterError> {
    serde_yaml::from_str(yaml).map_err(|e| ClusterError::KubeconfigParse(e.to_string()))
}

/// [`ClusterClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<(), ClusterError> {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        let api: Api<Namespace> = Api::all(self.client.clone());

        api.create(&PostParams::default(), namespace)
            .await
            .map_err(|e| ClusterError::from_kube("namespace", &name, e))?;
        Ok(())
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), ClusterError> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        api.create(&PostParams::default(), deployment)
            .await
            .map_err(|e| ClusterError::from_kube("deployment", &name, e))?;
        Ok(())
    }
}

/// [`ClusterConnector`] that reads the kubeconfig from disk on every connect
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeConnector;

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(&self, kubeconfig: &Path) -> Result<Box<dyn ClusterClient>, ClusterError> {
        tracing::debug!("Creating K8s client from {}", kubeconfig.display());
        let client = kube_client_from_file(kubeconfig).await?;
        Ok(Box::new(KubeClusterClient::new(client)))
    }
}
