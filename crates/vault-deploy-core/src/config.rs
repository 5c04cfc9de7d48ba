//! Deployment configuration
//!
//! Every field has a default, so an empty or missing config file deploys
//! `nginx` using a development Vault on localhost.

use crate::error::DeployError;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use vault_rs::SecretShape;

/// Top-level configuration for one deployment workflow
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub vault: VaultSettings,
    pub staging: StagingSettings,
    pub app: AppSettings,
}

/// Where the secrets live and how to authenticate
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Vault server address
    pub address: String,
    /// Static Vault token
    #[serde(serialize_with = "redact", deserialize_with = "secret_string")]
    pub token: SecretString,
    /// Secret holding the base64 kubeconfig under `conf`
    pub kube_conf_path: String,
    /// Secret holding the image tag under `version`
    pub app_version_path: String,
    /// Which KV response shape to read fields from
    pub shape: SecretShape,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: "http://localhost:8200".to_string(),
            token: SecretString::from("root-token".to_string()),
            kube_conf_path: "secret/data/kube-conf".to_string(),
            app_version_path: "secret/data/nginx".to_string(),
            shape: SecretShape::default(),
        }
    }
}

/// Scratch files handed from the fetch job to the provisioning jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSettings {
    pub kube_conf_file: PathBuf,
    pub app_version_file: PathBuf,
    /// Host name in the fetched kubeconfig that is replaced (first occurrence only)
    pub loopback_host: String,
    /// Replacement that resolves to the container host from inside Docker
    pub docker_host: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            kube_conf_file: PathBuf::from("/tmp/kube-conf"),
            app_version_file: PathBuf::from("/tmp/app-version"),
            loopback_host: "localhost".to_string(),
            docker_host: "host.docker.internal".to_string(),
        }
    }
}

/// The application being deployed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub replicas: i32,
    /// Target namespace; the application name when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub container_port: i32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "nginx".to_string(),
            replicas: 2,
            namespace: None,
            container_port: 80,
        }
    }
}

impl AppSettings {
    /// Namespace the application is created in
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }
}

impl DeployConfig {
    /// Default config file location: `<config_dir>/vault-deploy/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("vault-deploy").join("config.yaml"))
    }

    /// Load from an explicit path, else the default path if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DeployError> {
        tracing::debug!("Loading config from {}", path.display());
        let yaml = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DeployError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.vault.address.trim().is_empty() {
            return Err(DeployError::ConfigInvalid("vault.address is empty".into()));
        }
        if self.app.name.trim().is_empty() {
            return Err(DeployError::ConfigInvalid("app.name is empty".into()));
        }
        if self.app.namespace().trim().is_empty() {
            return Err(DeployError::ConfigInvalid("app.namespace is empty".into()));
        }
        if self.app.replicas < 0 {
            return Err(DeployError::ConfigInvalid(format!(
                "app.replicas must not be negative, got {}",
                self.app.replicas
            )));
        }
        if self.staging.loopback_host.is_empty() {
            return Err(DeployError::ConfigInvalid(
                "staging.loopback_host is empty".into(),
            ));
        }
        Ok(())
    }

    /// YAML rendering with the token redacted
    pub fn to_redacted_yaml(&self) -> Result<String, DeployError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn redact<S: Serializer>(_: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("[REDACTED]")
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
