//! Error types for vault-deploy-core

use crate::cluster::ClusterError;
use std::path::PathBuf;
use thiserror::Error;
use vault_rs::VaultError;

/// Errors raised while staging secrets or provisioning cluster objects
#[derive(Error, Debug)]
pub enum DeployError {
    /// Secrets store unreachable, token rejected, or secret malformed
    #[error("Secrets store error: {0}")]
    Vault(#[from] VaultError),

    /// Kubeconfig field is not valid base64
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Scratch file could not be written or read
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Version file cannot be embedded in an image reference
    #[error("Version is not valid UTF-8: {0}")]
    InvalidVersion(#[from] std::string::FromUtf8Error),

    /// Cluster client construction or API failure
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    ConfigInvalid(String),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }
}
