//! Fetch the kubeconfig and image version from Vault and stage them locally

use crate::config::{DeployConfig, VaultSettings};
use crate::error::DeployError;
use crate::stage;
use base64::{Engine as _, engine::general_purpose};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use vault_rs::{SecretReader, VaultClient};

/// Field holding the base64 kubeconfig
pub const CONF_FIELD: &str = "conf";
/// Field holding the image tag
pub const VERSION_FIELD: &str = "version";

/// Values read from the secrets store for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Decoded kubeconfig with the loopback host replaced
    pub kube_config: Vec<u8>,
    pub version: String,
}

/// Paths written by [`stage_secrets`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFiles {
    pub kube_conf_file: PathBuf,
    pub app_version_file: PathBuf,
}

/// Create a Vault client from settings
pub fn connect(settings: &VaultSettings) -> Result<VaultClient, DeployError> {
    let token = SecretString::from(settings.token.expose_secret().to_string());
    Ok(VaultClient::new(&settings.address, token)?)
}

/// Read and decode the kubeconfig secret
pub async fn fetch_kube_config(
    reader: &dyn SecretReader,
    config: &DeployConfig,
) -> Result<Vec<u8>, DeployError> {
    let secret = reader.read(&config.vault.kube_conf_path).await?;
    let encoded = secret.string_field(config.vault.shape, CONF_FIELD)?;

    // Tolerate line-wrapped base64
    let encoded: String = encoded.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let decoded = general_purpose::STANDARD.decode(encoded)?;

    Ok(stage::replace_first(
        &decoded,
        config.staging.loopback_host.as_bytes(),
        config.staging.docker_host.as_bytes(),
    ))
}

/// Read the image version secret as-is
pub async fn fetch_version(
    reader: &dyn SecretReader,
    config: &DeployConfig,
) -> Result<String, DeployError> {
    let secret = reader.read(&config.vault.app_version_path).await?;
    Ok(secret
        .string_field(config.vault.shape, VERSION_FIELD)?
        .to_string())
}

/// Read both secrets without touching the filesystem
///
/// Read-only counterpart of [`stage_secrets`], used to verify Vault access
/// and secret contents before a run.
pub async fn fetch_secrets(
    reader: &dyn SecretReader,
    config: &DeployConfig,
) -> Result<SecretRecord, DeployError> {
    let kube_config = fetch_kube_config(reader, config).await?;
    let version = fetch_version(reader, config).await?;
    Ok(SecretRecord {
        kube_config,
        version,
    })
}

/// Fetch both secrets and write them to the staging files
///
/// The kubeconfig is written before the version is read, so a version
/// failure leaves a fresh kubeconfig behind. A decode failure writes nothing.
pub async fn stage_secrets(
    reader: &dyn SecretReader,
    config: &DeployConfig,
) -> Result<StagedFiles, DeployError> {
    let staging = &config.staging;

    let kube_config = fetch_kube_config(reader, config).await?;
    stage::write_file(&staging.kube_conf_file, &kube_config)?;
    tracing::info!("Staged kubeconfig at {}", staging.kube_conf_file.display());

    let version = fetch_version(reader, config).await?;
    stage::write_file(&staging.app_version_file, version.as_bytes())?;
    tracing::info!(
        "Staged app version {:?} at {}",
        version,
        staging.app_version_file.display()
    );

    Ok(StagedFiles {
        kube_conf_file: staging.kube_conf_file.clone(),
        app_version_file: staging.app_version_file.clone(),
    })
}
