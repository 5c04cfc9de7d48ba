//! Namespace provisioning

use crate::cluster::ClusterClient;
use crate::config::DeployConfig;
use crate::error::DeployError;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub fn namespace_descriptor(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Create the application's namespace
///
/// Not idempotent: an existing namespace surfaces as
/// [`ClusterError::AlreadyExists`](crate::cluster::ClusterError::AlreadyExists).
pub async fn create_namespace(
    client: &dyn ClusterClient,
    config: &DeployConfig,
) -> Result<(), DeployError> {
    let name = config.app.namespace();
    tracing::info!("Creating namespace {}", name);

    client.create_namespace(&namespace_descriptor(name)).await?;
    Ok(())
}
