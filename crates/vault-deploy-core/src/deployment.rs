//! Deployment provisioning
//!
//! The image tag is taken byte-for-byte from the staged version file, so a
//! trailing newline in the secret ends up in the tag.

use crate::cluster::ClusterClient;
use crate::config::{AppSettings, DeployConfig};
use crate::error::DeployError;
use crate::stage;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

pub const PULL_ALWAYS: &str = "Always";

/// `<app>:<version>` with the version bytes used verbatim
pub fn image_reference(app: &str, version: &[u8]) -> Result<String, DeployError> {
    let version = String::from_utf8(version.to_vec())?;
    Ok(format!("{}:{}", app, version))
}

/// `{app: <name>}`, used for metadata and the selector
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), name.to_string())])
}

/// Build the Deployment for `app` running image version `version`
pub fn deployment_descriptor(app: &AppSettings, version: &[u8]) -> Result<Deployment, DeployError> {
    let labels = app_labels(&app.name);
    let metadata = ObjectMeta {
        name: Some(app.name.clone()),
        labels: Some(labels.clone()),
        ..Default::default()
    };

    let container = Container {
        name: app.name.clone(),
        image: Some(image_reference(&app.name, version)?),
        image_pull_policy: Some(PULL_ALWAYS.to_string()),
        ports: Some(vec![ContainerPort {
            container_port: app.container_port,
            ..Default::default()
        }]),
        ..Default::default()
    };

    Ok(Deployment {
        metadata: metadata.clone(),
        spec: Some(DeploymentSpec {
            replicas: Some(app.replicas),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(metadata),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Read the staged version and create the Deployment in the target namespace
pub async fn create_deployment(
    client: &dyn ClusterClient,
    config: &DeployConfig,
) -> Result<(), DeployError> {
    let version = stage::read_file(&config.staging.app_version_file)?;
    let deployment = deployment_descriptor(&config.app, &version)?;
    let namespace = config.app.namespace();

    tracing::info!(
        "Creating deployment {} in namespace {} with {} replicas",
        config.app.name,
        namespace,
        config.app.replicas
    );
    client.create_deployment(namespace, &deployment).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterError;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::Namespace;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCluster {
        created: Mutex<Vec<(String, Deployment)>>,
    }

    #[async_trait]
    impl ClusterClient for RecordingCluster {
        async fn create_namespace(&self, _namespace: &Namespace) -> Result<(), ClusterError> {
            Ok(())
        }

        async fn create_deployment(
            &self,
            namespace: &str,
            deployment: &Deployment,
        ) -> Result<(), ClusterError> {
            self.created
                .lock()
                .unwrap()
                .push((namespace.to_string(), deployment.clone()));
            Ok(())
        }
    }

    fn container(d: &Deployment) -> &Container {
        &d.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn test_image_reference() {
        assert_eq!(image_reference("nginx", b"1.2.3").unwrap(), "nginx:1.2.3");
    }

    #[test]
    fn test_image_reference_keeps_trailing_newline() {
        assert_eq!(image_reference("nginx", b"1.2.3\n").unwrap(), "nginx:1.2.3\n");
    }

    #[test]
    fn test_image_reference_rejects_non_utf8() {
        assert!(matches!(
            image_reference("nginx", &[0xff, 0xfe]),
            Err(DeployError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_descriptor() {
        let d = deployment_descriptor(&AppSettings::default(), b"1.2.3").unwrap();
        let labels = app_labels("nginx");

        assert_eq!(d.metadata.name.as_deref(), Some("nginx"));
        assert_eq!(d.metadata.labels.as_ref(), Some(&labels));

        let spec = d.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.selector.match_labels.as_ref(), Some(&labels));
        assert_eq!(spec.template.metadata.as_ref(), Some(&d.metadata));

        let c = container(&d);
        assert_eq!(c.name, "nginx");
        assert_eq!(c.image.as_deref(), Some("nginx:1.2.3"));
        assert_eq!(c.image_pull_policy.as_deref(), Some("Always"));
        let ports = c.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 80);
    }

    #[test]
    fn test_descriptor_uses_app_settings() {
        let app = AppSettings {
            name: "web".to_string(),
            replicas: 5,
            namespace: None,
            container_port: 8080,
        };
        let d = deployment_descriptor(&app, b"v2").unwrap();

        assert_eq!(d.spec.as_ref().unwrap().replicas, Some(5));
        let c = container(&d);
        assert_eq!(c.image.as_deref(), Some("web:v2"));
        assert_eq!(c.ports.as_ref().unwrap()[0].container_port, 8080);
    }

    #[tokio::test]
    async fn test_create_from_staged_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::default();
        config.staging.app_version_file = dir.path().join("app-version");
        std::fs::write(&config.staging.app_version_file, "1.2.3\n").unwrap();

        let cluster = RecordingCluster::default();
        create_deployment(&cluster, &config).await.unwrap();

        let created = cluster.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let (namespace, deployment) = &created[0];
        assert_eq!(namespace, "nginx");
        assert_eq!(container(deployment).image.as_deref(), Some("nginx:1.2.3\n"));
    }

    #[tokio::test]
    async fn test_create_targets_configured_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::default();
        config.app.namespace = Some("apps".to_string());
        config.staging.app_version_file = dir.path().join("app-version");
        std::fs::write(&config.staging.app_version_file, "1.2.3").unwrap();

        let cluster = RecordingCluster::default();
        create_deployment(&cluster, &config).await.unwrap();
        assert_eq!(cluster.created.lock().unwrap()[0].0, "apps");
    }

    #[tokio::test]
    async fn test_missing_version_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::default();
        config.staging.app_version_file = dir.path().join("app-version");

        let cluster = RecordingCluster::default();
        let err = create_deployment(&cluster, &config).await.unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
        assert!(cluster.created.lock().unwrap().is_empty());
    }
}
