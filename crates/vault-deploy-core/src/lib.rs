//! vault-deploy-core: secret staging and cluster provisioning
//!
//! Each step reads its inputs from [`DeployConfig`] and the scratch files
//! written by earlier steps; nothing is shared in memory between steps.

pub mod cluster;
pub mod config;
pub mod deployment;
pub mod error;
pub mod fetch;
pub mod namespace;
pub mod stage;

pub use cluster::{ClusterClient, ClusterConnector, ClusterError, KubeConnector};
pub use config::DeployConfig;
pub use error::DeployError;
