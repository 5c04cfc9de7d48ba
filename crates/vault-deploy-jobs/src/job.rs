//! Job metadata, state, and errors

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use vault_deploy_core::DeployError;

/// Registration metadata for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    /// Stable identifier
    pub id: &'static str,
    /// Human-readable title
    pub title: &'static str,
    pub description: &'static str,
    /// Lower runs first
    pub priority: i32,
}

/// Execution state of a registered job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            JobState::Pending => "○",
            JobState::Running => "◐",
            JobState::Succeeded => "●",
            JobState::Failed => "✗",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "Pending"),
            JobState::Running => write!(f, "Running"),
            JobState::Succeeded => write!(f, "Succeeded"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

/// Errors from running or registering jobs
#[derive(Error, Debug)]
pub enum JobError {
    /// The job body failed
    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// A lower-priority job has not succeeded yet
    #[error("Job '{job}' cannot run before '{waiting_on}' has succeeded")]
    OutOfOrder { job: String, waiting_on: String },

    #[error("Job '{0}' has already run")]
    AlreadyRan(String),

    #[error("Jobs '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        first: String,
        second: String,
        priority: i32,
    },

    #[error("Duplicate job id: {0}")]
    DuplicateId(String),
}

/// A zero-argument, error-returning unit of work
#[async_trait]
pub trait Job: Send + Sync {
    fn spec(&self) -> JobSpec;

    async fn run(&self) -> Result<(), JobError>;
}
