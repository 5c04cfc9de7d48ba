//! vault-deploy-jobs: prioritized deployment jobs and their runner
//!
//! Jobs are registered with a title, description, and priority, and run
//! strictly one after another in ascending priority.

pub mod deploy;
pub mod job;
pub mod pipeline;

pub use deploy::{DeployContext, standard_jobs, standard_pipeline};
pub use job::{Job, JobError, JobSpec, JobState};
pub use pipeline::{JobRecord, Pipeline, RunReport};
