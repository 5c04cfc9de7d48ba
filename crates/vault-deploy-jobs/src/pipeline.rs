//! Sequential, priority-ordered job runner
//!
//! Jobs share nothing in memory; a later job may depend on files an earlier
//! one wrote, so a job only runs once every lower-priority job succeeded.
//! Nothing is rolled back when a later job fails.

use crate::job::{Job, JobError, JobSpec, JobState};
use chrono::{DateTime, Utc};
use serde::Serialize;

struct Entry {
    job: Box<dyn Job>,
    state: JobState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl Entry {
    fn record(&self) -> JobRecord {
        JobRecord {
            spec: self.job.spec(),
            state: self.state,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

/// Registered jobs in ascending priority order
#[derive(Default)]
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<Box<dyn Job>>) -> Result<Self, JobError> {
        let mut pipeline = Self::new();
        for job in jobs {
            pipeline.register(job)?;
        }
        Ok(pipeline)
    }

    /// Add a job, keeping the list sorted by priority
    pub fn register(&mut self, job: Box<dyn Job>) -> Result<(), JobError> {
        let spec = job.spec();
        for entry in &self.entries {
            let existing = entry.job.spec();
            if existing.id == spec.id {
                return Err(JobError::DuplicateId(spec.id.to_string()));
            }
            if existing.priority == spec.priority {
                return Err(JobError::DuplicatePriority {
                    first: existing.id.to_string(),
                    second: spec.id.to_string(),
                    priority: spec.priority,
                });
            }
        }

        let index = self
            .entries
            .partition_point(|e| e.job.spec().priority < spec.priority);
        self.entries.insert(
            index,
            Entry {
                job,
                state: JobState::Pending,
                started_at: None,
                finished_at: None,
                error: None,
            },
        );
        Ok(())
    }

    /// Registration list in execution order
    pub fn jobs(&self) -> Vec<JobSpec> {
        self.entries.iter().map(|e| e.job.spec()).collect()
    }

    pub fn state(&self, id: &str) -> Option<JobState> {
        self.entries
            .iter()
            .find(|e| e.job.spec().id == id)
            .map(|e| e.state)
    }

    /// Run a single job
    ///
    /// Rejected if any lower-priority job has not succeeded, or if the job
    /// already ran.
    pub async fn run_job(&mut self, id: &str) -> Result<(), JobError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.job.spec().id == id)
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))?;

        if self.entries[index].state != JobState::Pending {
            return Err(JobError::AlreadyRan(id.to_string()));
        }

        if let Some(blocking) = self.entries[..index]
            .iter()
            .find(|e| e.state != JobState::Succeeded)
        {
            return Err(JobError::OutOfOrder {
                job: id.to_string(),
                waiting_on: blocking.job.spec().id.to_string(),
            });
        }

        let entry = &mut self.entries[index];
        let spec = entry.job.spec();
        tracing::info!("Running job '{}' (priority {})", spec.title, spec.priority);

        entry.state = JobState::Running;
        entry.started_at = Some(Utc::now());
        let result = entry.job.run().await;
        entry.finished_at = Some(Utc::now());
        entry.state = match &result {
            Ok(()) => JobState::Succeeded,
            Err(e) => {
                tracing::warn!("Job '{}' failed: {}", spec.title, e);
                entry.error = Some(e.to_string());
                JobState::Failed
            }
        };
        result
    }

    /// Run every pending job in order, stopping at the first failure
    ///
    /// Jobs that already finished through [`Pipeline::run_job`] are not run
    /// again; their earlier outcome is reported. A job that failed earlier
    /// stops the run just like a fresh failure.
    pub async fn run_all(&mut self) -> RunReport {
        let mut records = Vec::with_capacity(self.entries.len());
        let mut failed = false;

        for index in 0..self.entries.len() {
            if failed {
                records.push(JobRecord::skipped(self.entries[index].job.spec()));
                continue;
            }

            if self.entries[index].state == JobState::Pending {
                let id = self.entries[index].job.spec().id;
                // The outcome is kept on the entry
                let _ = self.run_job(id).await;
            } else {
                tracing::debug!(
                    "Job '{}' already {}",
                    self.entries[index].job.spec().title,
                    self.entries[index].state
                );
            }

            let record = self.entries[index].record();
            failed = record.state != JobState::Succeeded;
            records.push(record);
        }

        RunReport { records }
    }
}

/// Outcome of one job within a run
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub spec: JobSpec,
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobRecord {
    fn skipped(spec: JobSpec) -> Self {
        Self {
            spec,
            state: JobState::Pending,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Result of [`Pipeline::run_all`]
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub records: Vec<JobRecord>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.records.iter().all(|r| r.state == JobState::Succeeded)
    }

    /// The record that stopped the run, if any
    pub fn failure(&self) -> Option<&JobRecord> {
        self.records.iter().find(|r| r.state == JobState::Failed)
    }
}
