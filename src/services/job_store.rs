use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::job::{JobStatus, SetJob};

/// In-memory registry of identification jobs.
///
/// Each record is an immutable `Arc<SetJob>`. Writers clone the current
/// record, modify the clone and swap it in under the write lock, so a reader
/// holding a snapshot never sees a half-applied update. Records live for the
/// lifetime of the process.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Arc<SetJob>>>,
}

/// Number of jobs per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `queued` job and return its snapshot.
    pub fn create(&self, url: String, segment_duration: u64) -> Arc<SetJob> {
        let mut jobs = self.jobs.write();
        let mut job = SetJob::new(url, segment_duration);
        while jobs.contains_key(&job.id) {
            job.id = Uuid::new_v4();
        }
        let job = Arc::new(job);
        jobs.insert(job.id, Arc::clone(&job));
        job
    }

    /// Current snapshot of a job.
    pub fn get(&self, id: Uuid) -> Result<Arc<SetJob>, JobStoreError> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))
    }

    /// Snapshot lookup by the id string a client sent.
    ///
    /// Malformed ids are reported as unknown, not as a separate error.
    pub fn lookup(&self, raw_id: &str) -> Result<Arc<SetJob>, JobStoreError> {
        let id = Uuid::parse_str(raw_id.trim())
            .map_err(|_| JobStoreError::NotFound(raw_id.to_string()))?;
        self.get(id)
    }

    /// Apply `mutate` to a copy of the record and publish the copy.
    ///
    /// Terminal jobs are frozen; the status itself may only change through
    /// [`JobStore::transition`].
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Result<Arc<SetJob>, JobStoreError>
    where
        F: FnOnce(&mut SetJob),
    {
        let mut jobs = self.jobs.write();
        let current = jobs
            .get(&id)
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if current.status.is_terminal() {
            return Err(JobStoreError::Finished(id, current.status));
        }

        let mut next = SetJob::clone(current);
        mutate(&mut next);
        next.status = current.status;
        next.updated_at = Utc::now();

        let next = Arc::new(next);
        jobs.insert(id, Arc::clone(&next));
        Ok(next)
    }

    /// Move a job to `status`, replacing its message and applying `mutate`
    /// in the same swap.
    pub fn transition<F>(
        &self,
        id: Uuid,
        status: JobStatus,
        message: impl Into<String>,
        mutate: F,
    ) -> Result<Arc<SetJob>, JobStoreError>
    where
        F: FnOnce(&mut SetJob),
    {
        let mut jobs = self.jobs.write();
        let current = jobs
            .get(&id)
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: current.status,
                to: status,
            });
        }

        let mut next = SetJob::clone(current);
        mutate(&mut next);
        next.status = status;
        next.message = message.into();
        next.updated_at = Utc::now();

        let next = Arc::new(next);
        jobs.insert(id, Arc::clone(&next));
        Ok(next)
    }

    pub fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read();
        let mut counts = JobCounts {
            total: jobs.len(),
            ..JobCounts::default()
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Error => counts.failed += 1,
                _ => counts.active += 1,
            }
        }
        counts
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {0} already finished with status {1}")]
    Finished(Uuid, JobStatus),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}
