use async_trait::async_trait;
use uuid::Uuid;

use crate::jobs::model::{Asset, Job, JobFilter, JobStatus, NewJob, StatusUpdate};

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Job),
    NotFound,
    /// The row exists but its status is not in `allowed_from`.
    Rejected { current: JobStatus },
}

/// Record store behind the job endpoints. Every write returns the full row.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: NewJob) -> anyhow::Result<Job>;

    async fn get_job(&self, id: Uuid) -> anyhow::Result<Option<Job>>;

    /// Newest `created_at` first, later inserts first on a tie, at most
    /// `filter.limit` rows.
    async fn list_jobs(&self, filter: &JobFilter) -> anyhow::Result<Vec<Job>>;

    async fn update_status(&self, id: Uuid, update: &StatusUpdate)
        -> anyhow::Result<UpdateOutcome>;

    async fn list_assets(&self, job_id: Uuid) -> anyhow::Result<Vec<Asset>>;
}
