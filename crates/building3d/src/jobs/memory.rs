use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::jobs::lifecycle;
use crate::jobs::model::{Asset, AssetKind, Job, JobFilter, JobStatus, NewJob, StatusUpdate};
use crate::jobs::store::{JobStore, UpdateOutcome};

/// Process-local store for tests and `B3D_STORE=memory` demos.
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<Vec<Job>>,
    assets: RwLock<Vec<Asset>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_asset(
        &self,
        job_id: Uuid,
        kind: AssetKind,
        r2_path: &str,
        size: i64,
    ) -> Asset {
        let asset = Asset {
            id: Uuid::new_v4(),
            job_id,
            kind,
            r2_path: r2_path.to_string(),
            size,
            checksum: None,
            created_at: Utc::now(),
        };
        self.assets.write().await.push(asset.clone());
        asset
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: NewJob) -> anyhow::Result<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            user_id: job.user_id,
            bbox: job.bbox,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            finished_at: None,
            cost_estimate: None,
            error: None,
        };
        self.jobs.write().await.push(job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(self.jobs.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> anyhow::Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        // insertion order breaks created_at ties, newest first
        let mut out: Vec<Job> = jobs
            .iter()
            .rev()
            .filter(|j| filter.status.map_or(true, |st| j.status == st))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(filter.limit.max(0) as usize);
        Ok(out)
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> anyhow::Result<UpdateOutcome> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(UpdateOutcome::NotFound);
        };

        if !lifecycle::permits(update, job.status) {
            return Ok(UpdateOutcome::Rejected {
                current: job.status,
            });
        }

        lifecycle::apply(job, update);
        Ok(UpdateOutcome::Updated(job.clone()))
    }

    async fn list_assets(&self, job_id: Uuid) -> anyhow::Result<Vec<Asset>> {
        let mut out: Vec<Asset> = self
            .assets
            .read()
            .await
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}
