use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{JobError, ValidationError};
use crate::jobs::bbox::{validate_bbox, BBoxInput, BBoxRules};
use crate::jobs::lifecycle::{plan_transition, LifecycleRules};
use crate::jobs::model::{Asset, Job, JobFilter, JobStatus, NewJob, PLACEHOLDER_USER_ID};
use crate::jobs::store::{JobStore, UpdateOutcome};

/// Job lifecycle operations on top of a [`JobStore`].
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    bbox_rules: BBoxRules,
    lifecycle: LifecycleRules,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, bbox_rules: BBoxRules, lifecycle: LifecycleRules) -> Self {
        Self {
            store,
            bbox_rules,
            lifecycle,
        }
    }

    pub fn bbox_rules(&self) -> &BBoxRules {
        &self.bbox_rules
    }

    pub async fn create_job(&self, bbox: &BBoxInput) -> Result<Job, JobError> {
        let bbox = validate_bbox(bbox, &self.bbox_rules)?;

        let job = self
            .store
            .insert_job(NewJob {
                user_id: PLACEHOLDER_USER_ID,
                bbox,
            })
            .await?;

        info!(
            job_id = %job.id,
            north = bbox.north,
            south = bbox.south,
            east = bbox.east,
            west = bbox.west,
            "job created"
        );
        Ok(job)
    }

    /// `status` of `None` or `""` lists every status.
    pub async fn list_jobs(&self, status: Option<&str>) -> Result<Vec<Job>, JobError> {
        let status = match status {
            Some(s) if !s.is_empty() => Some(s.parse::<JobStatus>()?),
            _ => None,
        };

        let jobs = self
            .store
            .list_jobs(&JobFilter {
                status,
                ..JobFilter::default()
            })
            .await?;
        Ok(jobs)
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, JobError> {
        let job_id = parse_job_id(id)?;
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: Option<&str>,
        error: Option<&str>,
    ) -> Result<Job, JobError> {
        let to = status
            .ok_or_else(|| ValidationError::InvalidStatus(String::new()))?
            .parse::<JobStatus>()?;
        let job_id = parse_job_id(id)?;

        let update = plan_transition(to, error, Utc::now(), &self.lifecycle);

        match self.store.update_status(job_id, &update).await? {
            UpdateOutcome::Updated(job) => {
                info!(job_id = %job.id, status = %job.status, "job status updated");
                Ok(job)
            }
            UpdateOutcome::NotFound => Err(JobError::NotFound(id.to_string())),
            UpdateOutcome::Rejected { current } => {
                Err(JobError::IllegalTransition { from: current, to })
            }
        }
    }

    pub async fn list_assets(&self, id: &str) -> Result<Vec<Asset>, JobError> {
        let job = self.get_job(id).await?;
        Ok(self.store.list_assets(job.id).await?)
    }
}

// ids are opaque to callers; one that cannot be a uuid names no job
fn parse_job_id(id: &str) -> Result<Uuid, JobError> {
    Uuid::parse_str(id).map_err(|_| JobError::NotFound(id.to_string()))
}
