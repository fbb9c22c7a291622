// crates/building3d/src/jobs/repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::jobs::model::{
    Asset, AssetKind, BBox, Job, JobFilter, JobStatus, NewJob, StatusUpdate,
};
use crate::jobs::store::{JobStore, UpdateOutcome};

// `SELECT *` also returns `seq`; it only orders rows and is not mapped.
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    user_id: Uuid,
    bbox: Json<BBox>,
    status: String,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    cost_estimate: Option<f64>,
    error: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> anyhow::Result<Self> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|_| anyhow::anyhow!("job {} has unknown status {:?}", row.id, row.status))?;

        Ok(Job {
            id: row.id,
            user_id: row.user_id,
            bbox: row.bbox.0,
            status,
            created_at: row.created_at,
            finished_at: row.finished_at,
            cost_estimate: row.cost_estimate,
            error: row.error,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: Uuid,
    job_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    r2_path: String,
    size: i64,
    checksum: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for Asset {
    type Error = anyhow::Error;

    fn try_from(row: AssetRow) -> anyhow::Result<Self> {
        Ok(Asset {
            id: row.id,
            job_id: row.job_id,
            kind: row.kind.parse()?,
            r2_path: row.r2_path,
            size: row.size,
            checksum: row.checksum,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed job store.
#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
}

impl JobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Asset rows are written by the processing side; this exists for seeding.
    pub async fn insert_asset(
        &self,
        job_id: Uuid,
        kind: AssetKind,
        r2_path: &str,
        size: i64,
    ) -> anyhow::Result<Asset> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            INSERT INTO assets (job_id, type, r2_path, size)
            VALUES ($1, $2, $3, $4)
            RETURNING id, job_id, type, r2_path, size, checksum, created_at
            "#,
        )
        .bind(job_id)
        .bind(kind.as_str())
        .bind(r2_path)
        .bind(size)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl JobStore for JobsRepo {
    async fn insert_job(&self, job: NewJob) -> anyhow::Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (user_id, bbox, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job.user_id)
        .bind(Json(job.bbox))
        .bind(JobStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_job(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> anyhow::Result<Vec<Job>> {
        let rows = match filter.status {
            Some(status) => {
                sqlx::query_as::<_, JobRow>(
                    r#"
                    SELECT *
                    FROM jobs
                    WHERE status = $1
                    ORDER BY created_at DESC, seq DESC
                    LIMIT $2
                    "#,
                )
                .bind(status.as_str())
                .bind(filter.limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobRow>(
                    r#"
                    SELECT *
                    FROM jobs
                    ORDER BY created_at DESC, seq DESC
                    LIMIT $1
                    "#,
                )
                .bind(filter.limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> anyhow::Result<UpdateOutcome> {
        let allowed_from: Option<Vec<String>> = update
            .allowed_from
            .as_ref()
            .map(|v| v.iter().map(|s| s.as_str().to_string()).collect());

        // single statement: the guard and the write see the same row version
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = $2,
                finished_at = COALESCE($3, finished_at),
                error = COALESCE($4, error)
            WHERE id = $1
              AND ($5::text[] IS NULL OR status = ANY($5))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.finished_at)
        .bind(update.error.as_deref())
        .bind(allowed_from)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(UpdateOutcome::Updated(row.try_into()?));
        }

        Ok(match self.get_job(id).await? {
            Some(job) => UpdateOutcome::Rejected {
                current: job.status,
            },
            None => UpdateOutcome::NotFound,
        })
    }

    async fn list_assets(&self, job_id: Uuid) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT id, job_id, type, r2_path, size, checksum, created_at
            FROM assets
            WHERE job_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Asset::try_from).collect()
    }
}
