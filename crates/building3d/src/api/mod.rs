use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::Html;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use crate::api::models::{AssetView, CreateJobRequest, ListJobsQuery, UpdateStatusRequest};
use crate::error::{JobError, ValidationError};
use crate::jobs::model::Job;
use crate::jobs::JobService;
use crate::storage::BlobStoreConfig;

pub mod models;
pub mod page;

pub use page::MapPage;

#[derive(Clone)]
pub struct ApiState {
    pub jobs: JobService,
    pub blob: Option<BlobStoreConfig>,
    page_html: Arc<str>,
}

impl ApiState {
    pub fn new(jobs: JobService, blob: Option<BlobStoreConfig>, page: &MapPage) -> Self {
        Self {
            jobs,
            blob,
            page_html: page.render().into(),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(map_index))
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/status", patch(update_job_status))
        .route("/jobs/:id/assets", get(list_job_assets))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn map_index(State(state): State<ApiState>) -> Html<String> {
    Html(state.page_html.to_string())
}

fn body_err(rejection: JsonRejection) -> JobError {
    ValidationError::MalformedBody(rejection.body_text()).into()
}

pub async fn create_job(
    State(state): State<ApiState>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), JobError> {
    let Json(body) = body.map_err(body_err)?;
    let bbox = body.bbox.ok_or(ValidationError::MissingField("bbox"))?;

    let job = state.jobs.create_job(&bbox).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(
    State(state): State<ApiState>,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> Result<Json<Vec<Job>>, JobError> {
    let Query(q) = query.map_err(|r| ValidationError::MalformedBody(r.body_text()))?;
    let jobs = state.jobs.list_jobs(q.status.as_deref()).await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, JobError> {
    Ok(Json(state.jobs.get_job(&id).await?))
}

pub async fn update_job_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Job>, JobError> {
    let Json(body) = body.map_err(body_err)?;
    let job = state
        .jobs
        .update_status(&id, body.status.as_deref(), body.error.as_deref())
        .await?;
    Ok(Json(job))
}

pub async fn list_job_assets(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AssetView>>, JobError> {
    let assets = state.jobs.list_assets(&id).await?;

    Ok(Json(
        assets
            .into_iter()
            .map(|asset| AssetView {
                object_url: state.blob.as_ref().map(|b| b.object_url(&asset.r2_path)),
                asset,
            })
            .collect(),
    ))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
