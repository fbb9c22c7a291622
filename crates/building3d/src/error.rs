use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::jobs::model::JobStatus;

/// Rejections raised before anything reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid bbox format: missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid bbox format: `{0}` is not a finite number")]
    NonFinite(&'static str),

    #[error("Bounding box too large. Maximum 1km x 1km allowed.")]
    TooLarge { lat_span: f64, lng_span: f64 },

    #[error("Invalid bbox: north must exceed south and east must exceed west")]
    Inverted,

    #[error("Invalid status")]
    InvalidStatus(String),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::NonFinite(_) => "invalid_bbox",
            ValidationError::TooLarge { .. } => "bbox_too_large",
            ValidationError::Inverted => "bbox_inverted",
            ValidationError::InvalidStatus(_) => "invalid_status",
            ValidationError::MalformedBody(_) => "malformed_body",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found")]
    NotFound(String),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl JobError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::Validation(_) => StatusCode::BAD_REQUEST,
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::IllegalTransition { .. } => StatusCode::CONFLICT,
            JobError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            JobError::Validation(e) => e.code(),
            JobError::NotFound(_) => "not_found",
            JobError::IllegalTransition { .. } => "illegal_transition",
            JobError::Store(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let message = match &self {
            JobError::Store(e) => {
                error!(error = %format!("{e:#}"), "store operation failed");
                // store details stay in the log
                "Internal server error".to_string()
            }
            JobError::NotFound(id) => {
                warn!(job_id = %id, "job not found");
                self.to_string()
            }
            other => {
                warn!(code = other.code(), "rejected request: {other}");
                other.to_string()
            }
        };

        (
            self.status_code(),
            Json(ErrorBody {
                error: message,
                code: self.code(),
            }),
        )
            .into_response()
    }
}
