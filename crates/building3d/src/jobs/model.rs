use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Owner recorded on every job until authentication exists.
pub const PLACEHOLDER_USER_ID: Uuid = Uuid::nil();

/// Maximum number of rows the list endpoint returns.
pub const LIST_LIMIT: i64 = 50;

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BBox {
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Returns `(lng, lat)` of the rectangle's center.
    pub fn centroid(&self) -> (f64, f64) {
        ((self.east + self.west) / 2.0, (self.north + self.south) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// `succeeded` and `failed` carry a `finished_at`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bbox: BBox,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cost_estimate: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Uuid,
    pub bbox: BBox,
}

#[derive(Debug, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub limit: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: LIST_LIMIT,
        }
    }
}

/// Partial update applied by a status transition.
///
/// `finished_at` and `error` only overwrite the stored value when `Some`.
/// `allowed_from`, when set, restricts the update to rows whose current
/// status is listed.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub allowed_from: Option<Vec<JobStatus>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Model,
    Texture,
    Preview,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Preview => "preview",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Model => "glb",
            AssetKind::Texture | AssetKind::Preview => "png",
        }
    }
}

impl FromStr for AssetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(AssetKind::Model),
            "texture" => Ok(AssetKind::Texture),
            "preview" => Ok(AssetKind::Preview),
            other => Err(anyhow::anyhow!("unknown asset type {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub job_id: Uuid,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub r2_path: String,
    pub size: i64,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Schema shapes for tables no handler touches yet.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_only_known_values() {
        for st in JobStatus::ALL {
            assert_eq!(st.as_str().parse::<JobStatus>().unwrap(), st);
        }
        assert_eq!(
            "done".parse::<JobStatus>(),
            Err(ValidationError::InvalidStatus("done".into()))
        );
        assert!("Pending".parse::<JobStatus>().is_err());
    }

    #[test]
    fn centroid_is_midpoint() {
        let bbox = BBox {
            north: 35.694,
            south: 35.690,
            east: 139.696,
            west: 139.690,
        };
        let (lng, lat) = bbox.centroid();
        assert!((lng - 139.693).abs() < 1e-9);
        assert!((lat - 35.692).abs() < 1e-9);
    }

    #[test]
    fn job_serializes_with_lowercase_status() {
        let job = Job {
            id: Uuid::new_v4(),
            user_id: PLACEHOLDER_USER_ID,
            bbox: BBox {
                north: 1.0,
                south: 0.995,
                east: 1.0,
                west: 0.995,
            },
            status: JobStatus::Succeeded,
            created_at: Utc::now(),
            finished_at: None,
            cost_estimate: None,
            error: None,
        };
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["status"], "succeeded");
        assert_eq!(v["user_id"], "00000000-0000-0000-0000-000000000000");
        assert!(v["finished_at"].is_null());
    }
}
