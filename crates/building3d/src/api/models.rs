// crates/building3d/src/api/models.rs
use serde::{Deserialize, Serialize};

use crate::jobs::bbox::BBoxInput;
use crate::jobs::model::Asset;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateJobRequest {
    pub bbox: Option<BBoxInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    /// Kept as a string so an unknown value maps to `Invalid status`
    /// instead of a generic body error.
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub object_url: Option<String>,
}
