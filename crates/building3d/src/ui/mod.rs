//! Map page state: area selection and the job list mirror.
//!
//! The browser script in [`crate::api::page`] drives the same transitions;
//! this model keeps them testable.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::jobs::bbox::{validate_bbox, BBoxInput, BBoxRules};
use crate::jobs::model::{BBox, Job, JobStatus};

pub const SATELLITE_STYLE: &str = "mapbox://styles/mapbox/satellite-v9";

/// Tokyo.
pub const DEFAULT_CENTER: LngLat = LngLat {
    lng: 139.6917,
    lat: 35.6895,
};

pub const DEFAULT_ZOOM: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    Idle,
    /// `anchor` is set once the pointer goes down.
    Selecting { anchor: Option<LngLat> },
    Selected(BBox),
    Submitting(BBox),
}

/// Messages surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    SelectionTooLarge,
    /// Zero-area box from a click without a drag, when inverted boxes are refused.
    EmptySelection,
    JobCreated(Uuid),
    SubmitFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub job_id: Uuid,
    pub lng: f64,
    pub lat: f64,
    pub label: String,
}

/// One browsing session. The job list is a display copy that only
/// [`MapSession::replace_jobs`] brings back in line with the store.
#[derive(Debug, Clone)]
pub struct MapSession {
    state: SelectionState,
    jobs: Vec<Job>,
    rules: BBoxRules,
}

impl MapSession {
    pub fn new(rules: BBoxRules) -> Self {
        Self {
            state: SelectionState::Idle,
            jobs: Vec::new(),
            rules,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn selected_bbox(&self) -> Option<BBox> {
        match self.state {
            SelectionState::Selected(b) | SelectionState::Submitting(b) => Some(b),
            _ => None,
        }
    }

    /// Starting over drops any previous selection. Ignored while selecting
    /// or submitting.
    pub fn start_selection(&mut self) -> bool {
        match self.state {
            SelectionState::Idle | SelectionState::Selected(_) => {
                self.state = SelectionState::Selecting { anchor: None };
                true
            }
            _ => false,
        }
    }

    pub fn pointer_down(&mut self, at: LngLat) {
        if let SelectionState::Selecting { anchor } = &mut self.state {
            *anchor = Some(at);
        }
    }

    /// Closes the drag. `None` when no drag was in progress. A rejected
    /// rectangle is discarded and the session returns to idle.
    pub fn pointer_up(&mut self, at: LngLat) -> Option<Result<BBox, Notice>> {
        let SelectionState::Selecting {
            anchor: Some(start),
        } = self.state
        else {
            return None;
        };

        let bbox = corners_to_bbox(start, at);
        Some(match validate_bbox(&BBoxInput::from(bbox), &self.rules) {
            Ok(bbox) => {
                self.state = SelectionState::Selected(bbox);
                Ok(bbox)
            }
            Err(err) => {
                self.state = SelectionState::Idle;
                Err(match err {
                    ValidationError::Inverted => Notice::EmptySelection,
                    _ => Notice::SelectionTooLarge,
                })
            }
        })
    }

    /// Moves a selection into submission and hands back the box to send.
    pub fn begin_submit(&mut self) -> Option<BBox> {
        match self.state {
            SelectionState::Selected(bbox) => {
                self.state = SelectionState::Submitting(bbox);
                Some(bbox)
            }
            _ => None,
        }
    }

    pub fn submit_succeeded(&mut self, job: Job) -> Notice {
        let id = job.id;
        self.jobs.insert(0, job);
        self.state = SelectionState::Idle;
        Notice::JobCreated(id)
    }

    /// The selection is kept so the user can retry.
    pub fn submit_failed(&mut self, reason: impl Into<String>) -> Notice {
        if let SelectionState::Submitting(bbox) = self.state {
            self.state = SelectionState::Selected(bbox);
        }
        Notice::SubmitFailed(reason.into())
    }

    pub fn replace_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
    }

    pub fn markers(&self) -> Vec<Marker> {
        markers_for(&self.jobs)
    }
}

/// Normalises two drag corners into a rectangle with `north >= south`
/// and `east >= west`.
pub fn corners_to_bbox(a: LngLat, b: LngLat) -> BBox {
    BBox {
        north: a.lat.max(b.lat),
        south: a.lat.min(b.lat),
        east: a.lng.max(b.lng),
        west: a.lng.min(b.lng),
    }
}

/// Markers for finished jobs, at the centre of each box.
pub fn markers_for(jobs: &[Job]) -> Vec<Marker> {
    jobs.iter()
        .filter(|j| j.status == JobStatus::Succeeded)
        .map(|j| {
            let (lng, lat) = j.bbox.centroid();
            Marker {
                job_id: j.id,
                lng,
                lat,
                label: format!("Job {}", short_id(j.id)),
            }
        })
        .collect()
}

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
