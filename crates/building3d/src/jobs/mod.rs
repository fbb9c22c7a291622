pub mod bbox;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use bbox::{validate_bbox, BBoxInput, BBoxRules, MAX_SPAN_DEGREES};
pub use lifecycle::LifecycleRules;
pub use memory::MemoryJobStore;
pub use model::{Asset, AssetKind, BBox, Job, JobFilter, JobStatus, NewJob, StatusUpdate};
pub use repo::JobsRepo;
pub use service::JobService;
pub use store::{JobStore, UpdateOutcome};
