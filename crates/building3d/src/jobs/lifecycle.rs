use chrono::{DateTime, Utc};

use crate::jobs::model::{Job, JobStatus, StatusUpdate};

#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleRules {
    /// When false every PATCH is applied as-is and the last write wins.
    pub enforce_transitions: bool,
}

/// Forward-only progression. Terminal statuses are final; re-asserting a
/// non-terminal status is a no-op.
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (Pending, Pending | Running | Succeeded | Failed) | (Running, Running | Succeeded | Failed)
    )
}

pub fn allowed_sources(to: JobStatus) -> Vec<JobStatus> {
    JobStatus::ALL
        .into_iter()
        .filter(|from| can_transition(*from, to))
        .collect()
}

/// Builds the partial update for a move to `to` at `now`.
///
/// An error message is only kept for `failed`, and only when non-empty.
pub fn plan_transition(
    to: JobStatus,
    error: Option<&str>,
    now: DateTime<Utc>,
    rules: &LifecycleRules,
) -> StatusUpdate {
    let error = match to {
        JobStatus::Failed => error.filter(|e| !e.is_empty()).map(str::to_string),
        _ => None,
    };

    StatusUpdate {
        status: to,
        finished_at: to.is_terminal().then_some(now),
        error,
        allowed_from: rules.enforce_transitions.then(|| allowed_sources(to)),
    }
}

/// Whether `update` may be applied to a job currently in `current`.
pub fn permits(update: &StatusUpdate, current: JobStatus) -> bool {
    update
        .allowed_from
        .as_ref()
        .map_or(true, |allowed| allowed.contains(&current))
}

/// Applies `update` to an in-memory record the way the SQL update does.
pub fn apply(job: &mut Job, update: &StatusUpdate) {
    job.status = update.status;
    if let Some(at) = update.finished_at {
        job.finished_at = Some(at);
    }
    if let Some(msg) = &update.error {
        job.error = Some(msg.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::{BBox, PLACEHOLDER_USER_ID};
    use uuid::Uuid;

    fn pending_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            user_id: PLACEHOLDER_USER_ID,
            bbox: BBox {
                north: 35.692,
                south: 35.690,
                east: 139.692,
                west: 139.690,
            },
            status: JobStatus::Pending,
            created_at: Utc::now(),
            finished_at: None,
            cost_estimate: None,
            error: None,
        }
    }

    #[test]
    fn succeeded_stamps_finished_at_without_error() {
        let now = Utc::now();
        let update = plan_transition(
            JobStatus::Succeeded,
            Some("ignored"),
            now,
            &LifecycleRules::default(),
        );
        assert_eq!(update.finished_at, Some(now));
        assert_eq!(update.error, None);
        assert_eq!(update.allowed_from, None);

        let mut job = pending_job();
        apply(&mut job, &update);
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.finished_at, Some(now));
        assert!(job.error.is_none());
    }

    #[test]
    fn failed_keeps_message() {
        let now = Utc::now();
        let update = plan_transition(
            JobStatus::Failed,
            Some("boom"),
            now,
            &LifecycleRules::default(),
        );
        let mut job = pending_job();
        apply(&mut job, &update);
        assert_eq!(job.finished_at, Some(now));
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn empty_failure_message_is_dropped() {
        let update = plan_transition(
            JobStatus::Failed,
            Some(""),
            Utc::now(),
            &LifecycleRules::default(),
        );
        assert_eq!(update.error, None);
    }

    #[test]
    fn non_terminal_leaves_finished_at_alone() {
        let update = plan_transition(
            JobStatus::Running,
            None,
            Utc::now(),
            &LifecycleRules::default(),
        );
        assert_eq!(update.finished_at, None);
    }

    #[test]
    fn permissive_rules_allow_going_back() {
        let update = plan_transition(
            JobStatus::Pending,
            None,
            Utc::now(),
            &LifecycleRules::default(),
        );
        assert!(permits(&update, JobStatus::Succeeded));
    }

    #[test]
    fn enforced_rules_are_forward_only() {
        let rules = LifecycleRules {
            enforce_transitions: true,
        };
        let back = plan_transition(JobStatus::Pending, None, Utc::now(), &rules);
        assert!(!permits(&back, JobStatus::Succeeded));
        assert!(permits(&back, JobStatus::Pending));

        let finish = plan_transition(JobStatus::Failed, Some("x"), Utc::now(), &rules);
        assert!(permits(&finish, JobStatus::Running));
        assert!(!permits(&finish, JobStatus::Failed));
        assert!(!permits(&finish, JobStatus::Succeeded));
    }

    #[test]
    fn transition_table() {
        use JobStatus::*;
        assert_eq!(allowed_sources(Running), vec![Pending, Running]);
        assert_eq!(allowed_sources(Succeeded), vec![Pending, Running]);
        assert_eq!(allowed_sources(Pending), vec![Pending]);
        assert!(!can_transition(Succeeded, Failed));
    }
}
