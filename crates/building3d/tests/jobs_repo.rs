// tests/jobs_repo.rs
mod common;

use std::sync::Arc;

use building3d::error::JobError;
use building3d::jobs::lifecycle::plan_transition;
use building3d::jobs::model::PLACEHOLDER_USER_ID;
use building3d::jobs::{
    AssetKind, BBox, BBoxInput, BBoxRules, JobFilter, JobService, JobStatus, JobStore, JobsRepo,
    LifecycleRules, NewJob, UpdateOutcome,
};
use building3d::storage::asset_key;
use chrono::Utc;
use common::setup_db;
use serial_test::serial;
use uuid::Uuid;

fn small_box() -> BBox {
    BBox {
        north: 35.6935,
        south: 35.6895,
        east: 139.6957,
        west: 139.6917,
    }
}

async fn insert(repo: &JobsRepo) -> Uuid {
    repo.insert_job(NewJob {
        user_id: PLACEHOLDER_USER_ID,
        bbox: small_box(),
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
#[serial]
async fn insert_then_get_round_trips_bbox_json() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);

    let id = insert(&repo).await;
    let job = repo.get_job(id).await.unwrap().expect("job exists");

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.bbox, small_box());
    assert_eq!(job.user_id, PLACEHOLDER_USER_ID);
    assert!(job.finished_at.is_none());
    assert!(job.error.is_none());

    assert!(repo.get_job(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn list_orders_newest_first_and_filters() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);

    let a = insert(&repo).await;
    let b = insert(&repo).await;
    let c = insert(&repo).await;

    let update = plan_transition(
        JobStatus::Failed,
        Some("boom"),
        Utc::now(),
        &LifecycleRules::default(),
    );
    repo.update_status(b, &update).await.unwrap();

    let all = repo.list_jobs(&JobFilter::default()).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![c, b, a]);

    let failed = repo
        .list_jobs(&JobFilter {
            status: Some(JobStatus::Failed),
            ..JobFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, b);
    assert_eq!(failed[0].error.as_deref(), Some("boom"));
}

#[tokio::test]
#[serial]
async fn same_transaction_inserts_list_in_reverse_insertion_order() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);

    // one statement: every row gets the same created_at
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO jobs (user_id, bbox)
        SELECT $1, '{"north":1.001,"south":1.0,"east":1.001,"west":1.0}'::jsonb
        FROM generate_series(1, 5)
        RETURNING id
        "#,
    )
    .bind(PLACEHOLDER_USER_ID)
    .fetch_all(repo.pool())
    .await
    .unwrap();

    let mut by_seq: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM jobs ORDER BY seq ASC")
        .fetch_all(repo.pool())
        .await
        .unwrap();
    assert_eq!(by_seq.len(), ids.len());
    by_seq.reverse();

    let listed: Vec<Uuid> = repo
        .list_jobs(&JobFilter::default())
        .await
        .unwrap()
        .iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(listed, by_seq);
}

#[tokio::test]
#[serial]
async fn list_respects_limit() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);

    for _ in 0..5 {
        insert(&repo).await;
    }

    let jobs = repo
        .list_jobs(&JobFilter {
            status: None,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);
}

#[tokio::test]
#[serial]
async fn update_of_missing_job_reports_not_found() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);

    let update = plan_transition(
        JobStatus::Running,
        None,
        Utc::now(),
        &LifecycleRules::default(),
    );
    let outcome = repo.update_status(Uuid::new_v4(), &update).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::NotFound));
}

#[tokio::test]
#[serial]
async fn enforced_update_is_rejected_from_terminal_state() {
    let Some(pool) = setup_db().await else { return };
    let repo = JobsRepo::new(pool);
    let rules = LifecycleRules {
        enforce_transitions: true,
    };

    let id = insert(&repo).await;
    let done = plan_transition(JobStatus::Succeeded, None, Utc::now(), &rules);
    let outcome = repo.update_status(id, &done).await.unwrap();
    let UpdateOutcome::Updated(job) = outcome else {
        panic!("expected update");
    };
    assert!(job.finished_at.is_some());

    let back = plan_transition(JobStatus::Running, None, Utc::now(), &rules);
    let outcome = repo.update_status(id, &back).await.unwrap();
    assert!(matches!(
        outcome,
        UpdateOutcome::Rejected {
            current: JobStatus::Succeeded
        }
    ));

    let job = repo.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
}

#[tokio::test]
#[serial]
async fn service_over_postgres_lists_assets() {
    let Some(pool) = setup_db().await else { return };
    let repo = Arc::new(JobsRepo::new(pool));
    let service = JobService::new(
        repo.clone(),
        BBoxRules::default(),
        LifecycleRules::default(),
    );

    let job = service.create_job(&BBoxInput::from(small_box())).await.unwrap();
    let key = asset_key(job.id, AssetKind::Texture);
    repo.insert_asset(job.id, AssetKind::Texture, &key, 2048)
        .await
        .unwrap();

    let assets = service.list_assets(&job.id.to_string()).await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].kind, AssetKind::Texture);
    assert_eq!(assets[0].r2_path, key);
    assert_eq!(assets[0].size, 2048);

    let err = service
        .list_assets(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));
}
