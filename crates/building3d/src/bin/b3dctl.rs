use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::Rng;
use sqlx::PgPool;

use building3d::config::DbPoolConfig;
use building3d::db::{make_pool, run_migrations};
use building3d::jobs::{
    AssetKind, BBox, BBoxInput, BBoxRules, Job, JobService, JobsRepo, LifecycleRules,
    MAX_SPAN_DEGREES,
};
use building3d::storage::asset_key;
use building3d::ui::{short_id, DEFAULT_CENTER};

/// Operator tooling for the building3d job database.
///
/// Uses DATABASE_URL or TEST_DATABASE_URL.
#[derive(Parser)]
#[command(name = "b3dctl", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Truncate every table.
    Reset,
    /// Insert `n` pending jobs with small random boxes around the default map center.
    Seed {
        #[arg(default_value_t = 10)]
        n: u32,
        /// Mark every other job succeeded and attach a model asset to it.
        #[arg(long)]
        with_assets: bool,
    },
    /// Print the newest jobs.
    List {
        #[arg(long)]
        status: Option<String>,
    },
    /// Print one job and its assets as JSON.
    Show { id: String },
    /// Write a status the way the processing side would.
    SetStatus {
        id: String,
        status: String,
        #[arg(long)]
        error: Option<String>,
    },
    /// Apply pending migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("TEST_DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or TEST_DATABASE_URL must be set"))?;

    let repo = Arc::new(JobsRepo::new(
        make_pool(&url, &DbPoolConfig::default()).await?,
    ));
    let service = JobService::new(repo.clone(), BBoxRules::default(), LifecycleRules::default());

    match cli.command {
        Command::Reset => reset(repo.pool()).await?,
        Command::Seed { n, with_assets } => seed(&service, &repo, n, with_assets).await?,
        Command::List { status } => {
            let jobs = service.list_jobs(status.as_deref()).await?;
            for job in &jobs {
                print_job(job);
            }
            println!("{} job(s)", jobs.len());
        }
        Command::Show { id } => {
            let job = service.get_job(&id).await?;
            let assets = service.list_assets(&id).await?;
            let out = serde_json::json!({ "job": job, "assets": assets });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::SetStatus { id, status, error } => {
            let job = service
                .update_status(&id, Some(&status), error.as_deref())
                .await?;
            print_job(&job);
        }
        Command::Migrate => {
            run_migrations(repo.pool()).await?;
            println!("migrations applied");
        }
    }

    Ok(())
}

async fn reset(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            billing_events,
            assets,
            jobs,
            users
        RESTART IDENTITY CASCADE
        "#,
    )
    .execute(pool)
    .await?;

    println!("reset OK");
    Ok(())
}

async fn seed(
    service: &JobService,
    repo: &JobsRepo,
    n: u32,
    with_assets: bool,
) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();

    for i in 0..n {
        let lng = DEFAULT_CENTER.lng + rng.gen_range(-0.05..0.05);
        let lat = DEFAULT_CENTER.lat + rng.gen_range(-0.05..0.05);
        let lng_span = rng.gen_range(0.001..MAX_SPAN_DEGREES);
        let lat_span = rng.gen_range(0.001..MAX_SPAN_DEGREES);

        let bbox = BBox {
            north: lat + lat_span,
            south: lat,
            east: lng + lng_span,
            west: lng,
        };
        let job = service.create_job(&BBoxInput::from(bbox)).await?;

        if with_assets && i % 2 == 0 {
            let key = asset_key(job.id, AssetKind::Model);
            repo.insert_asset(job.id, AssetKind::Model, &key, rng.gen_range(50_000..5_000_000))
                .await?;
            let id = job.id.to_string();
            service.update_status(&id, Some("running"), None).await?;
            service.update_status(&id, Some("succeeded"), None).await?;
            println!("+ job {} succeeded with {key}", short_id(job.id));
        } else {
            println!("+ job {} pending", short_id(job.id));
        }
    }
    Ok(())
}

fn print_job(job: &Job) {
    let finished = job
        .finished_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} {:<9} created={} finished={} bbox=[n={:.5} s={:.5} e={:.5} w={:.5}]",
        job.id,
        job.status.as_str(),
        job.created_at.to_rfc3339(),
        finished,
        job.bbox.north,
        job.bbox.south,
        job.bbox.east,
        job.bbox.west,
    );
}
