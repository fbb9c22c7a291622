use std::sync::Arc;

use building3d::api::{self, ApiState, MapPage};
use building3d::config::{Config, StoreConfig};
use building3d::db;
use building3d::jobs::{JobService, JobStore, JobsRepo, MemoryJobStore};

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;

    info!(
        api = %cfg.api_addr,
        store = store_label(&cfg.store),
        reject_inverted_bbox = cfg.reject_inverted_bbox,
        enforce_transitions = cfg.enforce_transitions,
        map_token = if cfg.mapbox_token.is_empty() { "missing" } else { "set" },
        blob_store = ?cfg.blob,
        "building3d starting"
    );

    let store: Arc<dyn JobStore> = match &cfg.store {
        StoreConfig::Postgres {
            database_url,
            pool,
            migrate_on_startup,
        } => {
            let pool = db::make_pool(database_url, pool).await?;
            if *migrate_on_startup {
                db::run_migrations(&pool).await?;
                info!("migrations applied");
            }
            Arc::new(JobsRepo::new(pool))
        }
        StoreConfig::Memory => {
            warn!("using in-memory job store; jobs are lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    let service = JobService::new(store, cfg.bbox_rules(), cfg.lifecycle_rules());
    let page = MapPage::new(cfg.mapbox_token.clone(), service.bbox_rules());
    let app = api::router(ApiState::new(service, cfg.blob.clone(), &page))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&cfg.api_addr).await?;
    info!(addr = %cfg.api_addr, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

fn store_label(store: &StoreConfig) -> &'static str {
    match store {
        StoreConfig::Postgres { .. } => "postgres",
        StoreConfig::Memory => "memory",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
