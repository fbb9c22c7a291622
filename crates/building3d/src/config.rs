// Config is a central place for runtime configuration.
// Values come from the environment (and `.env` via dotenvy).

use crate::jobs::{BBoxRules, LifecycleRules};
use crate::storage::BlobStoreConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct DbPoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        pool: DbPoolConfig,
        migrate_on_startup: bool,
    },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreConfig,
    pub api_addr: String,
    pub mapbox_token: String,
    pub reject_inverted_bbox: bool,
    pub enforce_transitions: bool,
    pub blob: Option<BlobStoreConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let store = match env.get("B3D_STORE").as_deref().map(str::to_lowercase) {
            None => postgres_store(&env)?,
            Some(kind) if kind == "postgres" => postgres_store(&env)?,
            Some(kind) if kind == "memory" => StoreConfig::Memory,
            Some(other) => anyhow::bail!("B3D_STORE must be `postgres` or `memory`, got {other:?}"),
        };

        let api_addr = env
            .or_fallback("B3D_API_ADDR", "API_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let mapbox_token = env
            .or_fallback("B3D_MAPBOX_TOKEN", "NEXT_PUBLIC_MAPBOX_TOKEN")
            .unwrap_or_default();

        let reject_inverted_bbox = env.bool("B3D_REJECT_INVERTED_BBOX").unwrap_or(false);
        let enforce_transitions = env.bool("B3D_ENFORCE_TRANSITIONS").unwrap_or(false);

        let blob = BlobStoreConfig::from_lookup(&lookup)?;

        Ok(Self {
            store,
            api_addr,
            mapbox_token,
            reject_inverted_bbox,
            enforce_transitions,
            blob,
        })
    }

    pub fn bbox_rules(&self) -> BBoxRules {
        BBoxRules {
            reject_inverted: self.reject_inverted_bbox,
            ..BBoxRules::default()
        }
    }

    pub fn lifecycle_rules(&self) -> LifecycleRules {
        LifecycleRules {
            enforce_transitions: self.enforce_transitions,
        }
    }
}

fn postgres_store<F>(env: &Env<'_, F>) -> anyhow::Result<StoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = env
        .get("DATABASE_URL")
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is missing"))?;

    let max_connections = env
        .get("B3D_DB_MAX_CONNECTIONS")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(4)
        .clamp(1, 32);

    let acquire_timeout_secs = env
        .get("B3D_DB_ACQUIRE_TIMEOUT_SECS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10)
        .clamp(1, 60);

    let migrate_on_startup = env.bool("B3D_MIGRATE_ON_STARTUP").unwrap_or(false);

    Ok(StoreConfig::Postgres {
        database_url,
        pool: DbPoolConfig {
            max_connections,
            acquire_timeout_secs,
        },
        migrate_on_startup,
    })
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|s| !s.trim().is_empty())
    }

    fn or_fallback(&self, primary: &str, fallback: &str) -> Option<String> {
        self.get(primary).or_else(|| self.get(fallback))
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn postgres_is_the_default_and_needs_a_url() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let cfg = config(&[("DATABASE_URL", "postgres://localhost/b3d")]).unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/b3d".into(),
                pool: DbPoolConfig::default(),
                migrate_on_startup: false,
            }
        );
        assert_eq!(cfg.api_addr, "0.0.0.0:3000");
        assert!(cfg.blob.is_none());
        assert!(!cfg.bbox_rules().reject_inverted);
        assert!(!cfg.lifecycle_rules().enforce_transitions);
    }

    #[test]
    fn memory_store_needs_no_database() {
        let cfg = config(&[("B3D_STORE", "Memory")]).unwrap();
        assert_eq!(cfg.store, StoreConfig::Memory);
    }

    #[test]
    fn unknown_store_is_rejected() {
        assert!(config(&[("B3D_STORE", "sqlite")]).is_err());
    }

    #[test]
    fn pool_settings_are_clamped() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://x"),
            ("B3D_DB_MAX_CONNECTIONS", "500"),
            ("B3D_DB_ACQUIRE_TIMEOUT_SECS", "0"),
            ("B3D_MIGRATE_ON_STARTUP", "yes"),
        ])
        .unwrap();
        let StoreConfig::Postgres {
            pool,
            migrate_on_startup,
            ..
        } = cfg.store
        else {
            panic!("expected postgres store");
        };
        assert_eq!(pool.max_connections, 32);
        assert_eq!(pool.acquire_timeout_secs, 1);
        assert!(migrate_on_startup);
    }

    #[test]
    fn primary_names_win_over_legacy_ones() {
        let cfg = config(&[
            ("B3D_STORE", "memory"),
            ("API_ADDR", "127.0.0.1:1"),
            ("B3D_API_ADDR", "127.0.0.1:2"),
            ("NEXT_PUBLIC_MAPBOX_TOKEN", "pk.legacy"),
        ])
        .unwrap();
        assert_eq!(cfg.api_addr, "127.0.0.1:2");
        assert_eq!(cfg.mapbox_token, "pk.legacy");
    }

    #[test]
    fn product_switches() {
        let cfg = config(&[
            ("B3D_STORE", "memory"),
            ("B3D_REJECT_INVERTED_BBOX", "true"),
            ("B3D_ENFORCE_TRANSITIONS", "1"),
        ])
        .unwrap();
        assert!(cfg.bbox_rules().reject_inverted);
        assert!(cfg.lifecycle_rules().enforce_transitions);
    }

    #[test]
    fn partial_blob_config_fails_startup() {
        assert!(config(&[("B3D_STORE", "memory"), ("R2_BUCKET_NAME", "models")]).is_err());
    }
}
