//! Projects Cache probe
//!
//! Builds the cache service from the environment, checks the store is alive
//! and prints a telemetry snapshot as JSON. Exits non-zero when the store is
//! unhealthy, so it can back a container liveness check.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use projects_cache::config::Backend;
use projects_cache::connector::{MemoryConnector, RedisConnector, StoreConnector};
use projects_cache::{spawn_sweeper_task, CacheService, Config};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "projects_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        backend = ?config.backend,
        default_ttl = config.default_ttl,
        lock_ttl_ms = config.lock_ttl_ms,
        prefix = %config.key_prefix,
        "configuration loaded"
    );

    let mut sweeper = None;
    let connector: Arc<dyn StoreConnector> = match config.backend {
        Backend::Redis => Arc::new(
            RedisConnector::connect(&config)
                .await
                .with_context(|| format!("connecting to {}", config.redis_url))?,
        ),
        Backend::Memory => {
            let memory = Arc::new(MemoryConnector::new());
            sweeper = Some(spawn_sweeper_task(memory.clone(), config.sweep_interval));
            memory
        }
    };

    let cache = CacheService::new(connector, &config).context("building cache service")?;

    let healthy = cache.health_check().await;
    let stats = cache.get_stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if let Some(handle) = sweeper {
        handle.abort();
    }

    if healthy {
        info!("store is healthy");
        Ok(ExitCode::SUCCESS)
    } else {
        error!("store failed the health check");
        Ok(ExitCode::FAILURE)
    }
}
