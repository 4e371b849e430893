//! Session Spotlight — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the fetch pipeline, background
//! timers, and the metrics endpoint.

mod api;
mod cache;
mod config;
mod countdown;
mod orchestrator;
mod provider;
mod quota;
mod scheduler;
mod session;
mod store;
mod telemetry;

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::orchestrator::FetchOrchestrator;
use crate::provider::youtube::YouTubeProvider;
use crate::provider::SessionProvider;
use crate::scheduler::SchedulerCfg;
use crate::store::{JsonFileStore, StorePort};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - SPOTLIGHT_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("SPOTLIGHT_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("session_refresh=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = AppConfig::from_env();

    let store: Arc<dyn StorePort> = Arc::new(JsonFileStore::open(&cfg.state_path));
    let cache = cache::ResultCache::new(store.clone(), cfg.freshness);
    let quota = quota::QuotaTracker::new(store.clone(), cfg.daily_ceiling);
    let fallback = config::load_fallback_default();

    let provider: Option<Arc<dyn SessionProvider>> = match cfg.credentials() {
        Some((key, channel)) => Some(Arc::new(YouTubeProvider::new(key, channel))),
        None => {
            tracing::warn!("provider credentials missing; serving fallback data only");
            None
        }
    };

    let metrics = telemetry::Metrics::init(cfg.daily_ceiling, cfg.freshness.as_secs());

    let orchestrator = Arc::new(FetchOrchestrator::new(
        provider,
        cache,
        quota,
        store,
        fallback,
        cfg.request_timeout,
    ));

    // Background timers run for the process lifetime; Shuttle tears the
    // whole runtime down on shutdown.
    let _handles = scheduler::spawn(
        orchestrator.clone(),
        SchedulerCfg {
            poll_interval: cfg.poll_interval,
            refresh_interval: cfg.refresh_interval,
        },
    );

    let state = api::AppState::new(orchestrator);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
