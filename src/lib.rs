// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod align;
pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod messages;
pub mod metrics;
pub mod pacing;
pub mod pipeline;
pub mod record;
pub mod resolve;
pub mod text;
pub mod timeline;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::pipeline::{Pipeline, PipelineReport, Submission};

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::record::{AccessStore, MemoryAccessStore, MySqlAccessStore};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Full application router from the environment (`.env`, config file, env vars).
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load()?;
    build_app(cfg).await
}

/// Wires the shared, read-only-after-init resources and returns the router.
pub async fn build_app(cfg: AppConfig) -> anyhow::Result<Router> {
    // No request timeout: the transport default applies to every remote call.
    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let source = timeline::build_timeline_source(http.clone(), &cfg.pipeline.timeline).await;

    let store: Arc<dyn AccessStore> = match cfg.database.connection_url() {
        Some(url) => Arc::new(MySqlAccessStore::connect(&url, 10).await?),
        None => {
            warn!("no database configured; access records are kept in memory only");
            Arc::new(MemoryAccessStore::new())
        }
    };
    info!(
        store = store.name(),
        vectorizer = %cfg.pipeline.vectorizer_url,
        classifier = %cfg.pipeline.classifier_url,
        engineer = cfg.pipeline.engineer_url.is_some(),
        attempts = cfg.pipeline.remote_max_attempts,
        "pipeline configured"
    );

    let pipeline = Pipeline::new(cfg.pipeline.clone(), http, source, store);
    let mut router = api::router_with_static(AppState::new(pipeline), &cfg.public_dir);

    if cfg.debug_routes {
        let m = metrics::Metrics::init()?;
        router = router.merge(m.router());
    }

    Ok(router)
}
