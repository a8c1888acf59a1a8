// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Process-wide recorder; installing it twice is an error, so it lives here.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once and describe the pipeline series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
            describe();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("pipeline_requests_total", "Requests that went through the pipeline, by outcome.");
    describe_counter!("pipeline_remote_errors_total", "Failed vectorize/classify attempts, by stage.");
    describe_counter!("pipeline_persist_errors_total", "Access records that could not be written.");
    describe_counter!("timeline_fetch_errors_total", "Timeline reads that failed.");
    describe_counter!("timeline_posts_dropped_total", "Posts dropped for linking off-platform.");
    describe_histogram!("pipeline_duration_ms", "Total pipeline time in milliseconds, padding included.");
}
