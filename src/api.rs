// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    routing::{get, get_service, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::align::to_percentage;
use crate::error::ValidationError;
use crate::pipeline::{Pipeline, PipelineReport, Submission};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Core routes: health, form post on `/`, JSON post on `/analyze`.
pub fn router(state: AppState) -> Router {
    build(state, None)
}

/// Core routes plus static files from `public_dir` (GET `/` serves its index.html).
pub fn router_with_static(state: AppState, public_dir: &str) -> Router {
    build(state, Some(public_dir))
}

fn build(state: AppState, public_dir: Option<&str>) -> Router {
    let index = match public_dir {
        Some(dir) => get_service(ServeDir::new(dir)).post(analyze_form),
        None => post(analyze_form),
    };
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", index)
        .route("/analyze", post(analyze_json));
    let app = match public_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.layer(CorsLayer::very_permissive()).with_state(state)
}

/// Outbound result. Probabilities refer to the positive class; `*_p` are
/// percentages rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analyzed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineer_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Submitted values echoed back on failure so the form can be refilled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<String>,
}

impl AnalyzeResponse {
    pub fn from_report(report: &PipelineReport, submission: &Submission, pipeline: &Pipeline) -> Self {
        if !report.analyzed() {
            let locale = pipeline.locale();
            let mut errors: Vec<String> = Vec::with_capacity(report.errors.len());
            for m in &report.errors {
                let text = m.text(locale).to_string();
                if !errors.contains(&text) {
                    errors.push(text);
                }
            }
            return Self {
                analyzed: false,
                female: None,
                female_p: None,
                engineer: None,
                engineer_p: None,
                errors,
                account: submission.account.clone(),
                tweet: submission.tweet.clone(),
            };
        }

        let female = report.sex.positive_probability();
        let engineer = match report.engineer {
            Some(e) if e.is_determined() => Some(e.positive_probability()),
            Some(_) => None,
            None => Some(pipeline.config().engineer_placeholder),
        };
        Self {
            analyzed: true,
            female: Some(female),
            female_p: Some(to_percentage(female)),
            engineer,
            engineer_p: engineer.map(to_percentage),
            errors: Vec::new(),
            account: None,
            tweet: None,
        }
    }
}

async fn analyze_form(
    State(state): State<AppState>,
    payload: Result<Form<Submission>, FormRejection>,
) -> Json<AnalyzeResponse> {
    let (submission, rejected) = match payload {
        Ok(Form(s)) => (s, Vec::new()),
        Err(e) => {
            tracing::warn!(target: "api", error = %e, "unreadable form body");
            (Submission::default(), vec![ValidationError::InvalidOperation])
        }
    };
    run(&state, submission, rejected).await
}

async fn analyze_json(
    State(state): State<AppState>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> Json<AnalyzeResponse> {
    let (submission, rejected) = match payload {
        Ok(Json(s)) => (s, Vec::new()),
        Err(e) => {
            tracing::warn!(target: "api", error = %e, "unreadable json body");
            (Submission::default(), vec![ValidationError::InvalidOperation])
        }
    };
    run(&state, submission, rejected).await
}

async fn run(
    state: &AppState,
    submission: Submission,
    rejected: Vec<ValidationError>,
) -> Json<AnalyzeResponse> {
    let report = state.pipeline.run(&submission, rejected).await;
    Json(AnalyzeResponse::from_report(&report, &submission, &state.pipeline))
}
