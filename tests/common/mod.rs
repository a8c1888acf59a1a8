// tests/common/mod.rs
//
// Local stand-ins for the remote services, bound to 127.0.0.1:0.
// Each test spawns its own; nothing is shared between tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use author_sex_estimator::config::PipelineConfig;
use author_sex_estimator::error::{PersistenceError, TimelineError};
use author_sex_estimator::record::{AccessRecord, AccessStore, MemoryAccessStore};
use author_sex_estimator::timeline::{Entities, MediaEntity, Post, TimelineSource, UrlEntity};
use author_sex_estimator::Pipeline;

pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    addr
}

/// What the model stubs saw and how they answer.
#[derive(Default)]
pub struct ModelState {
    pub vectorize_calls: AtomicUsize,
    pub classify_calls: AtomicUsize,
    pub engineer_calls: AtomicUsize,
    pub vectorize_inputs: Mutex<Vec<Value>>,
    pub classify_inputs: Mutex<Vec<Value>>,
    pub content_types: Mutex<Vec<String>>,
    /// Statuses to answer the vectorizer with, front first; 200 once drained.
    pub vectorize_statuses: Mutex<VecDeque<u16>>,
    pub vectorize_body: Mutex<Option<Value>>,
    pub classify_status: Mutex<Option<u16>>,
    pub classify_values: Mutex<Vec<f64>>,
    pub engineer_values: Mutex<Vec<f64>>,
}

#[derive(Clone)]
pub struct ModelStub {
    pub addr: SocketAddr,
    pub state: Arc<ModelState>,
}

impl ModelStub {
    pub async fn start() -> Self {
        let state = Arc::new(ModelState::default());
        *state.classify_values.lock() = vec![0.8, 0.0];
        *state.engineer_values.lock() = vec![0.6, 1.0];
        let router = Router::new()
            .route("/doc2vec", post(vectorize))
            .route("/female", post(classify))
            .route("/engineer", post(engineer))
            .with_state(state.clone());
        let addr = spawn(router).await;
        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::new(self.url("/doc2vec"), self.url("/female"))
    }

    pub fn vectorize_calls(&self) -> usize {
        self.state.vectorize_calls.load(Ordering::SeqCst)
    }

    pub fn classify_calls(&self) -> usize {
        self.state.classify_calls.load(Ordering::SeqCst)
    }

    pub fn engineer_calls(&self) -> usize {
        self.state.engineer_calls.load(Ordering::SeqCst)
    }

    pub fn fail_vectorizer_with(&self, statuses: &[u16]) {
        self.state.vectorize_statuses.lock().extend(statuses.iter().copied());
    }

    pub fn set_classify_values(&self, values: Vec<f64>) {
        *self.state.classify_values.lock() = values;
    }

    pub fn set_engineer_values(&self, values: Vec<f64>) {
        *self.state.engineer_values.lock() = values;
    }
}

fn embedding() -> Value {
    // Deliberately not [1, 600]: the client must reshape before classifying.
    json!({"data": {"tensor": {"shape": [600], "values": vec![0.01f64; 600]}}})
}

fn decode_json_field(form: &HashMap<String, String>) -> Value {
    form.get("json")
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(Value::Null)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn vectorize(
    State(s): State<Arc<ModelState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.vectorize_calls.fetch_add(1, Ordering::SeqCst);
    s.content_types.lock().push(content_type(&headers));
    s.vectorize_inputs.lock().push(decode_json_field(&form));
    if let Some(code) = s.vectorize_statuses.lock().pop_front() {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "boom").into_response();
    }
    let body = s.vectorize_body.lock().clone().unwrap_or_else(embedding);
    Json(body).into_response()
}

async fn classify(
    State(s): State<Arc<ModelState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.classify_calls.fetch_add(1, Ordering::SeqCst);
    s.classify_inputs.lock().push(decode_json_field(&form));
    if let Some(code) = *s.classify_status.lock() {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "boom").into_response();
    }
    let values = s.classify_values.lock().clone();
    Json(json!({"data": {"tensor": {"shape": [1, values.len()], "values": values}}})).into_response()
}

async fn engineer(
    State(s): State<Arc<ModelState>>,
    Form(_form): Form<HashMap<String, String>>,
) -> Response {
    s.engineer_calls.fetch_add(1, Ordering::SeqCst);
    let values = s.engineer_values.lock().clone();
    Json(json!({"data": {"tensor": {"shape": [1, values.len()], "values": values}}})).into_response()
}

/// Timeline source returning fixed posts (or a fixed failure).
pub struct StubTimeline {
    pub posts: Vec<Post>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubTimeline {
    pub fn with_posts(posts: Vec<Post>) -> Arc<Self> {
        Arc::new(Self {
            posts,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            posts: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimelineSource for StubTimeline {
    async fn user_timeline(&self, _handle: &str, _count: u32) -> Result<Vec<Post>, TimelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TimelineError::Api {
                status: 503,
                message: "over capacity".into(),
            });
        }
        Ok(self.posts.clone())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn make_post(text: &str, expanded_urls: &[&str], media: &[&str]) -> Post {
    Post {
        full_text: Some(text.to_string()),
        text: None,
        entities: Entities {
            urls: expanded_urls
                .iter()
                .map(|u| UrlEntity {
                    expanded_url: Some(u.to_string()),
                })
                .collect(),
            media: media
                .iter()
                .map(|m| MediaEntity {
                    kind: m.to_string(),
                })
                .collect(),
        },
    }
}

/// Store that always fails the insert.
pub struct BrokenStore;

#[async_trait]
impl AccessStore for BrokenStore {
    async fn insert(&self, _record: &AccessRecord) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

pub fn pipeline(
    cfg: PipelineConfig,
    timeline: Arc<StubTimeline>,
    store: Arc<MemoryAccessStore>,
) -> Pipeline {
    Pipeline::new(cfg, reqwest::Client::new(), timeline, store)
}
