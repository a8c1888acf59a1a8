// src/inference/mod.rs
//! Client for the two chained model services: doc2vec vectorizer, then the LSTM classifier.
//!
//! Both calls share one transport: the call-specific JSON is form-encoded under
//! a single `json` field and POSTed; only HTTP 200 is accepted.

pub mod tensor;

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::app::CLASSIFIER_INPUT_SHAPE;
use crate::config::PipelineConfig;
use crate::error::RemoteCallError;

pub use tensor::{ClassificationResult, Tensor, TensorEnvelope, VectorizeRequest};

/// Form field carrying the JSON payload.
const FORM_FIELD: &str = "json";

/// Classifier stage result. `Unavailable` covers "not attempted" and "failed".
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutcome {
    Success(ClassificationResult),
    Unavailable,
}

impl<E> From<Result<ClassificationResult, E>> for ClassifierOutcome {
    fn from(res: Result<ClassificationResult, E>) -> Self {
        match res {
            Ok(r) => ClassifierOutcome::Success(r),
            Err(_) => ClassifierOutcome::Unavailable,
        }
    }
}

#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    vectorizer_url: String,
    classifier_url: String,
    engineer_url: Option<String>,
    max_attempts: u32,
}

impl InferenceClient {
    pub fn new(http: reqwest::Client, cfg: &PipelineConfig) -> Self {
        Self {
            http,
            vectorizer_url: cfg.vectorizer_url.clone(),
            classifier_url: cfg.classifier_url.clone(),
            engineer_url: cfg.engineer_url.clone(),
            max_attempts: cfg.remote_max_attempts.max(1),
        }
    }

    pub fn has_engineer(&self) -> bool {
        self.engineer_url.is_some()
    }

    /// Text → embedding. The returned tensor's values match its declared shape.
    pub async fn vectorize(&self, text: &str) -> Result<Tensor, RemoteCallError> {
        let payload = encode(&VectorizeRequest { str_data: text })?;
        self.with_retry("vectorize", || async {
            let body = self.post_form(&self.vectorizer_url, &payload).await?;
            let tensor = serde_json::from_slice::<TensorEnvelope>(&body)?.into_tensor();
            if !tensor.is_consistent() {
                return Err(RemoteCallError::Decode(format!(
                    "vectorizer shape {:?} does not match {} values",
                    tensor.shape,
                    tensor.values.len()
                )));
            }
            debug!(target: "inference", shape = ?tensor.shape, "vectorize ok");
            Ok::<_, RemoteCallError>(tensor)
        })
        .await
    }

    /// Embedding → (probability, predicted class) from the primary classifier.
    pub async fn classify(&self, vector: &Tensor) -> Result<ClassificationResult, RemoteCallError> {
        self.classify_at("classify", &self.classifier_url, vector).await
    }

    /// Same embedding through the secondary classifier; `None` when it is not configured.
    pub async fn classify_engineer(
        &self,
        vector: &Tensor,
    ) -> Option<Result<ClassificationResult, RemoteCallError>> {
        let url = self.engineer_url.as_deref()?;
        Some(self.classify_at("classify_engineer", url, vector).await)
    }

    async fn classify_at(
        &self,
        stage: &'static str,
        endpoint: &str,
        vector: &Tensor,
    ) -> Result<ClassificationResult, RemoteCallError> {
        // The classifier only accepts [1, 600]; the real dimensionality is not checked here.
        let request = TensorEnvelope::new(vector.reshaped(&CLASSIFIER_INPUT_SHAPE));
        let payload = encode(&request)?;
        self.with_retry(stage, || async {
            let body = self.post_form(endpoint, &payload).await?;
            let tensor = serde_json::from_slice::<TensorEnvelope>(&body)?.into_tensor();
            let result = ClassificationResult::from_values(tensor.values)?;
            debug!(
                target: "inference",
                stage,
                probability = result.raw_probability(),
                class = result.predicted_class(),
                "classify ok"
            );
            Ok::<_, RemoteCallError>(result)
        })
        .await
    }

    async fn post_form(&self, endpoint: &str, payload: &str) -> Result<Vec<u8>, RemoteCallError> {
        let resp = self
            .http
            .post(endpoint)
            .form(&[(FORM_FIELD, payload)])
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(RemoteCallError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Runs `call` up to `max_attempts` times; only transient failures are retried.
    async fn with_retry<T, F, Fut>(&self, stage: &'static str, call: F) -> Result<T, RemoteCallError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteCallError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    warn!(target: "inference", stage, attempt, error = %e, "remote call failed");
                    counter!("pipeline_remote_errors_total", "stage" => stage).increment(1);
                    if attempt < self.max_attempts && e.is_transient() {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1).min(4)))
                            .await;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, RemoteCallError> {
    serde_json::to_string(value).map_err(|e| RemoteCallError::Request(e.to_string()))
}
