// src/pipeline.rs
//! Inference-request pipeline:
//! resolve → vectorize → classify → align → record → pad response time.
//!
//! Each request runs independently; the only shared state is what `Pipeline`
//! holds, and all of it is read-only after construction.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::align::{align, AlignedOutcome};
use crate::config::PipelineConfig;
use crate::error::ValidationError;
use crate::inference::{ClassifierOutcome, InferenceClient};
use crate::messages::{Locale, Message};
use crate::pacing::pad_response_time;
use crate::record::{record, AccessStore};
use crate::resolve::{resolve, InferenceRequest};
use crate::timeline::{TimelineAggregator, TimelineSource};

/// Inbound trigger: an account handle or free text (at least one).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub tweet: Option<String>,
}

impl Submission {
    pub fn account(&self) -> &str {
        self.account.as_deref().unwrap_or_default()
    }

    pub fn tweet(&self) -> &str {
        self.tweet.as_deref().unwrap_or_default()
    }
}

/// Everything one run produced. `errors` holds caller-facing messages only.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub request: InferenceRequest,
    pub errors: Vec<Message>,
    pub sex: AlignedOutcome,
    /// `None` when no engineer classifier is configured.
    pub engineer: Option<AlignedOutcome>,
}

impl PipelineReport {
    pub fn analyzed(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Pipeline {
    cfg: PipelineConfig,
    inference: InferenceClient,
    timeline: TimelineAggregator,
    store: Arc<dyn AccessStore>,
}

impl Pipeline {
    pub fn new(
        cfg: PipelineConfig,
        http: reqwest::Client,
        source: Arc<dyn TimelineSource>,
        store: Arc<dyn AccessStore>,
    ) -> Self {
        let inference = InferenceClient::new(http, &cfg);
        let timeline = TimelineAggregator::new(
            source,
            cfg.timeline.max_count,
            cfg.timeline.platform_prefixes.clone(),
        );
        Self {
            cfg,
            inference,
            timeline,
            store,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn locale(&self) -> Locale {
        self.cfg.locale
    }

    /// Runs one request end to end. `rejected` carries errors found before
    /// resolution (e.g. an unparsable body).
    pub async fn run(&self, submission: &Submission, rejected: Vec<ValidationError>) -> PipelineReport {
        let start = Instant::now();

        let (request, invalid) = resolve(submission.account(), submission.tweet(), &self.timeline).await;
        let mut errors: Vec<Message> = rejected
            .into_iter()
            .chain(invalid)
            .map(Message::from)
            .collect();

        let id = text_id(&request.resolved_text);
        info!(
            target: "pipeline",
            %id,
            timeline = request.sourced_from_timeline,
            invalid = errors.len(),
            "request resolved"
        );

        let (sex_outcome, engineer_outcome) = if errors.is_empty() {
            self.infer(&request, &mut errors).await
        } else {
            (ClassifierOutcome::Unavailable, None)
        };

        let sex = align(&sex_outcome);
        let engineer = if self.inference.has_engineer() {
            Some(
                engineer_outcome
                    .as_ref()
                    .map(align)
                    .unwrap_or(AlignedOutcome::UNDETERMINED),
            )
        } else {
            None
        };

        // A secondary that never produced a result is stored like an unwired one.
        let engineer_row = engineer.filter(AlignedOutcome::is_determined);
        if record(self.store.as_ref(), &request, sex, engineer_row).await.is_err() {
            errors.push(Message::General);
        }

        pad_response_time(start, request.sourced_from_timeline).await;

        let outcome = if errors.is_empty() { "analyzed" } else { "rejected" };
        counter!("pipeline_requests_total", "outcome" => outcome).increment(1);
        histogram!("pipeline_duration_ms").record(start.elapsed().as_secs_f64() * 1_000.0);
        info!(
            target: "pipeline",
            %id,
            outcome,
            predicted = sex.predicted_class,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request finished"
        );

        PipelineReport {
            request,
            errors,
            sex,
            engineer,
        }
    }

    /// Vectorize then classify; classify never runs when vectorize failed.
    async fn infer(
        &self,
        request: &InferenceRequest,
        errors: &mut Vec<Message>,
    ) -> (ClassifierOutcome, Option<ClassifierOutcome>) {
        let vector = match self.inference.vectorize(&request.resolved_text).await {
            Ok(v) => v,
            Err(_) => {
                errors.push(Message::General);
                return (ClassifierOutcome::Unavailable, None);
            }
        };

        let sex = match self.inference.classify(&vector).await {
            Ok(r) => ClassifierOutcome::Success(r),
            Err(_) => {
                errors.push(Message::General);
                return (ClassifierOutcome::Unavailable, None);
            }
        };

        // Secondary failures only degrade the secondary value.
        let engineer = self.inference.classify_engineer(&vector).await.map(|res| {
            if let Err(e) = &res {
                warn!(target: "pipeline", error = %e, "engineer classifier unavailable");
            }
            ClassifierOutcome::from(res)
        });

        (sex, engineer)
    }
}

/// Short, non-reversible id for log correlation; raw text is never logged.
pub(crate) fn text_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
