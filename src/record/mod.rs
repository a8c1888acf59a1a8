// src/record/mod.rs
//! Access log: exactly one insert-only record per request that reaches persistence.

pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use crate::align::AlignedOutcome;
use crate::error::PersistenceError;
use crate::resolve::InferenceRequest;

pub use mysql::MySqlAccessStore;

/// Stored in place of the account when none was supplied.
pub const NO_ACCOUNT: &str = "-";

/// Width of the `account` column, in characters.
pub const ACCOUNT_MAX_CHARS: usize = 64;

/// One row of the `access` table. The identity column is assigned by the store.
/// `recorded_at` is the pipeline's clock at the end of inference, not the insert time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessRecord {
    pub account: String,
    pub tweet: String,
    pub predicted_sex: i32,
    pub probability_sex: f64,
    pub predicted_engineer: i32,
    pub probability_engineer: f64,
    pub recorded_at: DateTime<Utc>,
}

impl AccessRecord {
    /// `secondary` is `None` when no engineer classifier produced a result; stored as zeros.
    pub fn new(
        request: &InferenceRequest,
        primary: AlignedOutcome,
        secondary: Option<AlignedOutcome>,
    ) -> Self {
        let account = request
            .account
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(NO_ACCOUNT)
            .chars()
            .take(ACCOUNT_MAX_CHARS)
            .collect();
        let (predicted_engineer, probability_engineer) = secondary
            .map(|s| (s.predicted_class, s.probability))
            .unwrap_or((0, 0.0));
        Self {
            account,
            tweet: request.resolved_text.clone(),
            predicted_sex: primary.predicted_class,
            probability_sex: primary.probability,
            predicted_engineer,
            probability_engineer,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Insert only; never updates an existing row.
    async fn insert(&self, record: &AccessRecord) -> Result<(), PersistenceError>;
    fn name(&self) -> &'static str;
}

/// Builds the record and writes it once. Failures are logged and returned, never retried.
pub async fn record(
    store: &dyn AccessStore,
    request: &InferenceRequest,
    primary: AlignedOutcome,
    secondary: Option<AlignedOutcome>,
) -> Result<(), PersistenceError> {
    let rec = AccessRecord::new(request, primary, secondary);
    match store.insert(&rec).await {
        Ok(()) => {
            tracing::debug!(target: "record", store = store.name(), account = %rec.account, "access recorded");
            Ok(())
        }
        Err(e) => {
            tracing::error!(target: "record", store = store.name(), error = %e, "failed to insert access");
            metrics::counter!("pipeline_persist_errors_total").increment(1);
            Err(e)
        }
    }
}

/// In-process store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryAccessStore {
    rows: Mutex<Vec<AccessRecord>>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AccessRecord> {
        self.rows.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn insert(&self, record: &AccessRecord) -> Result<(), PersistenceError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store poisoned".into()))?;
        rows.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
