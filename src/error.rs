// src/error.rs
//! Error kinds of the inference-request pipeline.
//!
//! None of these is fatal to the process. Their `Display` output is for logs;
//! callers only ever see the fixed texts from [`crate::messages`].

use thiserror::Error;

/// Bad or missing input. Collected into a list; the pipeline still persists
/// a degraded record when one of these is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing input")]
    MissingInput,

    #[error("zero content")]
    ZeroContent,

    #[error("timeline source unavailable")]
    SourceUnavailable,

    #[error("invalid operation")]
    InvalidOperation,
}

/// Failure of a vectorize/classify call. The variants only matter for logs.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("request construction failed: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("decode error: {0}")]
    Decode(String),
}

impl RemoteCallError {
    /// Worth another attempt when a retry budget is configured.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            RemoteCallError::Request(err.to_string())
        } else if err.is_decode() {
            RemoteCallError::Decode(err.to_string())
        } else {
            RemoteCallError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteCallError {
    fn from(err: serde_json::Error) -> Self {
        RemoteCallError::Decode(err.to_string())
    }
}

/// The access record could not be written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The timeline read API could not be queried.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("timeline source disabled (no credentials)")]
    Disabled,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TimelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TimelineError::Parse(err.to_string())
        } else {
            TimelineError::Network(err.to_string())
        }
    }
}
