// src/resolve.rs
//! Input resolution: account XOR free text, and the text that will actually be analyzed.

use serde::Serialize;

use crate::error::ValidationError;
use crate::text::prepare_submitted;
use crate::timeline::TimelineAggregator;

/// Resolved pipeline input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub account: Option<String>,
    pub resolved_text: String,
    pub sourced_from_timeline: bool,
}

/// Trimmed handle without a leading `@`; `None` when nothing is left.
pub fn clean_handle(raw: &str) -> Option<String> {
    let h = raw.trim();
    let h = h.strip_prefix('@').unwrap_or(h).trim();
    (!h.is_empty()).then(|| h.to_string())
}

/// Validates the submission and picks the path.
///
/// Always returns a request, even alongside errors, so the caller can still
/// persist a degraded record and echo the input back.
pub async fn resolve(
    submitted_account: &str,
    submitted_text: &str,
    timeline: &TimelineAggregator,
) -> (InferenceRequest, Vec<ValidationError>) {
    let mut errors = Vec::new();
    let account = clean_handle(submitted_account);

    if account.is_none() && submitted_text.trim().is_empty() {
        errors.push(ValidationError::MissingInput);
    }

    match account {
        Some(handle) => {
            let resolved_text = match timeline.aggregate(&handle).await {
                Ok(text) => {
                    if text.is_empty() {
                        errors.push(ValidationError::ZeroContent);
                    }
                    text
                }
                Err(_) => {
                    errors.push(ValidationError::SourceUnavailable);
                    String::new()
                }
            };
            (
                InferenceRequest {
                    account: Some(handle),
                    resolved_text,
                    sourced_from_timeline: true,
                },
                errors,
            )
        }
        None => (
            InferenceRequest {
                account: None,
                resolved_text: prepare_submitted(submitted_text),
                sourced_from_timeline: false,
            },
            errors,
        ),
    }
}
