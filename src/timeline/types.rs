// src/timeline/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// One post from the user timeline API. Only the fields the aggregator reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Present when requested with `tweet_mode=extended`.
    #[serde(default)]
    pub full_text: Option<String>,
    /// Legacy, possibly truncated text.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Entities,
}

impl Post {
    /// Returns whichever text field is populated, preferring `full_text`.
    pub fn content(&self) -> &str {
        self.full_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub expanded_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Read access to a social timeline.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Up to `count` most recent posts by `handle`, replies and reposts excluded by the API.
    async fn user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Post>, TimelineError>;
    fn name(&self) -> &'static str;
}

/// Used when no credentials are configured; every read fails.
pub struct DisabledTimeline;

#[async_trait]
impl TimelineSource for DisabledTimeline {
    async fn user_timeline(&self, _handle: &str, _count: u32) -> Result<Vec<Post>, TimelineError> {
        Err(TimelineError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
