// src/timeline/twitter.rs
//! Twitter v1.1 `statuses/user_timeline` reader using an app-only bearer token.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{DisabledTimeline, Post, TimelineSource};
use crate::config::TimelineConfig;
use crate::error::TimelineError;

pub struct TwitterTimeline {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

impl TwitterTimeline {
    pub fn with_bearer(http: reqwest::Client, api_base: &str, token: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Uses the configured bearer token, or exchanges consumer credentials for one.
    pub async fn connect(http: reqwest::Client, cfg: &TimelineConfig) -> Result<Self, TimelineError> {
        if let Some(token) = cfg.bearer_token.clone() {
            return Ok(Self::with_bearer(http, &cfg.api_base, token));
        }
        match (&cfg.consumer_key, &cfg.consumer_secret) {
            (Some(key), Some(secret)) => {
                let token = obtain_bearer(&http, &cfg.oauth_base, key, secret).await?;
                Ok(Self::with_bearer(http, &cfg.api_base, token))
            }
            _ => Err(TimelineError::Disabled),
        }
    }
}

/// Client-credentials grant: `POST /oauth2/token` with basic auth.
async fn obtain_bearer(
    http: &reqwest::Client,
    oauth_base: &str,
    key: &str,
    secret: &str,
) -> Result<String, TimelineError> {
    let url = format!("{}/oauth2/token", oauth_base.trim_end_matches('/'));
    let resp = http
        .post(&url)
        .basic_auth(key, Some(secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(TimelineError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let token: TokenResponse = resp.json().await?;
    if !token.token_type.eq_ignore_ascii_case("bearer") {
        return Err(TimelineError::Parse(format!(
            "unexpected token type {}",
            token.token_type
        )));
    }
    Ok(token.access_token)
}

#[async_trait]
impl TimelineSource for TwitterTimeline {
    async fn user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Post>, TimelineError> {
        let url = format!("{}/statuses/user_timeline.json", self.api_base);
        let count = count.to_string();
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("screen_name", handle),
                ("count", count.as_str()),
                ("exclude_replies", "true"),
                ("include_rts", "false"),
                ("tweet_mode", "extended"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TimelineError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let posts: Vec<Post> = resp.json().await?;
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}

/// Factory: a live reader when credentials work, otherwise a disabled one.
pub async fn build_timeline_source(
    http: reqwest::Client,
    cfg: &TimelineConfig,
) -> Arc<dyn TimelineSource> {
    if !cfg.has_credentials() {
        warn!(target: "timeline", "no timeline credentials configured; account lookups are disabled");
        return Arc::new(DisabledTimeline);
    }
    match TwitterTimeline::connect(http, cfg).await {
        Ok(t) => {
            info!(target: "timeline", api_base = %t.api_base, "timeline source ready");
            Arc::new(t)
        }
        Err(e) => {
            warn!(target: "timeline", error = %e, "timeline source unavailable; account lookups are disabled");
            Arc::new(DisabledTimeline)
        }
    }
}
