// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::messages::Locale;

pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_APP_CONFIG_PATH: &str = "APP_CONFIG_PATH";

/// Fixed shape the classifier expects for its input tensor.
pub const CLASSIFIER_INPUT_SHAPE: [i64; 2] = [1, 600];

/// Shown as the engineer probability when no secondary classifier is wired up.
pub const ENGINEER_PLACEHOLDER: f64 = 0.12356;

fn default_timeline_api_base() -> String {
    "https://api.twitter.com/1.1".to_string()
}
fn default_oauth_base() -> String {
    "https://api.twitter.com".to_string()
}
fn default_max_count() -> u32 {
    100
}
fn default_platform_prefixes() -> Vec<String> {
    vec!["https://twitter.com".to_string(), "https://x.com".to_string()]
}
fn default_max_attempts() -> u32 {
    1
}
fn default_public_dir() -> String {
    "public".to_string()
}
fn default_engineer_placeholder() -> f64 {
    ENGINEER_PLACEHOLDER
}

/// Credentials and limits for the timeline read API.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_timeline_api_base")]
    pub api_base: String,
    #[serde(default = "default_oauth_base")]
    pub oauth_base: String,
    /// App-only bearer token. Takes precedence over consumer credentials.
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    /// Expanded URLs starting with one of these point back to the platform itself.
    #[serde(default = "default_platform_prefixes")]
    pub platform_prefixes: Vec<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            api_base: default_timeline_api_base(),
            oauth_base: default_oauth_base(),
            bearer_token: None,
            consumer_key: None,
            consumer_secret: None,
            max_count: default_max_count(),
            platform_prefixes: default_platform_prefixes(),
        }
    }
}

impl TimelineConfig {
    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some()
            || (self.consumer_key.is_some() && self.consumer_secret.is_some())
    }
}

/// Everything the pipeline reads, fixed at startup and passed in explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub vectorizer_url: String,
    #[serde(default)]
    pub classifier_url: String,
    /// Secondary ("engineer") classifier; optional.
    #[serde(default)]
    pub engineer_url: Option<String>,
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Attempts per remote inference call. 1 = no retries.
    #[serde(default = "default_max_attempts")]
    pub remote_max_attempts: u32,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_engineer_placeholder")]
    pub engineer_placeholder: f64,
}

impl PipelineConfig {
    /// Config with the two required endpoints and defaults elsewhere.
    pub fn new(vectorizer_url: impl Into<String>, classifier_url: impl Into<String>) -> Self {
        Self {
            vectorizer_url: vectorizer_url.into(),
            classifier_url: classifier_url.into(),
            engineer_url: None,
            timeline: TimelineConfig::default(),
            remote_max_attempts: default_max_attempts(),
            locale: Locale::default(),
            engineer_placeholder: ENGINEER_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub passwd: Option<String>,
}

impl DatabaseConfig {
    /// Full URL if given, otherwise composed from the parts when a name is set.
    pub fn connection_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_ref().filter(|u| !u.trim().is_empty()) {
            return Some(url.clone());
        }
        let name = self.name.as_ref().filter(|n| !n.trim().is_empty())?;
        let host = self.host.as_deref().unwrap_or("127.0.0.1");
        let port = self.port.unwrap_or(3306);
        let user = self.user.as_deref().unwrap_or_default();
        let passwd = self.passwd.as_deref().unwrap_or_default();
        Some(format!("mysql://{user}:{passwd}@{host}:{port}/{name}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
    #[serde(default)]
    pub debug_routes: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            database: DatabaseConfig::default(),
            public_dir: default_public_dir(),
            debug_routes: false,
        }
    }
}

impl AppConfig {
    /// File (if present) + process environment, validated.
    /// Uses APP_CONFIG_PATH or defaults to "config/app.toml".
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_APP_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_APP_CONFIG_PATH.to_string());
        let mut cfg = if Path::new(&path).exists() {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading app config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| anyhow!("invalid app config: {e}"))
    }

    /// Override values from a key lookup (the environment in production).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let p = &mut self.pipeline;
        if let Some(v) = get("VECTORIZER_URL") {
            p.vectorizer_url = v;
        }
        if let Some(v) = get("CLASSIFIER_URL") {
            p.classifier_url = v;
        }
        if let Some(v) = get("ENGINEER_URL") {
            p.engineer_url = Some(v);
        }
        if let Some(v) = get("TWITTER_BEARER_TOKEN") {
            p.timeline.bearer_token = Some(v);
        }
        if let Some(v) = get("TWITTER_CONSUMER_KEY") {
            p.timeline.consumer_key = Some(v);
        }
        if let Some(v) = get("TWITTER_CONSUMER_SECRET") {
            p.timeline.consumer_secret = Some(v);
        }
        if let Some(v) = get("TIMELINE_API_BASE") {
            p.timeline.api_base = v;
        }
        if let Some(n) = get("TIMELINE_MAX_COUNT").and_then(|v| v.parse().ok()) {
            p.timeline.max_count = n;
        }
        if let Some(n) = get("REMOTE_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            p.remote_max_attempts = n;
        }
        if let Some(v) = get("APP_LOCALE") {
            p.locale = Locale::parse_or_default(&v);
        }

        let db = &mut self.database;
        if let Some(v) = get("DATABASE_URL") {
            db.url = Some(v);
        }
        if let Some(v) = get("DB_HOST") {
            db.host = Some(v);
        }
        if let Some(n) = get("DB_PORT").and_then(|v| v.parse().ok()) {
            db.port = Some(n);
        }
        if let Some(v) = get("DB_NAME") {
            db.name = Some(v);
        }
        if let Some(v) = get("DB_USER") {
            db.user = Some(v);
        }
        if let Some(v) = get("DB_PASSWD") {
            db.passwd = Some(v);
        }

        if let Some(v) = get("PUBLIC_DIR") {
            self.public_dir = v;
        }
        if let Some(v) = get("DEBUG_ROUTES") {
            self.debug_routes = v == "1";
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        let p = &mut self.pipeline;
        if p.vectorizer_url.trim().is_empty() {
            anyhow::bail!("VECTORIZER_URL is not configured");
        }
        if p.classifier_url.trim().is_empty() {
            anyhow::bail!("CLASSIFIER_URL is not configured");
        }
        if p.remote_max_attempts == 0 {
            p.remote_max_attempts = 1;
        }
        // The read API caps a single page at 200.
        p.timeline.max_count = p.timeline.max_count.clamp(1, 200);
        Ok(())
    }
}
