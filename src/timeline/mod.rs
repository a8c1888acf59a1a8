// src/timeline/mod.rs
//! Timeline aggregation: recent posts of one account → a single input text.

pub mod twitter;
pub mod types;

use metrics::counter;
use std::sync::Arc;

use crate::error::TimelineError;
use crate::text::{
    normalize_newlines, replace_urls, PHOTO_PLACEHOLDER, QUOTATION_PLACEHOLDER, SEPARATOR,
};

pub use twitter::{build_timeline_source, TwitterTimeline};
pub use types::{DisabledTimeline, Entities, MediaEntity, Post, TimelineSource, UrlEntity};

/// Link type of a post, decided from its URL and media entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkType {
    /// Links somewhere off-platform; the post is not treated as authored content.
    External,
    /// Type of the last media entity (e.g. `photo`), empty when there is none.
    Media(String),
}

impl LinkType {
    fn placeholder(&self) -> &'static str {
        match self {
            LinkType::Media(kind) if kind == "photo" => PHOTO_PLACEHOLDER,
            _ => QUOTATION_PLACEHOLDER,
        }
    }
}

/// True when `prefix` occurs in `url` as a whole host, i.e. followed by `/` or the end.
fn points_at_platform(url: &str, prefix: &str) -> bool {
    url.match_indices(prefix).any(|(i, m)| {
        let rest = &url[i + m.len()..];
        rest.is_empty() || rest.starts_with('/')
    })
}

pub fn classify_link(post: &Post, platform_prefixes: &[String]) -> LinkType {
    let external = post.entities.urls.iter().any(|u| {
        u.expanded_url.as_deref().is_some_and(|url| {
            !url.is_empty() && !platform_prefixes.iter().any(|p| points_at_platform(url, p))
        })
    });
    if external {
        return LinkType::External;
    }
    let kind = post
        .entities
        .media
        .last()
        .map(|m| m.kind.clone())
        .unwrap_or_default();
    LinkType::Media(kind)
}

/// Drops external-link posts, normalizes the rest and joins them with `,`.
/// Returns the text and the number of dropped posts.
pub fn aggregate_posts(posts: &[Post], platform_prefixes: &[String]) -> (String, usize) {
    let mut dropped = 0usize;
    let mut parts = Vec::with_capacity(posts.len());
    for post in posts {
        let link = classify_link(post, platform_prefixes);
        if link == LinkType::External {
            dropped += 1;
            continue;
        }
        let text = normalize_newlines(post.content(), SEPARATOR);
        parts.push(replace_urls(&text, link.placeholder()));
    }
    (parts.join(SEPARATOR), dropped)
}

pub struct TimelineAggregator {
    source: Arc<dyn TimelineSource>,
    max_count: u32,
    platform_prefixes: Vec<String>,
}

impl TimelineAggregator {
    pub fn new(source: Arc<dyn TimelineSource>, max_count: u32, platform_prefixes: Vec<String>) -> Self {
        Self {
            source,
            max_count,
            platform_prefixes,
        }
    }

    /// Empty text is a valid result (no usable posts). A failed read is logged
    /// and returned so the caller can tell it apart from an empty timeline.
    pub async fn aggregate(&self, handle: &str) -> Result<String, TimelineError> {
        let posts = match self.source.user_timeline(handle, self.max_count).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(target: "timeline", error = %e, source = self.source.name(), "timeline fetch failed");
                counter!("timeline_fetch_errors_total").increment(1);
                return Err(e);
            }
        };

        let (text, dropped) = aggregate_posts(&posts, &self.platform_prefixes);
        counter!("timeline_posts_dropped_total").increment(dropped as u64);
        tracing::info!(
            target: "timeline",
            fetched = posts.len(),
            dropped,
            chars = text.chars().count(),
            "timeline aggregated"
        );
        Ok(text)
    }
}
