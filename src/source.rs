// src/source.rs
//! Boundaries to the browser-driving collaborator. The process that logs in,
//! scrolls groups and types comments lives outside this crate; it hands
//! posts in through `PostSource` and takes rendered replies out through
//! `ResponseSink`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::engine::Post;

/// Supplies freshly scraped posts, already de-duplicated per fetch but not
/// across runs; the session layer skips posts it has seen before.
#[async_trait]
pub trait PostSource: Send {
    async fn fetch_posts(&mut self) -> Result<Vec<Post>>;

    /// Label used in logs and error records.
    fn name(&self) -> &str;
}

/// Delivers a rendered reply to the platform.
#[async_trait]
pub trait ResponseSink: Send {
    async fn deliver(&mut self, post: &Post, response_text: &str) -> Result<()>;
}

/// Reads posts from a JSON file: an array of post records as exported by the
/// scraping collaborator. Useful for one-shot runs and replaying captures.
pub struct JsonPostSource {
    path: PathBuf,
}

impl JsonPostSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PostSource for JsonPostSource {
    async fn fetch_posts(&mut self) -> Result<Vec<Post>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read posts file: {}", self.path.display()))?;

        let posts: Vec<Post> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse posts file: {}", self.path.display()))?;

        info!(count = posts.len(), "posts loaded from {}", self.path.display());
        Ok(posts)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// Logs replies instead of posting them. The default sink until a real
/// delivery driver is wired in.
pub struct DryRunSink;

#[async_trait]
impl ResponseSink for DryRunSink {
    async fn deliver(&mut self, post: &Post, response_text: &str) -> Result<()> {
        info!(
            post_id = %post.post_id,
            "dry-run reply: {}",
            response_text
        );
        Ok(())
    }
}
