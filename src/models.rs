//! Data models shared across the pipeline.

use serde::{Deserialize, Serialize};

/// A scraped article as handed to the pipeline. Immutable input.
#[derive(Debug, Clone)]
pub struct RawArticle {
    /// Cleaned topic derived from the original title.
    pub topic: String,
    /// The original headline.
    pub title: String,
    /// Raw article body text.
    pub body: String,
    /// Where the article was scraped from.
    pub source_url: String,
    /// Category names assigned when the URL was enqueued.
    pub categories: Vec<String>,
}

/// A post as created by the CMS.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub link: String,
}

/// Summary of one successfully published article, appended to the
/// caller-owned accumulator.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub title: String,
    pub categories: Vec<String>,
    pub link: String,
    pub original_topic: String,
}

/// A completed row from the URL store, for the `posts` listing.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedRecord {
    pub source_url: String,
    pub fetched_url: String,
    pub blog_url: Option<String>,
    pub categories: Vec<String>,
    pub written_at: Option<String>,
}

/// Terminal state of one article's trip through the pipeline.
///
/// Title generation has no failure state: invalid model output degrades to a
/// deterministic fallback title instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Published,
    /// Body rewrite exhausted its attempts; nothing was published.
    ContentFailed,
    /// The CMS rejected the post; the URL stays eligible for a retry pass.
    PublishFailed,
}
