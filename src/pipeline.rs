//! Article pipeline orchestrator and batch driver.
//!
//! One article flows through: title rewrite → body rewrite → clean → format
//! → keyword augmentation → publish → completion record. Failures degrade
//! unevenly on purpose: an unusable title falls back to a deterministic one
//! and a failed keyword call falls back to topic-derived terms, but a failed
//! body rewrite or publish aborts the article. A publish failure leaves the
//! URL unmarked so a later batch pass retries it.
//!
//! The batch driver serializes runs behind an atomic in-progress flag;
//! within a run, articles are processed strictly one at a time in the order
//! the store returns them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::api::{Generator, TextGenerator};
use crate::config::AppConfig;
use crate::content::{ContentCleaner, to_html};
use crate::models::{ArticleOutcome, PostSummary, RawArticle};
use crate::prompts;
use crate::publish::Publisher;
use crate::scrape::{FetchArticle, derive_topic};
use crate::store::UrlStore;
use crate::utils::meaningful_words;

static TITLE_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*`]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static KEYWORD_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s,]").unwrap());

/// Validation attempts before the title falls back to the deterministic form.
const TITLE_ATTEMPTS: u32 = 2;

/// Meta-commentary fragments a rewritten title must not contain.
const BAD_TITLE_MARKERS: [&str; 4] = ["title:", "here's", "here is a", "rewritten:"];

/// Generic pool appended to topic words when keyword generation fails.
const GENERIC_KEYWORDS: [&str; 8] = [
    "technology",
    "innovation",
    "digital",
    "transformation",
    "future",
    "trends",
    "industry",
    "development",
];

/// The article pipeline. One instance per process; the generator inside it
/// shares the process-wide limiter and failover state.
pub struct Pipeline<'a, G, P, S> {
    generator: Generator<'a, G>,
    publisher: &'a P,
    store: &'a S,
    cleaner: ContentCleaner,
    config: &'a AppConfig,
    in_progress: AtomicBool,
}

impl<'a, G, P, S> Pipeline<'a, G, P, S>
where
    G: TextGenerator,
    P: Publisher,
    S: UrlStore,
{
    pub fn new(
        generator: Generator<'a, G>,
        publisher: &'a P,
        store: &'a S,
        cleaner: ContentCleaner,
        config: &'a AppConfig,
    ) -> Self {
        Self {
            generator,
            publisher,
            store,
            cleaner,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Process every pending URL once, in store order.
    ///
    /// Guarded by an in-progress flag: overlapping invocations return an
    /// empty batch instead of doubling up on the quota budget. Individual
    /// article failures are logged and the batch continues.
    pub async fn process_pending<F: FetchArticle>(
        &self,
        fetcher: &F,
    ) -> Result<Vec<PostSummary>, crate::error::StoreError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("batch run already in progress; skipping");
            return Ok(Vec::new());
        }

        let result = self.run_batch(fetcher).await;
        self.in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn run_batch<F: FetchArticle>(
        &self,
        fetcher: &F,
    ) -> Result<Vec<PostSummary>, crate::error::StoreError> {
        let pending = self.store.pending()?;
        info!(count = pending.len(), "starting batch run");

        let mut results = Vec::new();
        for item in pending {
            let page = match fetcher.fetch(&item.url).await {
                Ok(page) => page,
                Err(e) => {
                    error!(url = %item.url, error = %e, "fetch failed; skipping article");
                    continue;
                }
            };
            let article = RawArticle {
                topic: derive_topic(&page.title),
                title: page.title,
                body: page.body,
                source_url: item.url.clone(),
                categories: item.categories,
            };
            let outcome = self.process_article(&article, &mut results).await;
            info!(url = %item.url, outcome = ?outcome, "article finished");
        }

        info!(published = results.len(), "batch run complete");
        Ok(results)
    }

    /// Run one article through the pipeline, appending a summary to
    /// `results` on success.
    #[instrument(level = "info", skip_all, fields(url = %article.source_url))]
    pub async fn process_article(
        &self,
        article: &RawArticle,
        results: &mut Vec<PostSummary>,
    ) -> ArticleOutcome {
        info!(topic = %article.topic, "processing article");
        self.check_categories(article);

        let title = self.rewrite_title(article).await;
        info!(title = %title, "title ready");

        let outcome = self.rewrite_and_publish(article, &title, results).await;

        // Space out publish calls when invoked in a tight loop.
        sleep(Duration::from_secs(
            self.config.pipeline.inter_article_delay_secs,
        ))
        .await;
        outcome
    }

    /// Warn about categories the store does not know. The publisher creates
    /// missing categories on its side, so this never blocks the article.
    fn check_categories(&self, article: &RawArticle) {
        match self.store.categories() {
            Ok(valid) if !valid.is_empty() => {
                for category in &article.categories {
                    if !valid.iter().any(|v| v.eq_ignore_ascii_case(category)) {
                        warn!(category = %category, "category not in the configured list");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not load category list"),
        }
    }

    async fn rewrite_and_publish(
        &self,
        article: &RawArticle,
        title: &str,
        results: &mut Vec<PostSummary>,
    ) -> ArticleOutcome {
        let max_attempts = self.config.pipeline.max_attempts;
        let prompt = prompts::rewrite_prompt(&article.topic, &article.body);
        let Some(raw_body) = self.generator.generate(&prompt, max_attempts).await else {
            error!("content rewrite failed; aborting article");
            return ArticleOutcome::ContentFailed;
        };

        let canonical = self.cleaner.clean(&raw_body);
        let html = to_html(&canonical, self.config.pipeline.min_paragraph_chars);
        let keywords = self.keywords(&article.topic).await;
        let content = format!("{html}\n{}", keywords_section(&keywords));

        match self
            .publisher
            .publish(title, &content, &article.categories)
            .await
        {
            Ok(post) => {
                if let Err(e) = self.store.mark_published(&article.source_url, &post.link) {
                    warn!(error = %e, "could not record blog url");
                }
                if let Err(e) = self
                    .store
                    .mark_processed(&article.source_url, &article.categories)
                {
                    warn!(error = %e, "could not mark url processed");
                }
                info!(link = %post.link, "article published");
                results.push(PostSummary {
                    title: title.to_string(),
                    categories: article.categories.clone(),
                    link: post.link,
                    original_topic: article.topic.clone(),
                });
                ArticleOutcome::Published
            }
            Err(e) => {
                // The URL stays unprocessed and eligible for a retry pass.
                error!(error = %e, "publish failed");
                ArticleOutcome::PublishFailed
            }
        }
    }

    /// Rewrite the headline, degrading to a deterministic fallback when the
    /// model keeps producing unusable titles. Never fails.
    ///
    /// Only *invalid* output (a successful response the classifier rejects)
    /// is re-asked for, up to [`TITLE_ATTEMPTS`] times. A `None` from the
    /// generator means its own attempt budget is already spent, so asking
    /// again would amplify the backend retries; that goes straight to the
    /// fallback instead.
    async fn rewrite_title(&self, article: &RawArticle) -> String {
        let prompt = prompts::title_prompt(&article.title, &article.topic);
        for attempt in 1..=TITLE_ATTEMPTS {
            let Some(raw) = self
                .generator
                .generate(&prompt, self.config.pipeline.max_attempts)
                .await
            else {
                break;
            };
            let candidate = normalize_title(&raw);
            if !self.is_bad_title(&candidate) {
                return candidate;
            }
            warn!(attempt, candidate = %candidate, "rejected rewritten title");
        }
        let fallback = fallback_title(&article.topic);
        warn!(fallback = %fallback, "using deterministic fallback title");
        fallback
    }

    /// Reject titles carrying instructional leakage, non-Latin text, or an
    /// unusable length.
    fn is_bad_title(&self, title: &str) -> bool {
        let chars = title.chars().count();
        if chars < self.config.pipeline.title_min_chars
            || chars > self.config.pipeline.title_max_chars
        {
            return true;
        }
        let lower = title.to_lowercase();
        if BAD_TITLE_MARKERS.iter().any(|m| lower.contains(m)) {
            return true;
        }
        // English output is required; any letter outside the Latin ranges
        // (ASCII through Latin Extended-B) marks a stray-language response.
        title
            .chars()
            .any(|c| c.is_alphabetic() && (c as u32) > 0x024F)
    }

    /// Generate keywords, degrading to topic-derived terms. Never fails.
    async fn keywords(&self, topic: &str) -> String {
        let prompt = prompts::keyword_prompt(topic);
        if let Some(raw) = self
            .generator
            .generate(&prompt, self.config.pipeline.max_attempts)
            .await
        {
            let cleaned = normalize_keywords(&raw);
            if cleaned.chars().count() >= 10 {
                return cleaned;
            }
            warn!(cleaned = %cleaned, "keyword output too thin");
        }
        let fallback = fallback_keywords(topic);
        warn!(fallback = %fallback, "using deterministic fallback keywords");
        fallback
    }
}

/// Strip markup junk from a title candidate and collapse whitespace.
fn normalize_title(raw: &str) -> String {
    let title = TITLE_JUNK_RE.replace_all(raw, "");
    WHITESPACE_RE.replace_all(title.trim(), " ").into_owned()
}

/// Deterministic title from the most meaningful topic words.
fn fallback_title(topic: &str) -> String {
    let title = meaningful_words(topic)
        .into_iter()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        return "Technology News Update".to_string();
    }
    if title.chars().count() < 20 {
        format!("Latest Updates: {title}")
    } else {
        title
    }
}

/// Normalize raw keyword output into a comma-separated list.
fn normalize_keywords(raw: &str) -> String {
    let joined = raw.replace('\n', ", ");
    let stripped = KEYWORD_JUNK_RE.replace_all(&joined, "");
    stripped
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .join(", ")
}

/// Topic words plus the generic pool, first ten unique terms.
fn fallback_keywords(topic: &str) -> String {
    topic
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .chain(GENERIC_KEYWORDS.iter().map(|k| k.to_string()))
        .unique()
        .take(10)
        .join(", ")
}

fn keywords_section(keywords: &str) -> String {
    format!(
        "<h3><strong>Keywords</strong></h3>\n<p><strong>Related Keywords:</strong> {keywords}</p>"
    )
}
