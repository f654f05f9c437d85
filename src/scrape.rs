//! Article fetching.
//!
//! Thin collaborator upstream of the pipeline: download a page, pull out its
//! headline and body text, and derive a clean topic from the title. Link
//! discovery and crawling are out of scope; URLs arrive already enqueued.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::error::ScrapeError;

static TITLE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-|•]\s*.*$").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

/// A downloaded page reduced to headline and body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub title: String,
    pub body: String,
}

/// Fetch seam consumed by the batch driver.
pub trait FetchArticle {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError>;
}

/// Derive a clean topic from an article title.
///
/// Site names and section labels trail the headline after a dash, pipe, or
/// bullet; everything from the first such separator on is dropped. Very
/// short remainders get a generic context prefix.
pub fn derive_topic(title: &str) -> String {
    if title.trim().is_empty() {
        return "Technology News".to_string();
    }
    let topic = TITLE_SUFFIX_RE.replace(title, "");
    let topic = WHITESPACE_RE.replace_all(topic.trim(), " ").into_owned();
    if topic.chars().count() < 10 {
        format!("Technology News: {topic}")
    } else {
        topic
    }
}

/// Generic reqwest + selector fetcher.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchArticle for PageFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        let html = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .text()
            .await?;
        let document = Html::parse_document(&html);
        let title_selector = Selector::parse("h1, title").unwrap();
        let article_p_selector = Selector::parse("article p").unwrap();
        let p_selector = Selector::parse("p").unwrap();

        let title = document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let title = WHITESPACE_RE.replace_all(title.trim(), " ").into_owned();

        // Prefer paragraphs inside an article element; fall back to all
        // paragraphs on sparse pages.
        let mut paragraphs: Vec<String> = document
            .select(&article_p_selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .collect();
        if paragraphs.is_empty() {
            paragraphs = document
                .select(&p_selector)
                .map(|el| el.text().collect::<Vec<_>>().join(" "))
                .collect();
        }
        let body = paragraphs
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if body.is_empty() {
            return Err(ScrapeError::Empty(url.to_string()));
        }
        debug!(title = %title, bytes = body.len(), "fetched article");
        Ok(FetchedPage { title, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_topic_strips_site_suffix() {
        assert_eq!(
            derive_topic("Fintech Funding Hits New Record - TechSite Africa"),
            "Fintech Funding Hits New Record"
        );
        assert_eq!(
            derive_topic("Cloud Adoption Accelerates | IT News"),
            "Cloud Adoption Accelerates"
        );
        assert_eq!(
            derive_topic("Startups Expand Regionally • Daily Digest"),
            "Startups Expand Regionally"
        );
    }

    #[test]
    fn test_derive_topic_collapses_whitespace() {
        assert_eq!(derive_topic("Mobile   Money    Grows Rapidly"), "Mobile Money Grows Rapidly");
    }

    #[test]
    fn test_derive_topic_short_title_gets_context() {
        assert_eq!(derive_topic("5G Now"), "Technology News: 5G Now");
    }

    #[test]
    fn test_derive_topic_empty_title() {
        assert_eq!(derive_topic("   "), "Technology News");
    }

    #[test]
    fn test_body_extraction_prefers_article_paragraphs() {
        let html = "<html><body><p>nav junk</p><article><p>First body paragraph.</p><p>Second body paragraph.</p></article></body></html>";
        let document = Html::parse_document(html);
        let selector = Selector::parse("article p").unwrap();
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .collect();
        assert_eq!(paragraphs, vec!["First body paragraph.", "Second body paragraph."]);
    }
}
