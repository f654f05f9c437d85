//! Raw model output normalization.
//!
//! Generators echo back markup, instructional leakage, truncated fragments,
//! and restated paragraphs. The cleaner reduces all of that to canonical
//! heading-tagged plain text: strip markup, drop boilerplate and truncated
//! lines, then filter near-duplicate paragraphs.
//!
//! Heading lines (`##` / `###`) pass through with their markers intact so
//! the formatter can still detect them.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dedup::remove_near_duplicates;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[a-zA-Z]*\n?").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").unwrap());
static STRIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~(.*?)~~").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static ELLIPSIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());

/// Patterns marking meta-commentary lines the generator sometimes echoes.
///
/// Prefix rules match instructional labels at the start of a line; substring
/// rules match leakage phrases anywhere. Both compare lowercased.
#[derive(Debug, Clone)]
pub struct BoilerplateRules {
    prefixes: Vec<String>,
    substrings: Vec<String>,
}

impl Default for BoilerplateRules {
    fn default() -> Self {
        Self {
            prefixes: vec![
                "structure:".to_string(),
                "requirements:".to_string(),
                "content:".to_string(),
                "formatting:".to_string(),
                "note:".to_string(),
            ],
            substrings: vec![
                "here's a rewritten".to_string(),
                "here is a rewritten".to_string(),
                "seo-optimized version".to_string(),
                "hope this helps".to_string(),
                "let me know if".to_string(),
            ],
        }
    }
}

impl BoilerplateRules {
    pub fn matches(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.prefixes.iter().any(|p| lower.starts_with(p.as_str()))
            || self.substrings.iter().any(|s| lower.contains(s.as_str()))
    }

    #[cfg(test)]
    pub fn with_substring(mut self, pattern: &str) -> Self {
        self.substrings.push(pattern.to_lowercase());
        self
    }
}

/// Normalizes raw model output into canonical heading-tagged text.
#[derive(Debug, Clone)]
pub struct ContentCleaner {
    similarity_threshold: f64,
    boilerplate: BoilerplateRules,
}

impl ContentCleaner {
    pub fn new(similarity_threshold: f64, boilerplate: BoilerplateRules) -> Self {
        Self {
            similarity_threshold,
            boilerplate,
        }
    }

    /// Clean `raw` into newline-joined canonical text.
    pub fn clean(&self, raw: &str) -> String {
        let text = strip_markup(raw);

        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_heading(line) {
                lines.push(line.to_string());
                continue;
            }
            if self.should_drop(line) {
                continue;
            }
            lines.push(ELLIPSIS_RE.replace_all(line, ".").into_owned());
        }

        let unique = remove_near_duplicates(lines, self.similarity_threshold);
        unique.join("\n")
    }

    fn should_drop(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        if lower.starts_with("introduction") {
            return true;
        }
        if line.contains("[...]") || line.ends_with("...") || line.ends_with("..") {
            return true;
        }
        // Pure punctuation or residual emphasis markup.
        if !line.chars().any(|c| c.is_alphanumeric()) {
            return true;
        }
        self.boilerplate.matches(line)
    }
}

impl Default for ContentCleaner {
    fn default() -> Self {
        Self::new(0.85, BoilerplateRules::default())
    }
}

fn is_heading(line: &str) -> bool {
    line.starts_with("##")
}

/// Strip tags, code fences, and inline emphasis while preserving link text
/// and heading markers.
fn strip_markup(text: &str) -> String {
    let text = TAG_RE.replace_all(text, "");
    let text = FENCE_RE.replace_all(&text, "");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    let text = STRIKE_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = BRACKET_RE.replace_all(&text, "");
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_introduction_lines_but_keeps_heading_form() {
        let cleaner = ContentCleaner::default();
        let raw = "## Introduction to Healthcare\nIntroduction\nIntroduction to AI is a vast field with many subfields.\nHealth systems worldwide face mounting pressure from aging populations.";
        let cleaned = cleaner.clean(raw);
        assert!(cleaned.contains("## Introduction to Healthcare"));
        assert!(!cleaned.contains("\nIntroduction\n"));
        assert!(!cleaned.contains("vast field"));
        assert!(cleaned.contains("mounting pressure"));
    }

    #[test]
    fn test_removes_truncated_and_punctuation_only_lines() {
        let cleaner = ContentCleaner::default();
        let raw = "A complete sentence about renewable energy adoption.\nThe sector is expected to...\n...\n***\nAnother complete sentence about storage capacity growth.";
        let cleaned = cleaner.clean(raw);
        assert!(cleaned.contains("renewable energy adoption"));
        assert!(cleaned.contains("storage capacity growth"));
        assert!(!cleaned.contains("expected to"));
        assert!(!cleaned.contains("..."));
        assert!(!cleaned.contains("***"));
    }

    #[test]
    fn test_strips_markup_preserving_link_text() {
        let cleaner = ContentCleaner::default();
        let raw = "The **bold claim** was repeated by *analysts* citing [a recent report](https://example.com/report) on `mobile` payments across the region.";
        let cleaned = cleaner.clean(raw);
        assert!(cleaned.contains("bold claim"));
        assert!(cleaned.contains("a recent report"));
        assert!(!cleaned.contains("**"));
        assert!(!cleaned.contains("https://example.com"));
        assert!(!cleaned.contains('`'));
    }

    #[test]
    fn test_strips_html_and_code_fences() {
        let cleaner = ContentCleaner::default();
        let raw = "```html\n<p>Broadband subscriptions rose twelve percent last quarter.</p>\n```";
        let cleaned = cleaner.clean(raw);
        assert_eq!(
            cleaned,
            "Broadband subscriptions rose twelve percent last quarter."
        );
    }

    #[test]
    fn test_collapses_internal_ellipses() {
        let cleaner = ContentCleaner::default();
        let raw = "The minister paused....then announced the new spectrum policy framework.";
        let cleaned = cleaner.clean(raw);
        assert!(cleaned.contains("paused.then announced"));
    }

    #[test]
    fn test_drops_bracketed_placeholders() {
        let cleaner = ContentCleaner::default();
        let raw = "Funding reached record levels this year [citation needed] according to industry trackers.";
        let cleaned = cleaner.clean(raw);
        assert!(!cleaned.contains("citation needed"));
        assert!(cleaned.contains("record levels"));
    }

    #[test]
    fn test_drops_boilerplate_meta_lines() {
        let cleaner = ContentCleaner::default();
        let raw = "Here's a rewritten, SEO-optimized version of the article:\nStructure: heading then paragraphs\nThe actual article body discusses fintech regulation in depth.";
        let cleaned = cleaner.clean(raw);
        assert_eq!(
            cleaned,
            "The actual article body discusses fintech regulation in depth."
        );
    }

    #[test]
    fn test_boilerplate_prefix_does_not_match_inline() {
        let rules = BoilerplateRules::default();
        assert!(rules.matches("Requirements: write 800 words"));
        assert!(!rules.matches("The new requirements: stricter audits for lenders."));
    }

    #[test]
    fn test_custom_boilerplate_rule() {
        let rules = BoilerplateRules::default().with_substring("as an ai model");
        let cleaner = ContentCleaner::new(0.85, rules);
        let cleaned = cleaner.clean("As an AI model I cannot verify this.\nThe court ruling stands pending appeal.");
        assert_eq!(cleaned, "The court ruling stands pending appeal.");
    }

    #[test]
    fn test_near_duplicate_paragraphs_collapse_to_first() {
        let cleaner = ContentCleaner::default();
        let raw = "## Market Overview\nInvestors poured four billion dollars into regional startups last year.\nInvestors poured four billion dollars into regional startups this past year.\nMost of that capital targeted payments and logistics.";
        let cleaned = cleaner.clean(raw);
        let occurrences = cleaned.matches("Investors poured").count();
        assert_eq!(occurrences, 1);
        assert!(cleaned.contains("last year"));
        assert!(cleaned.contains("payments and logistics"));
    }

    #[test]
    fn test_heading_markers_survive_cleaning() {
        let cleaner = ContentCleaner::default();
        let raw = "## Main Heading\nBody paragraph with enough substance to keep around.\n### A Subheading\nAnother body paragraph that is clearly not a duplicate.";
        let cleaned = cleaner.clean(raw);
        assert!(cleaned.contains("## Main Heading"));
        assert!(cleaned.contains("### A Subheading"));
    }
}
