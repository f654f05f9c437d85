//! Canonical text to CMS markup.
//!
//! Line-oriented: heading markers become heading elements, everything else
//! becomes a paragraph, but only when enough text survives markup stripping.
//! The length floor suppresses stray fragments (orphaned punctuation,
//! truncated list bullets) that carry no real content.

use once_cell::sync::Lazy;
use regex::Regex;

static HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s*").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").unwrap());

/// Convert cleaned, heading-tagged text into WordPress-ready HTML.
///
/// `min_paragraph_chars` is the floor below which a plain line is discarded
/// rather than emitted as a paragraph.
pub fn to_html(canonical: &str, min_paragraph_chars: usize) -> String {
    let mut html_lines: Vec<String> = Vec::new();

    for line in canonical.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // `###` must be checked before `##`, which is also its prefix.
        if let Some(rest) = line.strip_prefix("###") {
            html_lines.push(format!("<h3>{}</h3>", rest.trim()));
            continue;
        }
        if let Some(rest) = line.strip_prefix("##") {
            html_lines.push(format!("<h2>{}</h2>", rest.trim()));
            continue;
        }

        let text = strip_residual_markup(line);
        let text = text.trim();
        if text.chars().count() > min_paragraph_chars {
            html_lines.push(format!("<p>{text}</p>"));
        }
    }

    html_lines.join("\n")
}

fn strip_residual_markup(line: &str) -> String {
    let line = HASH_RE.replace_all(line, "");
    let line = BOLD_RE.replace_all(&line, "$1");
    let line = ITALIC_RE.replace_all(&line, "$1");
    let line = CODE_RE.replace_all(&line, "$1");
    line.into_owned()
}
