//! Error types for the pipeline's collaborators.
//!
//! Each external capability (generation, publishing, persistence, article
//! fetching, configuration) gets its own `thiserror` enum so callers can
//! match on the failure mode they care about. Only [`GenerateError`] carries
//! classification logic: the retry wrapper needs to distinguish quota
//! signals from everything else, and not every backend reports them with a
//! structured code, so a message-inspection fallback backs up the typed
//! variants.

use thiserror::Error;

/// Errors surfaced by a text-generation backend.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backend refused the call because a request quota was exhausted.
    #[error("rate limited by {endpoint}: {message}")]
    RateLimited { endpoint: String, message: String },

    /// The API answered with a non-success status.
    #[error("generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerateError {
    /// Whether this error is a quota signal.
    ///
    /// Typed variants are checked first; the rendered message is inspected
    /// as a fallback for backends that only report errors as strings.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status: 429, .. } => true,
            other => message_signals_rate_limit(&other.to_string()),
        }
    }
}

/// Case-insensitive substrings that mark a stringly-typed quota error.
const RATE_LIMIT_MARKERS: [&str; 8] = [
    "rate limit",
    "quota exceeded",
    "too many requests",
    "rate exceeded",
    "quota limit",
    "resource exhausted",
    "429",
    "rate limit exceeded",
];

/// Fallback predicate for collaborators that expose only an error string.
///
/// Underscores are treated as spaces so status names like
/// `RESOURCE_EXHAUSTED` match their marker.
pub fn message_signals_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase().replace('_', " ");
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Errors from the CMS publishing client.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The CMS answered with a non-success status.
    #[error("CMS returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure.
    #[error("publish request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the URL/category store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the article fetcher.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport-level failure.
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The page yielded no readable article text.
    #[error("no readable article content at {0}")]
    Empty(String),
}

/// Errors while loading or validating the application config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_predicate_matches_known_markers() {
        assert!(message_signals_rate_limit("Rate limit exceeded for model"));
        assert!(message_signals_rate_limit("QUOTA EXCEEDED, try later"));
        assert!(message_signals_rate_limit("HTTP 429 Too Many Requests"));
        assert!(message_signals_rate_limit("RESOURCE_EXHAUSTED: out of quota"));
        assert!(message_signals_rate_limit("resource exhausted"));
    }

    #[test]
    fn test_message_predicate_ignores_other_errors() {
        assert!(!message_signals_rate_limit("connection reset by peer"));
        assert!(!message_signals_rate_limit("invalid API key"));
        assert!(!message_signals_rate_limit(""));
    }

    #[test]
    fn test_typed_rate_limit_variants() {
        let err = GenerateError::RateLimited {
            endpoint: "primary".to_string(),
            message: "slow down".to_string(),
        };
        assert!(err.is_rate_limit());

        let err = GenerateError::Api {
            status: 429,
            message: "anything".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_api_error_with_quota_message_is_rate_limit() {
        let err = GenerateError::Api {
            status: 500,
            message: "upstream quota exceeded".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_plain_api_error_is_not_rate_limit() {
        let err = GenerateError::Api {
            status: 500,
            message: "internal error".to_string(),
        };
        assert!(!err.is_rate_limit());
    }
}
