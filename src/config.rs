//! Application configuration.
//!
//! Loaded once at startup from an optional YAML file. The defaults embed the
//! full four-endpoint Gemini lineup, so a missing config file gives a working
//! pipeline out of the box. Endpoint order is significant: it is the failover
//! priority, and advancing past the last entry wraps to the first.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One named generation endpoint: a backend model plus its per-minute budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Identifier used by the limiter and failover controller.
    pub name: String,
    /// Model name passed to the generation API.
    pub model: String,
    /// Requests-per-minute ceiling. Must be positive.
    pub rpm: u32,
}

/// Tunables for the rewrite pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Paragraph pairs with similarity strictly above this are near-duplicates.
    pub similarity_threshold: f64,
    /// Minimum character count for a formatted paragraph.
    pub min_paragraph_chars: usize,
    /// Generation attempts per call before giving up.
    pub max_attempts: u32,
    /// Pause after switching endpoints on a quota error.
    pub rate_limit_switch_delay_secs: u64,
    /// Pause after switching endpoints on any other error.
    pub error_switch_delay_secs: u64,
    /// Delay between articles to avoid bursting the publish endpoint.
    pub inter_article_delay_secs: u64,
    /// Shortest acceptable rewritten title.
    pub title_min_chars: usize,
    /// Longest acceptable rewritten title.
    pub title_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_paragraph_chars: 20,
            max_attempts: 3,
            rate_limit_switch_delay_secs: 5,
            error_switch_delay_secs: 2,
            inter_article_delay_secs: 3,
            title_min_chars: 10,
            title_max_chars: 120,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Generation endpoints in failover priority order.
    pub endpoints: Vec<EndpointConfig>,
    /// Pipeline tunables.
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                EndpointConfig {
                    name: "primary".to_string(),
                    model: "gemini-2.0-flash".to_string(),
                    rpm: 15,
                },
                EndpointConfig {
                    name: "fallback".to_string(),
                    model: "gemini-1.5-flash".to_string(),
                    rpm: 15,
                },
                EndpointConfig {
                    name: "fallback-pro".to_string(),
                    model: "gemini-1.5-pro".to_string(),
                    rpm: 2,
                },
                EndpointConfig {
                    name: "fallback-flash".to_string(),
                    model: "gemini-2.0-flash-lite".to_string(),
                    rpm: 30,
                },
            ],
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the limiter and failover controller rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one generation endpoint is required".to_string(),
            ));
        }
        for endpoint in &self.endpoints {
            if endpoint.rpm == 0 {
                return Err(ConfigError::Invalid(format!(
                    "endpoint '{}' has a zero rpm ceiling",
                    endpoint.name
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.pipeline.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity threshold {} is outside [0, 1]",
                self.pipeline.similarity_threshold
            )));
        }
        if self.pipeline.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The backend model name for a configured endpoint.
    pub fn model_for(&self, endpoint: &str) -> Option<&str> {
        self.endpoints
            .iter()
            .find(|e| e.name == endpoint)
            .map(|e| e.model.as_str())
    }

    /// Endpoint names in failover priority order.
    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_four_endpoints_in_priority_order() {
        let config = AppConfig::default();
        assert_eq!(
            config.endpoint_names(),
            vec!["primary", "fallback", "fallback-pro", "fallback-flash"]
        );
        assert_eq!(config.model_for("primary"), Some("gemini-2.0-flash"));
        assert_eq!(config.model_for("fallback-pro"), Some("gemini-1.5-pro"));
        assert_eq!(config.model_for("nope"), None);
    }

    #[test]
    fn test_default_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
endpoints:
  - name: only
    model: gemini-2.0-flash
    rpm: 5
pipeline:
  similarity_threshold: 0.9
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].rpm, 5);
        assert_eq!(config.pipeline.similarity_threshold, 0.9);
        // Untouched knobs keep their defaults.
        assert_eq!(config.pipeline.inter_article_delay_secs, 3);
    }

    #[test]
    fn test_zero_rpm_rejected() {
        let mut config = AppConfig::default();
        config.endpoints[1].rpm = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        let config = AppConfig {
            endpoints: vec![],
            pipeline: PipelineConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
