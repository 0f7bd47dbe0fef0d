//! Primary extraction via the external text-understanding service
//!
//! The service is a black box with a text-in/JSON-out contract: we POST the
//! sanitized report plus fixed instructions and expect either a JSON object
//! of candidate fields or an explicit waste status. Responses wrapped in
//! Markdown code fences are tolerated. Any transport failure, timeout,
//! non-success status or unparseable body is a strategy error, which the
//! extractor treats as "fall back to patterns".

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use concord_core::ExtractionMethod;

use crate::extract::{Candidate, ExtractionStrategy, StrategyError};

/// Environment variable holding the service endpoint.
pub const EXTRACTOR_URL_ENV: &str = "CONCORD_EXTRACTOR_URL";
/// Environment variable holding the bearer credential. Absent credential
/// means fallback-only extraction, not an error.
pub const EXTRACTOR_KEY_ENV: &str = "CONCORD_EXTRACTOR_KEY";
/// Environment variable overriding the call timeout in milliseconds.
pub const EXTRACTOR_TIMEOUT_ENV: &str = "CONCORD_EXTRACTOR_TIMEOUT_MS";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

const EXTRACTION_INSTRUCTIONS: &str = "Extract logistics fields from the report as a JSON object: \
     alpha (delivered quantity), i_friction (damage ratio 0-1), \
     j_friction (timeline slip 0-1), k_friction (budget variance 0-1). \
     Respond {\"status\": \"TOPOLOGICAL_WASTE\"} if the report carries no numeric content.";

/// Connection settings for the extraction service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    /// Read settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(EXTRACTOR_URL_ENV) {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(key) = std::env::var(EXTRACTOR_KEY_ENV) {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Some(timeout) = std::env::var(EXTRACTOR_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            config.timeout_ms = timeout;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// True when a credential is present and service extraction can run.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    instructions: &'static str,
    text: &'a str,
}

/// Strategy calling the external service.
pub struct ServiceStrategy {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl ServiceStrategy {
    pub fn new(config: ServiceConfig) -> Result<Self, StrategyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ExtractionStrategy for ServiceStrategy {
    fn name(&self) -> &'static str {
        "service"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Service
    }

    async fn draw(&self, text: &str) -> Result<Candidate, StrategyError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or(StrategyError::NotConfigured("extraction service api key"))?;
        let url = format!("{}/v1/extract", self.config.base_url.trim_end_matches('/'));
        let request = ExtractionRequest {
            instructions: EXTRACTION_INSTRUCTIONS,
            text,
        };

        debug!(url = %url, chars = text.len(), "calling extraction service");
        let send = self.client.post(&url).bearer_auth(key).json(&request).send();
        let response = tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), send)
            .await
            .map_err(|_| StrategyError::Timeout(self.config.timeout_ms))??;

        let body = response.error_for_status()?.text().await?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Candidate, StrategyError> {
    let payload = strip_fences(body);
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| StrategyError::Malformed(err.to_string()))?;

    if value.get("status").and_then(Value::as_str) == Some("TOPOLOGICAL_WASTE") {
        return Ok(Candidate::Waste);
    }
    if !value.is_object() {
        return Err(StrategyError::Malformed(format!(
            "expected a JSON object, got {payload}"
        )));
    }
    Ok(Candidate::Structured(value))
}

/// Drop a surrounding Markdown code fence if the service added one.
fn strip_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_payloads_are_unwrapped() {
        let body = "```json\n{\"alpha\": 97}\n```";
        assert_eq!(strip_fences(body), "{\"alpha\": 97}");
        assert_eq!(strip_fences("{\"alpha\": 1}"), "{\"alpha\": 1}");
    }

    #[test]
    fn waste_status_is_recognized() {
        let candidate = parse_response("{\"status\": \"TOPOLOGICAL_WASTE\"}").unwrap();
        assert!(matches!(candidate, Candidate::Waste));
    }

    #[test]
    fn object_payload_becomes_structured_candidate() {
        let candidate = parse_response("```json\n{\"quantity\": 42}\n```").unwrap();
        match candidate {
            Candidate::Structured(value) => assert_eq!(value["quantity"], 42),
            other => panic!("expected structured candidate, got {other:?}"),
        }
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert!(matches!(
            parse_response("[1, 2, 3]"),
            Err(StrategyError::Malformed(_))
        ));
        assert!(matches!(
            parse_response("not json at all"),
            Err(StrategyError::Malformed(_))
        ));
    }

    #[test]
    fn missing_credential_reports_unconfigured() {
        assert!(!ServiceConfig::default().is_configured());
        assert!(ServiceConfig::default()
            .with_api_key("key")
            .is_configured());
    }
}
