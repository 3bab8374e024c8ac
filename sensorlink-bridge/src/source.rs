//! Telemetry fetching from the local sensor HTTP endpoint.

use crate::config::TelemetryConfig;
use async_trait::async_trait;
use sensorlink_common::{SensorReading, decode_readings};

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Telemetry source unreachable: {0}")]
    Unreachable(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Anything that can produce one cycle's worth of readings.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SensorReading>, FetchError>;
}

/// Validate and decode a raw response body.
///
/// The trimmed body must open a JSON array; HTML error pages and empty
/// bodies are rejected before any parsing happens.
pub fn parse_body(body: &str) -> Result<Vec<SensorReading>, FetchError> {
    let trimmed = body.trim();
    if !trimmed.starts_with('[') {
        return Err(FetchError::InvalidResponse(preview(trimmed)));
    }

    decode_readings(trimmed).map_err(|e| FetchError::InvalidResponse(e.to_string()))
}

/// Shorten a rejected body for log output.
fn preview(body: &str) -> String {
    const MAX_CHARS: usize = 80;

    if body.is_empty() {
        return "empty body".to_string();
    }
    let mut out: String = body.chars().take(MAX_CHARS).collect();
    if body.chars().count() > MAX_CHARS {
        out.push_str("...");
    }
    format!("expected JSON array, got '{}'", out)
}

/// Fetches readings with a single HTTP GET per cycle.
#[derive(Debug, Clone)]
pub struct HttpSource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(config: &TelemetryConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn fetch(&self) -> Result<Vec<SensorReading>, FetchError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_array() {
        let readings = parse_body(
            r#"  [{"SensorName":"Total CPU Usage","SensorValue":"42.7","SensorClass":"CPU"}]  "#,
        )
        .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].name, "Total CPU Usage");
    }

    #[test]
    fn test_parse_body_rejects_empty() {
        assert!(matches!(
            parse_body(""),
            Err(FetchError::InvalidResponse(msg)) if msg == "empty body"
        ));
        assert!(matches!(
            parse_body("   \n"),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_body_rejects_html() {
        let html = "<html><body><h1>503 Service Unavailable</h1></body></html>";
        assert!(matches!(
            parse_body(html),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_body_rejects_object() {
        assert!(matches!(
            parse_body(r#"{"Sensors": []}"#),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_body_rejects_truncated_array() {
        assert!(matches!(
            parse_body(r#"[{"SensorName":"CPU Package","#),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(200);
        let msg = preview(&long);
        assert!(msg.ends_with("...'"));
        assert!(msg.len() < 120);
    }

    #[tokio::test]
    async fn test_http_source_unreachable() {
        // Port 9 (discard) on localhost is almost never served over HTTP.
        let config = TelemetryConfig {
            endpoint: "http://127.0.0.1:9/".to_string(),
            timeout_ms: 200,
        };
        let source = HttpSource::new(&config).unwrap();
        assert_eq!(source.endpoint(), "http://127.0.0.1:9/");
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Unreachable(_))
        ));
    }
}
