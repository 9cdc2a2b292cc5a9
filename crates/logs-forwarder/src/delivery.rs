// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships log lines to the ingestion endpoint.
//!
//! Each line goes out as its own POST:
//!
//! ```text
//!   POST {url}?hostname=..&apikey=..[&tags=..]
//!   Content-Type: application/json; charset=UTF-8
//!
//!   {"lines":[{"timestamp":..,"line":{..},"level":"INFO","app":"cloudtrail"}]}
//! ```
//!
//! Failed attempts are classified before retrying:
//!
//! - transport errors on the allow-list (reset, unreachable, timeouts, refused, DNS)
//!   and any status >= 500 are retried, waiting `base * 2^i` after attempt `i`;
//! - every other transport error fails the line immediately;
//! - every status < 500, 4xx included, is accepted and its body returned.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::DeliveryConfig;
use crate::error::{AttemptError, DeliveryError};
use crate::http::get_client;
use crate::normalizer::LogLine;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Destination for normalized log lines.
#[async_trait]
pub trait Shipper: Send + Sync {
    /// Delivers one line and returns the endpoint's response body.
    async fn deliver(&self, line: &LogLine) -> Result<String, DeliveryError>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    lines: [&'a LogLine; 1],
}

#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    config: Arc<DeliveryConfig>,
}

impl DeliveryClient {
    #[must_use]
    pub fn new(config: Arc<DeliveryConfig>) -> Self {
        let client = get_client(&config);
        DeliveryClient { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub async fn deliver(&self, line: &LogLine) -> Result<String, DeliveryError> {
        let Some(api_key) = self.config.key.as_deref().filter(|key| !key.is_empty()) else {
            error!("FORWARDER | Skipping delivery: missing LogDNA ingestion key");
            return Err(DeliveryError::MissingCredential);
        };

        let body = Bytes::from(serde_json::to_vec(&Envelope { lines: [line] })?);
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            let time = Instant::now();
            let result = self.send(api_key, body.clone()).await;
            let elapsed = time.elapsed();
            attempts += 1;

            let err = match result {
                Ok(response) => {
                    debug!(
                        "FORWARDER | Delivered line in {} ms after {attempts} attempt(s)",
                        elapsed.as_millis()
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                error!(
                    "FORWARDER | Delivery failed after {} ms, not retrying: {err}",
                    elapsed.as_millis()
                );
                return Err(DeliveryError::Terminal(err));
            }

            if attempts >= max_attempts {
                error!(
                    "FORWARDER | Delivery failed after {} ms and {attempts} attempts: {err}",
                    elapsed.as_millis()
                );
                return Err(DeliveryError::RetriesExhausted {
                    attempts,
                    last: err,
                });
            }

            let backoff = policy.backoff(attempts - 1);
            warn!(
                "FORWARDER | Attempt {attempts}/{max_attempts} failed: {err}, retrying in {} ms",
                backoff.as_millis()
            );
            tokio::time::sleep(backoff).await;
        }
    }

    fn create_request(&self, api_key: &str, body: Bytes) -> reqwest::RequestBuilder {
        let mut query = vec![("hostname", self.config.hostname()), ("apikey", api_key)];
        if let Some(tags) = self.config.tags.as_deref() {
            query.push(("tags", tags));
        }

        self.client
            .post(&self.config.url)
            .query(&query)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .body(body)
    }

    async fn send(&self, api_key: &str, body: Bytes) -> Result<String, AttemptError> {
        let response = self.create_request(api_key, body).send().await?;
        let status = response.status();

        if status.as_u16() >= 500 {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Server { status, body });
        }
        if !status.is_success() {
            // Accepted as delivered: only 5xx is treated as a failure.
            debug!("FORWARDER | Ingestion endpoint answered {status}, treating as delivered");
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Shipper for DeliveryClient {
    async fn deliver(&self, line: &LogLine) -> Result<String, DeliveryError> {
        DeliveryClient::deliver(self, line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_line() -> LogLine {
        LogLine {
            timestamp: Some(json!("2024-01-01T00:00:00Z")),
            line: json!({ "eventName": "PutObject" }),
            level: "INFO".to_string(),
            app: "cloudtrail".to_string(),
        }
    }

    #[test]
    fn test_envelope_shape() {
        let line = test_line();
        let envelope = serde_json::to_value(Envelope { lines: [&line] }).unwrap();
        assert_eq!(
            envelope,
            json!({
                "lines": [{
                    "timestamp": "2024-01-01T00:00:00Z",
                    "line": { "eventName": "PutObject" },
                    "level": "INFO",
                    "app": "cloudtrail"
                }]
            })
        );
    }

    #[test]
    fn test_create_request() {
        let config = Arc::new(DeliveryConfig {
            key: Some("test-key".to_string()),
            tags: Some("prod,audit".to_string()),
            url: "https://logs.example.com/logs/ingest".to_string(),
            ..Default::default()
        });
        let client = DeliveryClient::new(config);

        let request = client
            .create_request("test-key", Bytes::from_static(b"{}"))
            .build()
            .unwrap();

        let url = request.url();
        assert_eq!(url.path(), "/logs/ingest");
        let query = url.query_pairs().into_owned().collect::<Vec<_>>();
        assert_eq!(
            query,
            vec![
                ("hostname".to_string(), "logdna-cloudtrail".to_string()),
                ("apikey".to_string(), "test-key".to_string()),
                ("tags".to_string(), "prod,audit".to_string()),
            ]
        );
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=UTF-8"
        );
        assert_eq!(
            request.headers().get(USER_AGENT).unwrap(),
            client.config().user_agent.as_str()
        );
    }

    #[test]
    fn test_create_request_without_tags() {
        let client = DeliveryClient::new(Arc::new(DeliveryConfig::default()));
        let request = client
            .create_request("test-key", Bytes::new())
            .build()
            .unwrap();
        assert!(!request.url().query_pairs().any(|(name, _)| name == "tags"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        for key in [None, Some(String::new())] {
            let config = Arc::new(DeliveryConfig {
                key,
                // Nothing listens here; reaching the network would surface a transport error.
                url: "http://127.0.0.1:9/logs/ingest".to_string(),
                ..Default::default()
            });
            let result = DeliveryClient::new(config).deliver(&test_line()).await;
            assert!(matches!(result, Err(DeliveryError::MissingCredential)));
        }
    }
}
