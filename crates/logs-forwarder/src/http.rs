// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tracing::error;

use crate::config::DeliveryConfig;

/// Returns the pooled client shared by every delivery of the process.
///
/// Falls back to reqwest defaults when the configured builder cannot be built, so a TLS
/// setup problem degrades pooling instead of stopping the forwarder.
#[must_use]
pub fn get_client(config: &DeliveryConfig) -> reqwest::Client {
    match build_client(config) {
        Ok(client) => client,
        Err(e) => {
            error!("FORWARDER | Unable to build HTTP client: {e}, using reqwest defaults");
            reqwest::Client::new()
        }
    }
}

/// Builds a rustls client with the request timeout and idle-socket lifetime from config.
pub fn build_client(config: &DeliveryConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.request_timeout)
        .pool_idle_timeout(Some(config.free_socket_timeout))
        .user_agent(config.user_agent.as_str())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_client_with_defaults() {
        assert!(build_client(&DeliveryConfig::default()).is_ok());
    }

    #[test]
    fn test_build_client_with_short_timeouts() {
        let config = DeliveryConfig {
            request_timeout: Duration::from_millis(50),
            free_socket_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }
}
