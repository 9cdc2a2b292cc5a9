// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://logs.logdna.com/logs/ingest";
pub const DEFAULT_HOSTNAME: &str = "logdna-cloudtrail";
pub const DEFAULT_APP: &str = "cloudtrail";
pub const DEFAULT_LEVEL: &str = "INFO";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_FREE_SOCKET_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Exponential backoff without jitter or cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    pub base_interval: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt with the given 0-based index.
    #[must_use]
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.base_interval
            .saturating_mul(2_u32.saturating_pow(attempt_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
        }
    }
}

/// Settings for one invocation, shared read-only by every delivery.
#[derive(Clone)]
pub struct DeliveryConfig {
    pub key: Option<String>,
    pub hostname: Option<String>,
    /// Comma-joined, already trimmed.
    pub tags: Option<String>,
    pub app: Option<String>,
    pub level: Option<String>,
    /// Raw-event mode. Carried for callers that want to merge event metadata into the
    /// line; normalization currently passes records through either way.
    pub log_raw_event: bool,
    pub user_agent: String,
    pub url: String,
    pub request_timeout: Duration,
    /// How long an idle pooled connection is kept open.
    pub free_socket_timeout: Duration,
    pub retry: RetryPolicy,
    /// Upper bound on in-flight deliveries for one batch.
    pub max_concurrent_requests: usize,
}

impl DeliveryConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let cloudtrail = env::var("LOGDNA_CLOUDTRAIL").is_ok_and(|val| !val.is_empty());
        let user_agent = if cloudtrail {
            format!("logdna-cloudtrail/{}", env!("CARGO_PKG_VERSION"))
        } else {
            default_user_agent()
        };

        DeliveryConfig {
            key: non_empty_var("LOGDNA_KEY"),
            hostname: non_empty_var("LOGDNA_HOSTNAME"),
            tags: non_empty_var("LOGDNA_TAGS").and_then(|tags| parse_tags(&tags)),
            app: non_empty_var("LOGDNA_APP"),
            level: non_empty_var("LOGDNA_LEVEL"),
            log_raw_event: env::var("LOG_RAW_EVENT")
                .map(|val| is_truthy_flag(&val))
                .unwrap_or(false),
            user_agent,
            url: non_empty_var("LOGDNA_URL").unwrap_or_else(|| DEFAULT_URL.to_string()),
            request_timeout: Duration::from_millis(positive_var(
                "LOGDNA_MAX_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            free_socket_timeout: Duration::from_millis(positive_var(
                "LOGDNA_FREE_SOCKET_TIMEOUT",
                DEFAULT_FREE_SOCKET_TIMEOUT_MS,
            )),
            retry: RetryPolicy {
                max_attempts: positive_var("LOGDNA_MAX_REQUEST_RETRIES", DEFAULT_MAX_ATTEMPTS),
                base_interval: Duration::from_millis(positive_var(
                    "LOGDNA_REQUEST_RETRY_INTERVAL",
                    DEFAULT_RETRY_INTERVAL_MS,
                )),
            },
            max_concurrent_requests: positive_var(
                "LOGDNA_MAX_CONCURRENT_REQUESTS",
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            ),
        }
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(DEFAULT_HOSTNAME)
    }

    #[must_use]
    pub fn app(&self) -> &str {
        self.app.as_deref().unwrap_or(DEFAULT_APP)
    }

    #[must_use]
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LEVEL)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            key: None,
            hostname: None,
            tags: None,
            app: None,
            level: None,
            log_raw_event: false,
            user_agent: default_user_agent(),
            url: DEFAULT_URL.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            free_socket_timeout: Duration::from_millis(DEFAULT_FREE_SOCKET_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

// Keeps the ingestion key out of logs.
impl fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("hostname", &self.hostname)
            .field("tags", &self.tags)
            .field("app", &self.app)
            .field("level", &self.level)
            .field("log_raw_event", &self.log_raw_event)
            .field("user_agent", &self.user_agent)
            .field("url", &self.url)
            .field("request_timeout", &self.request_timeout)
            .field("free_socket_timeout", &self.free_socket_timeout)
            .field("retry", &self.retry)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.is_empty())
}

/// Unparseable or zero values fall back to the default.
fn positive_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialEq + Default,
{
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .filter(|val| *val != T::default())
        .unwrap_or(default)
}

fn parse_tags(raw: &str) -> Option<String> {
    let tags = raw
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<&str>>();
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

fn is_truthy_flag(raw: &str) -> bool {
    let val = raw.to_lowercase();
    val == "yes" || val == "true"
}
