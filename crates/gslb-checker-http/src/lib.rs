// # HTTP Health Checker
//
// This crate provides the HTTP health checker for the GSLB switcher.
//
// ## Protocol
//
// - The target URL is validated before any request is sent; a malformed URL
//   is a configuration error, not an unhealthy verdict
// - Up to `max_attempts` GET requests, each with its own timeout
// - The first 2xx answer is healthy and ends the check immediately
// - Any other status, or a transport failure, counts as a failed attempt
// - A fixed delay separates attempts; no backoff, no jitter
// - Redirects are not followed, so a 3xx answer is unhealthy
// - Response bodies are never read
//
// Worst-case latency is `max_attempts × request_timeout + (max_attempts - 1) × retry_delay`.

use gslb_core::config::HealthCheckConfig;
use gslb_core::traits::{HealthChecker, HealthVerdict};
use gslb_core::{Error, Result};

use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

/// Default number of attempts per check
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default timeout for a single attempt
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between a failed attempt and the next one
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Retry policy of a single health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckPolicy {
    /// Total number of attempts (at least one is always made)
    pub max_attempts: u32,
    /// Timeout for a single attempt
    pub request_timeout: Duration,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl HealthCheckPolicy {
    /// Build the policy from configuration
    pub fn from_config(config: &HealthCheckConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            request_timeout: config.request_timeout(),
            retry_delay: config.retry_delay(),
        }
    }

    /// Upper bound on how long one check can take
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.request_timeout * attempts + self.retry_delay * (attempts - 1)
    }
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// HTTP health checker for a single URL
#[derive(Debug, Clone)]
pub struct HttpHealthChecker {
    /// URL to probe
    url: String,

    /// Attempts, timeout and delay
    policy: HealthCheckPolicy,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpHealthChecker {
    /// Create a checker with the default policy (3 attempts, 5s timeout, 10s delay)
    ///
    /// The URL is not validated here; validation happens before every check.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_policy(url, HealthCheckPolicy::default())
    }

    /// Create a checker with a custom retry policy
    ///
    /// Fails if the HTTP client cannot be built with the per-attempt timeout
    /// and redirects disabled.
    pub fn with_policy(url: impl Into<String>, policy: HealthCheckPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::health_check(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            policy,
            client,
        })
    }

    /// Create a checker from configuration
    pub fn from_config(config: &HealthCheckConfig) -> Result<Self> {
        Self::with_policy(config.url.clone(), HealthCheckPolicy::from_config(config))
    }

    /// The configured URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured retry policy
    pub fn policy(&self) -> &HealthCheckPolicy {
        &self.policy
    }

    /// Parse the URL and make sure it can be probed over HTTP
    fn validate_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url).map_err(|e| {
            Error::config(format!("Invalid health check URL '{}': {}", self.url, e))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::config(format!(
                "Health check URL must use HTTP or HTTPS scheme. Got: {}",
                other
            ))),
        }
    }

    /// Send one GET request
    ///
    /// Returns the verdict detail and whether the answer was a success.
    async fn attempt(&self, url: &Url) -> (bool, String) {
        match self.client.get(url.clone()).send().await {
            // The response is dropped unread
            Ok(response) => {
                let status = response.status();
                (status.is_success(), status_line(status))
            }
            Err(e) => (false, error_chain(&e)),
        }
    }
}

#[async_trait::async_trait]
impl HealthChecker for HttpHealthChecker {
    async fn check_health(&self) -> Result<HealthVerdict> {
        let url = self.validate_url()?;
        let attempts = self.policy.max_attempts.max(1);

        let mut last_detail = String::new();

        for attempt in 1..=attempts {
            let (healthy, detail) = self.attempt(&url).await;

            if healthy {
                debug!(
                    "Health check {} healthy on attempt {}/{}: {}",
                    self.url, attempt, attempts, detail
                );
                return Ok(HealthVerdict::healthy(detail));
            }

            warn!(
                "Health check attempt {}/{} for {} failed: {}",
                attempt, attempts, self.url, detail
            );
            last_detail = detail;

            if attempt < attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        debug!(
            "Health check {} unhealthy after {} attempts: {}",
            self.url, attempts, last_detail
        );
        Ok(HealthVerdict::unhealthy(last_detail))
    }

    fn target(&self) -> &str {
        &self.url
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Status line in the form "503 Service Unavailable"
fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Error text including every source in the chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
