// # Health Checker Trait
//
// Defines the interface for probing the primary endpoint.
//
// ## Implementations
//
// - HTTP probe with bounded retries: `gslb-checker-http` crate
//
// ## Usage
//
// ```rust,ignore
// use gslb_core::HealthChecker;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let checker = /* HealthChecker implementation */;
//
//     let verdict = checker.check_health().await?;
//     println!("healthy={} ({})", verdict.healthy, verdict.detail);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// Outcome of a single health check
///
/// Produced fresh by every call to [`HealthChecker::check_health`] and never
/// cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    /// Whether the target answered with a success status
    pub healthy: bool,
    /// Last HTTP status line or transport error text
    pub detail: String,
}

impl HealthVerdict {
    /// A healthy verdict
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
        }
    }

    /// An unhealthy verdict
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.healthy { "healthy" } else { "unhealthy" };
        write!(f, "{} ({})", state, self.detail)
    }
}

/// Trait for health checker implementations
///
/// # Error Semantics
///
/// The two failure modes are deliberately kept apart:
///
/// - The target is unreachable or answers with a non-success status: this is
///   an expected outcome. Return `Ok(HealthVerdict::unhealthy(..))`.
/// - The checker itself is misconfigured (e.g. the URL does not parse): return
///   `Err(Error)` before any network call is made.
///
/// # Retries
///
/// Unlike providers, checkers own their retry policy. Retrying inside a single
/// check absorbs transient blips without flapping the DNS record.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Probe the target and return a verdict
    ///
    /// # Returns
    ///
    /// - `Ok(HealthVerdict)`: The probe ran (healthy or not)
    /// - `Err(Error)`: Pre-flight validation failed, no probe was sent
    async fn check_health(&self) -> Result<HealthVerdict, crate::Error>;

    /// What this checker probes (for logging)
    fn target(&self) -> &str;

    /// Get the checker name (for logging/debugging)
    fn name(&self) -> &'static str;
}
