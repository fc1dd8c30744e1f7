//! Failover evaluator
//!
//! The FailoverEvaluator runs one reconciliation cycle:
//! - Probe the primary via the HealthChecker
//! - Read the record's current address from the GslbProvider
//! - Issue at most one switch so the record serves the desired target
//!
//! ## Decision Flow
//!
//! ```text
//! ┌───────────────┐  verdict   ┌────────────────────┐  current_ip   ┌──────────────┐
//! │ HealthChecker │──────────▶│ FailoverEvaluator  │◀──────────────│ GslbProvider │
//! └───────────────┘            └────────────────────┘               └──────────────┘
//!                                       │  desired != current            ▲
//!                                       └────── switch_to_* ─────────────┘
//! ```
//!
//! Desired target is the primary when healthy, the secondary otherwise. The
//! evaluator never retries; the scheduler's next tick is the retry.

use crate::error::Result;
use crate::traits::{GslbProvider, HealthChecker, HealthVerdict};
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// One of the two addresses the managed record may serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailoverTarget {
    /// The address of the monitored service
    Primary,
    /// The standby address used while the primary is unhealthy
    Secondary,
}

impl FailoverTarget {
    /// The target the record should serve for a given health verdict
    pub fn for_health(healthy: bool) -> Self {
        if healthy {
            FailoverTarget::Primary
        } else {
            FailoverTarget::Secondary
        }
    }
}

impl fmt::Display for FailoverTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverTarget::Primary => f.write_str("primary"),
            FailoverTarget::Secondary => f.write_str("secondary"),
        }
    }
}

/// The primary and secondary addresses, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverTargets {
    primary: String,
    secondary: String,
}

impl FailoverTargets {
    /// Create the target pair
    ///
    /// No parsing happens here; [`GslbConfig::validate`](crate::GslbConfig::validate)
    /// is where malformed addresses are rejected at startup.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Primary address
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Secondary address
    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// Address for the given target
    pub fn ip(&self, target: FailoverTarget) -> &str {
        match target {
            FailoverTarget::Primary => &self.primary,
            FailoverTarget::Secondary => &self.secondary,
        }
    }
}

/// What an evaluation cycle did to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverAction {
    /// Record already served the desired target
    NoOp,
    /// Record was switched to the primary address
    SwitchedToPrimary,
    /// Record was switched to the secondary address
    SwitchedToSecondary,
}

impl FailoverAction {
    /// Whether the cycle wrote to the provider
    pub fn is_switch(&self) -> bool {
        !matches!(self, FailoverAction::NoOp)
    }
}

impl fmt::Display for FailoverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverAction::NoOp => f.write_str("no-op"),
            FailoverAction::SwitchedToPrimary => f.write_str("switched to primary"),
            FailoverAction::SwitchedToSecondary => f.write_str("switched to secondary"),
        }
    }
}

/// Result of one successful evaluation cycle
///
/// Cycle-scoped; used for logging and events, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    /// What was done to the record
    pub action: FailoverAction,
    /// The verdict that drove the decision
    pub verdict: HealthVerdict,
    /// Address the provider reported before any switch
    pub observed_ip: String,
    /// When the cycle finished
    pub evaluated_at: DateTime<Utc>,
}

/// Compare two addresses semantically
///
/// Both sides are parsed and compared in canonical form, so `2001:0DB8::1`
/// equals `2001:db8::1` and `::ffff:192.0.2.1` equals `192.0.2.1`. An
/// unparsable value on either side is never equal to anything.
pub fn ips_equal(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a.to_canonical() == b.to_canonical(),
        _ => false,
    }
}

/// Reconciles the primary's health against the provider's record
///
/// Holds the health checker and the target pair. The provider is passed to
/// each [`evaluate`](Self::evaluate) call and read fresh every time.
pub struct FailoverEvaluator {
    /// Probe for the primary endpoint
    checker: Box<dyn HealthChecker>,

    /// Primary and secondary addresses
    targets: FailoverTargets,
}

impl FailoverEvaluator {
    /// Create a new evaluator
    pub fn new(checker: Box<dyn HealthChecker>, targets: FailoverTargets) -> Self {
        Self { checker, targets }
    }

    /// The configured target pair
    pub fn targets(&self) -> &FailoverTargets {
        &self.targets
    }

    /// Run one evaluation cycle against `provider`
    ///
    /// The checker runs on every cycle, even when the record is already
    /// correct, so each cycle logs a fresh verdict.
    ///
    /// # Returns
    ///
    /// - `Ok(EvaluationOutcome)`: The record now serves the desired target
    /// - `Err(Error)`: Checker validation, provider read or provider write
    ///   failed. No switch is attempted after a checker or read failure.
    pub async fn evaluate(&self, provider: &dyn GslbProvider) -> Result<EvaluationOutcome> {
        let verdict = self
            .checker
            .check_health()
            .await
            .map_err(|e| e.context("checking primary health"))?;

        if !verdict.healthy {
            warn!("Primary health check failed: {}", verdict.detail);
        }

        let observed_ip = provider
            .current_ip()
            .await
            .map_err(|e| e.context("getting GSLB record IP"))?;

        let desired = FailoverTarget::for_health(verdict.healthy);
        let desired_ip = self.targets.ip(desired);

        let action = if ips_equal(&observed_ip, desired_ip) {
            debug!(
                "GSLB record already serves {} IP {}, nothing to do",
                desired, observed_ip
            );
            FailoverAction::NoOp
        } else {
            match desired {
                FailoverTarget::Primary => {
                    provider
                        .switch_to_primary()
                        .await
                        .map_err(|e| e.context("updating GSLB record to primary IP"))?;
                    info!(
                        "Switched GSLB record to primary IP: {} (was: {})",
                        desired_ip, observed_ip
                    );
                    FailoverAction::SwitchedToPrimary
                }
                FailoverTarget::Secondary => {
                    provider
                        .switch_to_secondary()
                        .await
                        .map_err(|e| e.context("updating GSLB record to secondary IP"))?;
                    info!(
                        "Switched GSLB record to secondary IP: {} (was: {})",
                        desired_ip, observed_ip
                    );
                    FailoverAction::SwitchedToSecondary
                }
            }
        };

        Ok(EvaluationOutcome {
            action,
            verdict,
            observed_ip,
            evaluated_at: Utc::now(),
        })
    }
}
