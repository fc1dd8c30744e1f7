//! Configuration types for the GSLB switcher
//!
//! This module defines all configuration structures used throughout the crate.
//! Configuration is an explicit, immutable value handed to constructors; the
//! core never reads process environment itself.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::evaluator::{FailoverTargets, ips_equal};

/// Main GSLB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GslbConfig {
    /// Name of the managed host-override record (e.g. "app.example.com")
    pub host: String,

    /// Address served while the primary is healthy
    pub primary_ip: String,

    /// Address served while the primary is unhealthy
    pub secondary_ip: String,

    /// Health check settings for the primary
    pub health_check: HealthCheckConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Optional scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl GslbConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.trim().is_empty() {
            return Err(crate::Error::config("GSLB host cannot be empty"));
        }

        validate_ip("primary", &self.primary_ip)?;
        validate_ip("secondary", &self.secondary_ip)?;

        if ips_equal(&self.primary_ip, &self.secondary_ip) {
            return Err(crate::Error::config(format!(
                "Primary and secondary IP are the same address: {}",
                self.primary_ip
            )));
        }

        self.health_check.validate()?;
        self.provider.validate()?;
        self.scheduler.validate()?;

        Ok(())
    }

    /// The primary/secondary pair for the evaluator and provider
    pub fn targets(&self) -> FailoverTargets {
        FailoverTargets::new(self.primary_ip.clone(), self.secondary_ip.clone())
    }
}

fn validate_ip(which: &str, value: &str) -> Result<(), crate::Error> {
    value.parse::<IpAddr>().map(|_| ()).map_err(|_| {
        crate::Error::config(format!("Invalid {} IP address: '{}'", which, value))
    })
}

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// URL probed with HTTP GET
    pub url: String,

    /// Total number of attempts per check
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout for a single attempt (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fixed delay between a failed attempt and the next one (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl HealthCheckConfig {
    /// Create a health check configuration with the default retry policy
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }

    /// Validate the health check configuration
    ///
    /// The URL itself is only checked for presence here. Syntax is checked
    /// by the checker before every probe.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("Health check URL cannot be empty"));
        }
        if self.max_attempts == 0 {
            return Err(crate::Error::config("Health check attempts must be >= 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Health check timeout must be > 0"));
        }
        Ok(())
    }

    /// Timeout for a single attempt
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Delay between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// OPNsense Unbound host override
    #[serde(rename = "opnsense")]
    OpnSense {
        /// Base URL of the firewall API (e.g. "https://fw.example.com")
        endpoint: String,
        /// API credentials as "key:secret"
        auth: String,
        /// Log intended writes instead of sending them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::OpnSense { endpoint, auth, .. } => {
                if endpoint.is_empty() {
                    return Err(crate::Error::config("OPNsense endpoint cannot be empty"));
                }
                if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "OPNsense endpoint must use HTTP or HTTPS scheme. Got: {}",
                        endpoint
                    )));
                }
                if auth.is_empty() {
                    return Err(crate::Error::config("OPNsense auth cannot be empty"));
                }
                if !auth.contains(':') {
                    return Err(crate::Error::config(
                        "OPNsense auth must have the form key:secret",
                    ));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::OpnSense { .. } => "opnsense",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Time between evaluation cycles (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the scheduler event channel
    ///
    /// When full, events are dropped rather than blocking the loop.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Scheduler interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Time between evaluation cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}
