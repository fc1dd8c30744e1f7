// # gslbd - GSLB Switcher Daemon
//
// Thin integration layer: reads configuration from the environment, wires
// the health checker, provider and scheduler together, and runs until
// SIGTERM or SIGINT. All failover logic lives in gslb-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Managed record
// - `GSLB_HOST`: Name of the Unbound host override to steer
// - `GSLB_PRIMARY_IP`: Address served while the primary is healthy
// - `GSLB_PRIMARY_CHECK`: HTTP(S) URL probed to judge the primary
// - `GSLB_SECONDARY_IP`: Address served while the primary is unhealthy
//
// ### OPNsense
// - `OPNSENSE_HOST`: Base URL of the firewall API
// - `OPNSENSE_AUTH`: API credentials as `key:secret`
//
// ### Daemon
// - `GSLB_INTERVAL_SECS`: Seconds between evaluation cycles (default: 60)
// - `GSLB_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `GSLB_MODE`: `live` or `dry-run` (default: live)
//
// ## Example
//
// ```bash
// export GSLB_HOST=app.example.com
// export GSLB_PRIMARY_IP=192.0.2.10
// export GSLB_PRIMARY_CHECK=https://192.0.2.10/healthz
// export GSLB_SECONDARY_IP=198.51.100.20
// export OPNSENSE_HOST=https://fw.example.com
// export OPNSENSE_AUTH=key:secret
//
// gslbd
// ```

use anyhow::{Result, anyhow};
use gslb_checker_http::HttpHealthChecker;
use gslb_core::{
    FailoverEvaluator, GslbConfig, HealthCheckConfig, ProviderConfig, ProviderRegistry,
    Scheduler, SchedulerConfig, SchedulerEvent, StopReason,
};
use std::env;
use std::future::Future;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default seconds between evaluation cycles
const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GslbdExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<GslbdExitCode> for ExitCode {
    fn from(code: GslbdExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    host: String,
    primary_ip: String,
    primary_check: String,
    secondary_ip: String,
    opnsense_host: String,
    opnsense_auth: String,
    interval_secs: u64,
    log_level: String,
    dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("{} is required. Set it via: export {}=...", key, key))
        };

        let interval_secs = match lookup("GSLB_INTERVAL_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                anyhow!(
                    "GSLB_INTERVAL_SECS must be a whole number of seconds. Got: {}",
                    value
                )
            })?,
            None => DEFAULT_INTERVAL_SECS,
        };

        let dry_run = match lookup("GSLB_MODE")
            .unwrap_or_else(|| "live".to_string())
            .to_lowercase()
            .as_str()
        {
            "live" => false,
            "dry-run" => true,
            other => anyhow::bail!(
                "GSLB_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        Ok(Self {
            host: required("GSLB_HOST")?,
            primary_ip: required("GSLB_PRIMARY_IP")?,
            primary_check: required("GSLB_PRIMARY_CHECK")?,
            secondary_ip: required("GSLB_SECONDARY_IP")?,
            opnsense_host: required("OPNSENSE_HOST")?,
            opnsense_auth: required("OPNSENSE_AUTH")?,
            interval_secs,
            log_level: lookup("GSLB_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            dry_run,
        })
    }

    /// Validate the configuration
    ///
    /// Address, URL and interval checks are delegated to [`GslbConfig::validate`].
    fn validate(&self) -> Result<()> {
        log_level(&self.log_level)?;

        if !self.opnsense_auth.contains(':') {
            anyhow::bail!("OPNSENSE_AUTH must have the form key:secret (value masked)");
        }

        self.to_gslb_config()
            .validate()
            .map_err(|e| anyhow!("{}", e))
    }

    fn to_gslb_config(&self) -> GslbConfig {
        GslbConfig {
            host: self.host.clone(),
            primary_ip: self.primary_ip.clone(),
            secondary_ip: self.secondary_ip.clone(),
            health_check: HealthCheckConfig::new(self.primary_check.clone()),
            provider: ProviderConfig::OpnSense {
                endpoint: self.opnsense_host.clone(),
                auth: self.opnsense_auth.clone(),
                dry_run: self.dry_run,
            },
            scheduler: SchedulerConfig {
                interval_secs: self.interval_secs,
                ..SchedulerConfig::default()
            },
        }
    }
}

fn log_level(name: &str) -> Result<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "GSLB_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            name
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return GslbdExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return GslbdExitCode::ConfigError.into();
    }

    // Initialize tracing
    let level = log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return GslbdExitCode::ConfigError.into();
    }

    info!("Starting gslbd daemon");
    info!(
        "Managing {} (primary: {}, secondary: {}, check: {})",
        config.host, config.primary_ip, config.secondary_ip, config.primary_check
    );
    info!("OPNsense endpoint: {} (auth: masked)", config.opnsense_host);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return GslbdExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config.to_gslb_config())).into()
}

/// Run the daemon
async fn run_daemon(config: GslbConfig) -> GslbdExitCode {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "opnsense")]
    {
        info!("Registering OPNsense provider");
        gslb_provider_opnsense::register(&registry);
    }

    let targets = config.targets();

    let provider = match registry
        .create_provider(&config.provider, &config.host, &targets)
        .await
    {
        Ok(provider) => provider,
        Err(e) => {
            error!("Error creating GSLB provider: {}", e);
            return GslbdExitCode::ConfigError;
        }
    };

    let checker = match HttpHealthChecker::from_config(&config.health_check) {
        Ok(checker) => checker,
        Err(e) => {
            error!("Failed to create health checker: {}", e);
            return GslbdExitCode::RuntimeError;
        }
    };
    let evaluator = FailoverEvaluator::new(Box::new(checker), targets);

    let (scheduler, events) = match Scheduler::from_config(evaluator, provider, &config.scheduler)
    {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to create scheduler: {}", e);
            return GslbdExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("Shutdown error: {}", e);
            return GslbdExitCode::RuntimeError;
        }
    };

    tokio::spawn(log_events(events));

    let reason = scheduler.run_until(shutdown).await;
    info!("Shutting down gracefully ({})", reason);

    GslbdExitCode::CleanShutdown
}

/// Consume scheduler events so the channel never fills
async fn log_events(mut events: mpsc::Receiver<SchedulerEvent>) {
    let mut consecutive_failures: u32 = 0;

    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::CycleFailed { .. } => {
                consecutive_failures += 1;
                if consecutive_failures > 1 {
                    warn!("{} consecutive evaluation cycles failed", consecutive_failures);
                }
            }
            SchedulerEvent::CycleCompleted { outcome } => {
                if consecutive_failures > 0 {
                    info!(
                        "Evaluation recovered after {} failed cycle(s)",
                        consecutive_failures
                    );
                }
                consecutive_failures = 0;
                debug!("Cycle completed: {}", outcome.action);
            }
            other => debug!("Scheduler event: {:?}", other),
        }
    }
}

/// Install SIGTERM and SIGINT handlers
///
/// Handlers are installed before returning so a signal that arrives while the
/// first cycle is pending is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = StopReason>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => StopReason::Signal("SIGTERM"),
            _ = sigint.recv() => StopReason::Signal("SIGINT"),
        }
    })
}

/// Install a CTRL-C handler
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = StopReason>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => StopReason::Signal("SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                StopReason::Cancelled
            }
        }
    })
}
