// # OPNsense Provider Validation Tool
//
// Exercises the OPNsense provider against a real firewall: resolves the host
// override, reads the served address and optionally switches it.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// OPNSENSE_HOST=https://fw.example.com \
// OPNSENSE_AUTH=key:secret \
// GSLB_HOST=app.example.com \
// GSLB_PRIMARY_IP=192.0.2.10 \
// GSLB_SECONDARY_IP=198.51.100.20 \
// GSLB_SWITCH_TO=secondary \
// cargo run -p gslb-demos --bin opnsense_validation
//
// # Live mode (makes actual changes!)
// GSLB_MODE=live ... cargo run -p gslb-demos --bin opnsense_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `OPNSENSE_HOST`, `OPNSENSE_AUTH`
// - `GSLB_HOST`, `GSLB_PRIMARY_IP`, `GSLB_SECONDARY_IP`
//
// Optional:
// - `GSLB_SWITCH_TO`: "primary" or "secondary" (default: read only)
// - `GSLB_MODE`: "dry-run" or "live" (default: dry-run)

use gslb_core::traits::GslbProvider;
use gslb_core::FailoverTargets;
use gslb_provider_opnsense::OpnSenseProvider;
use std::env;

fn required(key: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            tracing::error!("{} environment variable is required", key);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== OPNsense Provider Validation ===");

    let endpoint = required("OPNSENSE_HOST");
    let auth = required("OPNSENSE_AUTH");
    let host = required("GSLB_HOST");
    let targets = FailoverTargets::new(required("GSLB_PRIMARY_IP"), required("GSLB_SECONDARY_IP"));
    let dry_run = env::var("GSLB_MODE").unwrap_or_else(|_| "dry-run".to_string()) != "live";

    if dry_run {
        tracing::info!("Mode: DRY-RUN (no changes will be made)");
    } else {
        tracing::warn!("Mode: LIVE (the host override WILL be modified)");
    }

    let provider = OpnSenseProvider::connect(endpoint, auth, host, targets, dry_run).await?;
    tracing::info!("Resolved host override {}", provider.record_uuid());

    let before = provider.current_ip().await?;
    tracing::info!("Currently served: {}", before);

    match env::var("GSLB_SWITCH_TO").ok().as_deref() {
        Some("primary") => provider.switch_to_primary().await?,
        Some("secondary") => provider.switch_to_secondary().await?,
        Some(other) => {
            tracing::error!("GSLB_SWITCH_TO must be primary or secondary. Got: {}", other);
            std::process::exit(1);
        }
        None => {
            tracing::info!("No switch requested");
            return Ok(());
        }
    }

    let after = provider.current_ip().await?;
    tracing::info!("Served after switch: {} (was: {})", after, before);
    tracing::info!("=== Validation Complete ===");

    Ok(())
}
