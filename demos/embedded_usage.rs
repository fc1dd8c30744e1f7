//! Minimal embedding example for gslb-core
//!
//! This example drives the failover scheduler with a custom health checker and
//! an in-memory provider. The scheduler lifecycle is fully managed by the
//! application.

use gslb_core::traits::{GslbProvider, HealthChecker, HealthVerdict};
use gslb_core::{FailoverEvaluator, FailoverTargets, Result, Scheduler, StopReason};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Health checker whose verdict the application flips by hand
struct ToggleChecker {
    healthy: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl HealthChecker for ToggleChecker {
    async fn check_health(&self) -> Result<HealthVerdict> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(HealthVerdict::healthy("200 OK"))
        } else {
            Ok(HealthVerdict::unhealthy("503 Service Unavailable"))
        }
    }

    fn target(&self) -> &str {
        "toggle://primary"
    }

    fn name(&self) -> &'static str {
        "toggle"
    }
}

/// In-memory record
struct EmbeddedProvider {
    record: Arc<Mutex<String>>,
    targets: FailoverTargets,
    switch_calls: Arc<AtomicUsize>,
}

impl EmbeddedProvider {
    fn set(&self, ip: &str) {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] Record -> {}", ip);
        *self.record.lock().unwrap_or_else(|p| p.into_inner()) = ip.to_string();
    }
}

#[async_trait::async_trait]
impl GslbProvider for EmbeddedProvider {
    async fn current_ip(&self) -> Result<String> {
        Ok(self.record.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    async fn switch_to_primary(&self) -> Result<()> {
        self.set(self.targets.primary());
        Ok(())
    }

    async fn switch_to_secondary(&self) -> Result<()> {
        self.set(self.targets.secondary());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded gslb-core Example ===\n");

    let targets = FailoverTargets::new("192.0.2.10", "198.51.100.20");
    let healthy = Arc::new(AtomicBool::new(true));
    let record = Arc::new(Mutex::new(targets.primary().to_string()));
    let switch_calls = Arc::new(AtomicUsize::new(0));

    let checker = ToggleChecker {
        healthy: healthy.clone(),
    };
    let provider = EmbeddedProvider {
        record: record.clone(),
        targets: targets.clone(),
        switch_calls: switch_calls.clone(),
    };

    println!("1. Creating scheduler...");
    let evaluator = FailoverEvaluator::new(Box::new(checker), targets);
    let (scheduler, mut event_rx) = Scheduler::new(
        evaluator,
        Box::new(provider),
        Duration::from_millis(50),
        100,
    )?;

    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    println!("3. Starting scheduler in background...");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_handle = tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\n4. Primary goes down");
    healthy.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\n5. Primary recovers");
    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\n6. Stopping scheduler...");
    let _ = shutdown_tx.send(StopReason::Cancelled);
    let reason = scheduler_handle.await.unwrap_or(StopReason::Cancelled);

    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n7. Scheduler stopped: {}", reason);
    println!(
        "   Record: {}, switches: {}",
        record.lock().unwrap_or_else(|p| p.into_inner()),
        switch_calls.load(Ordering::SeqCst)
    );
    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Scheduler lifecycle is fully controlled by application");
    println!("- Only the failover and the recovery wrote to the record");
    println!("- All components are custom (not gslbd defaults)");

    Ok(())
}
