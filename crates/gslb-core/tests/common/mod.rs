//! Test doubles and common utilities for failover contract tests
//!
//! These doubles record every call so tests can assert on exactly which
//! provider operations an evaluation issued.

#![allow(dead_code)]

use gslb_core::error::{Error, Result};
use gslb_core::traits::{GslbProvider, HealthChecker, HealthVerdict};
use gslb_core::{FailoverEvaluator, FailoverTargets};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PRIMARY_IP: &str = "10.0.1.1";
pub const SECONDARY_IP: &str = "20.0.2.2";

/// One scripted answer of a [`ScriptedChecker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Healthy,
    Unhealthy,
    Misconfigured,
}

/// A health checker that replays a fixed script of answers
///
/// The last answer repeats once the script is exhausted.
#[derive(Clone)]
pub struct ScriptedChecker {
    script: Arc<Mutex<VecDeque<Probe>>>,
    last: Arc<Mutex<Probe>>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl ScriptedChecker {
    pub fn new(script: impl IntoIterator<Item = Probe>) -> Self {
        let script: VecDeque<Probe> = script.into_iter().collect();
        let last = script.back().copied().unwrap_or(Probe::Healthy);
        Self {
            script: Arc::new(Mutex::new(script)),
            last: Arc::new(Mutex::new(last)),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn always(probe: Probe) -> Self {
        Self::new([probe])
    }

    /// Make every check take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times check_health() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HealthChecker for ScriptedChecker {
    async fn check_health(&self) -> Result<HealthVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let probe = {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(probe) => {
                    *self.last.lock().unwrap() = probe;
                    probe
                }
                None => *self.last.lock().unwrap(),
            }
        };

        match probe {
            Probe::Healthy => Ok(HealthVerdict::healthy("200 OK")),
            Probe::Unhealthy => Ok(HealthVerdict::unhealthy("503 Service Unavailable")),
            Probe::Misconfigured => Err(Error::config("invalid health check URL")),
        }
    }

    fn target(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Provider operations recorded by [`MockGslbProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    Read,
    SwitchToPrimary,
    SwitchToSecondary,
}

/// An in-memory provider that tracks calls
///
/// Clones share state, so a test keeps one handle while the evaluator or
/// scheduler owns another.
#[derive(Clone)]
pub struct MockGslbProvider {
    current_ip: Arc<Mutex<String>>,
    targets: FailoverTargets,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockGslbProvider {
    pub fn at(current_ip: &str) -> Self {
        Self {
            current_ip: Arc::new(Mutex::new(current_ip.to_string())),
            targets: targets(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_reads: Arc::new(Mutex::new(false)),
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing_reads(self) -> Self {
        *self.fail_reads.lock().unwrap() = true;
        self
    }

    pub fn failing_writes(self) -> Self {
        *self.fail_writes.lock().unwrap() = true;
        self
    }

    pub fn set_current_ip(&self, ip: &str) {
        *self.current_ip.lock().unwrap() = ip.to_string();
    }

    pub fn current(&self) -> String {
        self.current_ip.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.count(ProviderCall::Read)
    }

    /// Number of switch calls of either kind
    pub fn write_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call != ProviderCall::Read)
            .count()
    }

    pub fn count(&self, kind: ProviderCall) -> usize {
        self.calls().iter().filter(|call| **call == kind).count()
    }

    fn switch(&self, call: ProviderCall, ip: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::provider("mock", "setHostOverride rejected"));
        }
        *self.current_ip.lock().unwrap() = ip.to_string();
        Ok(())
    }
}

#[async_trait::async_trait]
impl GslbProvider for MockGslbProvider {
    async fn current_ip(&self) -> Result<String> {
        self.calls.lock().unwrap().push(ProviderCall::Read);
        if *self.fail_reads.lock().unwrap() {
            return Err(Error::record(
                "host override record has no A or AAAA record selected",
            ));
        }
        Ok(self.current())
    }

    async fn switch_to_primary(&self) -> Result<()> {
        let ip = self.targets.primary().to_string();
        self.switch(ProviderCall::SwitchToPrimary, &ip)
    }

    async fn switch_to_secondary(&self) -> Result<()> {
        let ip = self.targets.secondary().to_string();
        self.switch(ProviderCall::SwitchToSecondary, &ip)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn targets() -> FailoverTargets {
    FailoverTargets::new(PRIMARY_IP, SECONDARY_IP)
}

pub fn evaluator(checker: &ScriptedChecker) -> FailoverEvaluator {
    FailoverEvaluator::new(Box::new(checker.clone()), targets())
}
