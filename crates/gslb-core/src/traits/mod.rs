//! Core traits for the GSLB switcher
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`HealthChecker`]: Probe the primary endpoint and produce a verdict
//! - [`GslbProvider`]: Read and steer the managed DNS record

pub mod health_checker;
pub mod gslb_provider;

pub use health_checker::{HealthChecker, HealthVerdict};
pub use gslb_provider::{GslbProvider, GslbProviderFactory};
