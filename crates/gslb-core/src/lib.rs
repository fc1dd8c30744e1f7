// # gslb-core
//
// Core library for DNS-based active/passive failover.
//
// ## Architecture Overview
//
// This library provides the core functionality for steering one DNS record
// between a primary and a secondary address:
// - **HealthChecker**: Trait for probing the primary endpoint
// - **GslbProvider**: Trait for reading and switching the managed record
// - **FailoverEvaluator**: One reconciliation cycle (verdict vs. record)
// - **Scheduler**: Runs the evaluator on a fixed interval until shutdown
// - **ProviderRegistry**: Plugin-based registry for GSLB providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic is separate from provider and checker implementations
// 2. **Provider is the Source of Truth**: The record is read fresh every cycle, never cached
// 3. **Idempotency**: A switch is only issued when the record differs from the desired target
// 4. **One Decision-Maker**: Evaluations are serialized; a failed cycle never stops the next one
// 5. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod evaluator;
pub mod scheduler;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{GslbProvider, HealthChecker, HealthVerdict};
pub use evaluator::{EvaluationOutcome, FailoverAction, FailoverEvaluator, FailoverTarget, FailoverTargets};
pub use scheduler::{Scheduler, SchedulerEvent, StopReason};
pub use registry::ProviderRegistry;
pub use config::{GslbConfig, HealthCheckConfig, ProviderConfig, SchedulerConfig};
pub use error::{Error, Result};
