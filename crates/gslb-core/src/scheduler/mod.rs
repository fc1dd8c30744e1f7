//! Evaluation scheduler
//!
//! The Scheduler drives the [`FailoverEvaluator`] on a fixed cadence until a
//! shutdown future resolves.
//!
//! ## Lifecycle
//!
//! 1. Create with [`Scheduler::new()`] (returns an event receiver)
//! 2. Start with [`Scheduler::run()`] (stops on Ctrl-C), [`Scheduler::run_until()`]
//!    or [`Scheduler::run_with_shutdown()`]
//! 3. One evaluation per tick; failed cycles are logged and skipped
//! 4. Returns the [`StopReason`] once shutdown fires
//!
//! ## Cadence
//!
//! The first cycle runs one interval after start. Ticks are spaced one
//! interval apart; a cycle that overruns delays the next tick instead of
//! causing a burst of catch-up cycles.
//!
//! ## Cancellation
//!
//! Shutdown is observed between cycles only. An in-flight evaluation,
//! including the health checker's retry sleeps, always runs to completion.

use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::evaluator::{EvaluationOutcome, FailoverEvaluator};
use crate::traits::GslbProvider;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Why the scheduler stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// An OS signal was received
    Signal(&'static str),
    /// The shutdown handle fired or was dropped
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal(name) => write!(f, "received {}", name),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started
    Started {
        interval: Duration,
    },

    /// An evaluation cycle completed
    CycleCompleted {
        outcome: EvaluationOutcome,
    },

    /// An evaluation cycle failed; the next tick will try again
    CycleFailed {
        error: String,
    },

    /// Scheduler stopped
    Stopped {
        reason: StopReason,
    },
}

/// Periodic driver for the failover evaluator
///
/// Evaluations are strictly serialized: the loop awaits each cycle before it
/// looks at the ticker again, so no two cycles ever touch the record at once.
pub struct Scheduler {
    /// Decision logic
    evaluator: FailoverEvaluator,

    /// Provider owning the managed record
    provider: Box<dyn GslbProvider>,

    /// Time between ticks
    interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `evaluator`: The failover evaluator to drive
    /// - `provider`: Provider implementation for the managed record
    /// - `interval`: Time between evaluation cycles (must be non-zero)
    /// - `event_channel_capacity`: Bound of the event channel (must be non-zero)
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        evaluator: FailoverEvaluator,
        provider: Box<dyn GslbProvider>,
        interval: Duration,
        event_channel_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        if interval.is_zero() {
            return Err(Error::config("Scheduler interval must be > 0"));
        }
        if event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(event_channel_capacity);

        let scheduler = Self {
            evaluator,
            provider,
            interval,
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    /// Create a new scheduler from [`SchedulerConfig`]
    pub fn from_config(
        evaluator: FailoverEvaluator,
        provider: Box<dyn GslbProvider>,
        config: &SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        Self::new(
            evaluator,
            provider,
            config.interval(),
            config.event_channel_capacity,
        )
    }

    /// Time between evaluation cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until Ctrl-C
    ///
    /// If the signal handler cannot be installed the scheduler stops right
    /// away with [`StopReason::Cancelled`].
    pub async fn run(&self) -> StopReason {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => StopReason::Signal("SIGINT"),
                Err(e) => {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    StopReason::Cancelled
                }
            }
        })
        .await
    }

    /// Run until `shutdown` resolves
    ///
    /// A failing cycle never stops the loop. The only way out is the
    /// shutdown future, whose output is returned.
    pub async fn run_until<F>(&self, shutdown: F) -> StopReason
    where
        F: Future<Output = StopReason>,
    {
        self.emit_event(SchedulerEvent::Started {
            interval: self.interval,
        });
        info!(
            "GSLB scheduler started (provider={}, interval={:?})",
            self.provider.provider_name(),
            self.interval
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(ticker);

        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                biased;

                reason = &mut shutdown => break reason,

                Some(_) = ticks.next() => {
                    // Errors are already logged and emitted by run_once
                    let _ = self.run_once().await;
                }
            }
        };

        info!("GSLB scheduler stopped: {}", reason);
        self.emit_event(SchedulerEvent::Stopped {
            reason: reason.clone(),
        });

        reason
    }

    /// Run until the oneshot fires or its sender is dropped
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<StopReason>) -> StopReason {
        self.run_until(async move { shutdown_rx.await.unwrap_or(StopReason::Cancelled) })
            .await
    }

    /// Run exactly one evaluation cycle
    ///
    /// The outcome is logged and emitted as an event either way.
    pub async fn run_once(&self) -> Result<EvaluationOutcome> {
        match self.evaluator.evaluate(self.provider.as_ref()).await {
            Ok(outcome) => {
                debug!(
                    "GSLB evaluation finished: {} (verdict: {}, observed: {})",
                    outcome.action, outcome.verdict, outcome.observed_ip
                );
                self.emit_event(SchedulerEvent::CycleCompleted {
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!("Error during GSLB evaluation: {}", e);
                self.emit_event(SchedulerEvent::CycleFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        // Never block the loop on a slow consumer
        if self.event_tx.try_send(event).is_err() {
            debug!("Event channel full or closed, dropping scheduler event");
        }
    }
}
