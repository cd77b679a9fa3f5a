use std::sync::Arc;
use std::time::Duration;

use threebody_models::AgentConfig;
use tokio_util::sync::CancellationToken;

use crate::controller::{CycleController, CycleReport};
use crate::error::CycleError;

/// Pauses between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub interval: Duration,
    /// Used instead of `interval` after a cycle task panics.
    pub recovery_interval: Duration,
}

impl LoopConfig {
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_seconds),
            recovery_interval: Duration::from_secs(config.recovery_interval_seconds),
        }
    }
}

/// Counts kept by the outer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
}

/// The agent daemon. Runs cycles back to back until cancelled.
pub struct Daemon {
    controller: Arc<CycleController>,
    loop_config: LoopConfig,
    cancel: CancellationToken,
}

impl Daemon {
    pub fn new(controller: CycleController, loop_config: LoopConfig) -> Self {
        Self {
            controller: Arc::new(controller),
            loop_config,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run exactly one cycle in its own task.
    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        let controller = self.controller.clone();
        tokio::spawn(async move { controller.run_cycle().await })
            .await
            .map_err(|e| CycleError::Panicked(e.to_string()))
    }

    /// Run until cancelled. Cancellation is checked between cycles, never
    /// inside one.
    pub async fn run(&self) -> RunSummary {
        tracing::info!(
            asset = self.controller.asset(),
            interval_secs = self.loop_config.interval.as_secs(),
            "Three-body agent starting"
        );

        let mut summary = RunSummary::default();

        while !self.cancel.is_cancelled() {
            summary.cycles += 1;
            let pause = match self.run_once().await {
                Ok(report) => {
                    if report.is_done() {
                        summary.completed += 1;
                    } else {
                        summary.failed += 1;
                    }
                    self.loop_config.interval
                }
                Err(e) => {
                    summary.panicked += 1;
                    tracing::error!(
                        error = %e,
                        retry_in_secs = self.loop_config.recovery_interval.as_secs(),
                        "Cycle escaped its boundary, backing off"
                    );
                    self.loop_config.recovery_interval
                }
            };

            tracing::debug!(pause_ms = pause.as_millis() as u64, "Sleeping until next cycle");
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Cycle loop shutting down");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(
            cycles = summary.cycles,
            completed = summary.completed,
            failed = summary.failed,
            panicked = summary.panicked,
            "Three-body agent stopped"
        );
        summary
    }
}
