use std::sync::Arc;

use threebody_models::{ActionOutcome, Decision};
use tracing::{info, warn};

use crate::execution::Executor;

/// Decides whether a decision warrants an on-chain action and runs it.
///
/// Never fails: HOLD skips execution, and executor errors are logged and
/// reported as "not taken".
pub struct ActionGate {
    executor: Option<Arc<dyn Executor>>,
    voters: Vec<String>,
}

impl ActionGate {
    pub fn new(executor: Option<Arc<dyn Executor>>, voters: Vec<String>) -> Self {
        Self { executor, voters }
    }

    pub fn voters(&self) -> &[String] {
        &self.voters
    }

    pub async fn evaluate(&self, decision: &Decision) -> ActionOutcome {
        if decision.action.is_hold() {
            info!(agent = %decision.agent, "HOLD, no action taken");
            return ActionOutcome::not_taken();
        }

        let Some(executor) = &self.executor else {
            warn!(action = %decision.action, "No executor configured, action not taken");
            return ActionOutcome::not_taken();
        };

        match executor.submit(decision, &self.voters).await {
            Ok(receipt) => {
                info!(
                    executor = executor.name(),
                    action = %decision.action,
                    reference = %receipt.reference,
                    "Action executed"
                );
                ActionOutcome::executed(receipt.reference)
            }
            Err(e) => {
                warn!(
                    executor = executor.name(),
                    action = %decision.action,
                    error = %e,
                    "Execution failed, action not taken"
                );
                ActionOutcome::not_taken()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockExecutor;
    use rust_decimal_macros::dec;
    use threebody_models::TradeAction;

    fn voters() -> Vec<String> {
        vec!["Chad".to_string(), "Atlas".to_string()]
    }

    fn decision(action: TradeAction) -> Decision {
        Decision::new("Atlas", action, dec!(0.2), "because", "BTC/USDT")
    }

    #[tokio::test]
    async fn hold_skips_executor() {
        let executor = Arc::new(MockExecutor::succeeding("0xabc"));
        let gate = ActionGate::new(Some(executor.clone()), voters());

        let outcome = gate.evaluate(&decision(TradeAction::Hold)).await;
        assert_eq!(outcome, ActionOutcome::not_taken());
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn buy_and_sell_are_executed() {
        let executor = Arc::new(MockExecutor::succeeding("0xabc"));
        let gate = ActionGate::new(Some(executor.clone()), voters());

        for action in [TradeAction::Buy, TradeAction::Sell] {
            let outcome = gate.evaluate(&decision(action)).await;
            assert!(outcome.action_taken);
            assert_eq!(outcome.reference.as_deref(), Some("0xabc"));
        }
        assert_eq!(executor.calls(), 2);
        assert_eq!(executor.last_voters(), voters());
    }

    #[tokio::test]
    async fn executor_failure_is_absorbed() {
        let executor = Arc::new(MockExecutor::failing());
        let gate = ActionGate::new(Some(executor.clone()), voters());

        let outcome = gate.evaluate(&decision(TradeAction::Buy)).await;
        assert!(!outcome.action_taken);
        assert_eq!(outcome.reference, None);
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn missing_executor_means_not_taken() {
        let gate = ActionGate::new(None, voters());
        let outcome = gate.evaluate(&decision(TradeAction::Sell)).await;
        assert!(!outcome.action_taken);
    }
}
