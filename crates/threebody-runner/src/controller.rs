use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use threebody_agents::{parse_decision, FallbackRule, ReasoningClient};
use threebody_models::{CycleOutcome, DashboardRecord, Decision, DecisionSource, MarketSnapshot};
use threebody_state::StateStore;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::CycleError;
use crate::gate::ActionGate;
use crate::notify::FanOut;
use crate::sources::MarketDataProvider;

/// Stages of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Sensing,
    Thinking,
    Gating,
    Persisting,
    Done,
    CycleFailed,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Sensing => "SENSING",
            CycleState::Thinking => "THINKING",
            CycleState::Gating => "GATING",
            CycleState::Persisting => "PERSISTING",
            CycleState::Done => "DONE",
            CycleState::CycleFailed => "CYCLE_FAILED",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a cycle ended. A failed cycle names the stage it died in and carries
/// no outcome.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub state: CycleState,
    pub failed_stage: Option<CycleState>,
    pub outcome: Option<CycleOutcome>,
}

impl CycleReport {
    pub fn is_done(&self) -> bool {
        self.state == CycleState::Done
    }
}

/// Drives one cycle from sensing to persistence.
pub struct CycleController {
    asset: String,
    market: Arc<dyn MarketDataProvider>,
    reasoning: Option<ReasoningClient>,
    fallback: FallbackRule,
    gate: ActionGate,
    fan_out: FanOut,
    store: Arc<dyn StateStore>,
}

impl CycleController {
    pub fn new(
        asset: impl Into<String>,
        market: Arc<dyn MarketDataProvider>,
        gate: ActionGate,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            asset: asset.into(),
            market,
            reasoning: None,
            fallback: FallbackRule::default(),
            gate,
            fan_out: FanOut::default(),
            store,
        }
    }

    /// `None` leaves reasoning unavailable, so every cycle uses the fallback rule.
    pub fn with_reasoning(mut self, reasoning: Option<ReasoningClient>) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackRule) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Run one cycle. Errors are logged here and end the cycle in
    /// `CYCLE_FAILED`; they are never returned.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", %cycle_id, asset = %self.asset);

        async {
            info!("Cycle starting");
            let mut stage = CycleState::Sensing;
            match self.advance(cycle_id, &mut stage).await {
                Ok(outcome) => {
                    info!(
                        action = %outcome.decision.action,
                        agent = %outcome.decision.agent,
                        action_taken = outcome.action_taken,
                        "Cycle complete"
                    );
                    CycleReport {
                        cycle_id,
                        state: CycleState::Done,
                        failed_stage: None,
                        outcome: Some(outcome),
                    }
                }
                Err(e) => {
                    error!(stage = %stage, error = %e, "Cycle failed");
                    CycleReport {
                        cycle_id,
                        state: CycleState::CycleFailed,
                        failed_stage: Some(stage),
                        outcome: None,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn advance(
        &self,
        cycle_id: Uuid,
        stage: &mut CycleState,
    ) -> Result<CycleOutcome, CycleError> {
        *stage = CycleState::Sensing;
        let snapshot = self.market.fetch(&self.asset).await?;
        info!(
            stage = %stage,
            provider = self.market.name(),
            price = %snapshot.price,
            rsi = ?snapshot.rsi_14,
            sentiment = %snapshot.sentiment,
            "Snapshot acquired"
        );

        *stage = CycleState::Thinking;
        let (decision, source) = self.think(&snapshot).await;
        info!(
            stage = %stage,
            action = %decision.action,
            agent = %decision.agent,
            fraction = %decision.fraction,
            source = ?source,
            reason = %decision.rationale,
            "Decision reached"
        );

        *stage = CycleState::Gating;
        let action = self.gate.evaluate(&decision).await;

        *stage = CycleState::Persisting;
        let outcome = CycleOutcome::new(cycle_id, &snapshot, decision, source, action);
        self.fan_out.deliver(&outcome.notification()).await;
        self.persist(outcome.to_record()).await?;
        info!(stage = %stage, "Dashboard state updated");

        Ok(outcome)
    }

    /// Store backends do blocking file or SQLite I/O, so the write runs on
    /// the blocking pool. A panicking store fails the cycle like any error.
    async fn persist(&self, record: DashboardRecord) -> Result<(), CycleError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&record))
            .await
            .map_err(|e| CycleError::Panicked(e.to_string()))??;
        Ok(())
    }

    async fn think(&self, snapshot: &MarketSnapshot) -> (Decision, DecisionSource) {
        let Some(reasoning) = &self.reasoning else {
            info!("Reasoning unavailable, using fallback rule");
            return (self.fallback.decide(snapshot), DecisionSource::Fallback);
        };

        match reasoning.deliberate(snapshot).await {
            Ok(raw) => (parse_decision(&raw, snapshot), DecisionSource::Reasoning),
            Err(e) => {
                warn!(
                    provider = reasoning.provider_name(),
                    error = %e,
                    "Reasoning failed, using fallback rule"
                );
                (self.fallback.decide(snapshot), DecisionSource::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, MockExecutor, MockMarketData, RecordingSink};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use threebody_agents::test_support::ScriptedProvider;
    use threebody_state::StateError;
    use threebody_models::{Sentiment, TradeAction, ERROR_AGENT, NO_EXECUTION_REFERENCE};

    fn snapshot(rsi: f64) -> MarketSnapshot {
        MarketSnapshot::new("BTC/USDT", "USDT", dec!(85000))
            .unwrap()
            .with_rsi(Some(rsi))
            .with_sentiment(Sentiment::Neutral, Some(500))
    }

    fn voters() -> Vec<String> {
        vec!["Chad".to_string(), "Atlas".to_string()]
    }

    struct Rig {
        market: Arc<MockMarketData>,
        executor: Arc<MockExecutor>,
        store: Arc<MemoryStore>,
    }

    impl Rig {
        fn new(market: MockMarketData, executor: MockExecutor, store: MemoryStore) -> Self {
            Self {
                market: Arc::new(market),
                executor: Arc::new(executor),
                store: Arc::new(store),
            }
        }

        fn controller(&self) -> CycleController {
            CycleController::new(
                "BTC/USDT",
                self.market.clone(),
                ActionGate::new(Some(self.executor.clone()), voters()),
                self.store.clone(),
            )
        }
    }

    #[tokio::test]
    async fn oversold_without_reasoning_buys_via_fallback() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(25.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let report = rig.controller().run_cycle().await;

        assert_eq!(report.state, CycleState::Done);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.decision.action, TradeAction::Buy);
        assert_eq!(outcome.decision.agent, "Chad");
        assert_eq!(outcome.decision.fraction, dec!(0.1));
        assert_eq!(outcome.source, DecisionSource::Fallback);
        assert!(outcome.action_taken);
        assert_eq!(rig.executor.calls(), 1);

        let record = rig.store.load().unwrap().unwrap();
        assert_eq!(record.tx_hash, "0xabc");
        assert_eq!(record.price, dec!(85000));
    }

    #[tokio::test]
    async fn reasoning_output_is_parsed_and_clamped() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(50.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let provider = Arc::new(ScriptedProvider::replying(
            "```json\n{\"winner\": \"Chad\", \"decision\": \"BUY\", \"amount_percent\": 1.5, \"asset\": \"PEPE/USDT\"}\n```",
        ));
        let controller = rig
            .controller()
            .with_reasoning(Some(ReasoningClient::new(provider)));

        let outcome = controller.run_cycle().await.outcome.unwrap();
        assert_eq!(outcome.decision.fraction, Decimal::ONE);
        assert_eq!(outcome.decision.target_asset, "BTC/USDT");
        assert_eq!(outcome.source, DecisionSource::Reasoning);
    }

    #[tokio::test]
    async fn reasoning_failure_falls_back() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(50.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let controller = rig
            .controller()
            .with_reasoning(Some(ReasoningClient::new(Arc::new(ScriptedProvider::failing()))));

        let outcome = controller.run_cycle().await.outcome.unwrap();
        assert_eq!(outcome.decision.action, TradeAction::Hold);
        assert_eq!(outcome.decision.agent, "Warren");
        assert_eq!(outcome.source, DecisionSource::Fallback);
        assert_eq!(rig.executor.calls(), 0);
    }

    #[tokio::test]
    async fn undecodable_reasoning_holds_as_system() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(20.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let controller = rig.controller().with_reasoning(Some(ReasoningClient::new(Arc::new(
            ScriptedProvider::replying("I refuse to answer in JSON."),
        ))));

        let outcome = controller.run_cycle().await.outcome.unwrap();
        assert_eq!(outcome.decision.agent, ERROR_AGENT);
        assert_eq!(outcome.decision.action, TradeAction::Hold);
        assert_eq!(outcome.source, DecisionSource::Reasoning);
    }

    #[tokio::test]
    async fn executor_failure_still_completes() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(25.0)),
            MockExecutor::failing(),
            MemoryStore::new(),
        );
        let report = rig.controller().run_cycle().await;

        assert_eq!(report.state, CycleState::Done);
        let outcome = report.outcome.unwrap();
        assert!(!outcome.action_taken);
        assert_eq!(outcome.execution_reference, None);
        let record = rig.store.load().unwrap().unwrap();
        assert_eq!(record.tx_hash, NO_EXECUTION_REFERENCE);
        assert!(!record.action_taken);
    }

    #[tokio::test]
    async fn data_failure_fails_cycle_in_sensing() {
        let rig = Rig::new(
            MockMarketData::failing(),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let report = rig.controller().run_cycle().await;

        assert_eq!(report.state, CycleState::CycleFailed);
        assert_eq!(report.failed_stage, Some(CycleState::Sensing));
        assert!(report.outcome.is_none());
        assert_eq!(rig.store.writes(), 0);
        assert_eq!(rig.executor.calls(), 0);
    }

    #[tokio::test]
    async fn state_write_failure_fails_cycle_in_persisting() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(50.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::failing(),
        );
        let report = rig.controller().run_cycle().await;

        assert_eq!(report.state, CycleState::CycleFailed);
        assert_eq!(report.failed_stage, Some(CycleState::Persisting));
    }

    struct PanickingStore;

    impl StateStore for PanickingStore {
        fn save(&self, _record: &DashboardRecord) -> Result<(), StateError> {
            panic!("store exploded");
        }

        fn load(&self) -> Result<Option<DashboardRecord>, StateError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn panicking_store_fails_cycle_at_persisting() {
        let controller = CycleController::new(
            "BTC/USDT",
            Arc::new(MockMarketData::returning(snapshot(50.0))),
            ActionGate::new(None, vec!["Chad".to_string()]),
            Arc::new(PanickingStore),
        );
        let report = controller.run_cycle().await;

        assert_eq!(report.state, CycleState::CycleFailed);
        assert_eq!(report.failed_stage, Some(CycleState::Persisting));
        assert!(report.outcome.is_none());
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_others_or_persistence() {
        let rig = Rig::new(
            MockMarketData::returning(snapshot(25.0)),
            MockExecutor::succeeding("0xabc"),
            MemoryStore::new(),
        );
        let broken = Arc::new(RecordingSink::failing("discord"));
        let healthy = Arc::new(RecordingSink::new("webhook"));
        let controller = rig
            .controller()
            .with_fan_out(FanOut::new(vec![broken.clone(), healthy.clone()]));

        let report = controller.run_cycle().await;
        assert!(report.is_done());
        assert_eq!(broken.attempts(), 1);

        let received = healthy.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].action, TradeAction::Buy);
        assert!(received[0].success);
        assert!(rig.store.load().unwrap().is_some());
    }

    #[test]
    fn state_names() {
        assert_eq!(CycleState::CycleFailed.to_string(), "CYCLE_FAILED");
        assert_eq!(
            serde_json::to_string(&CycleState::Persisting).unwrap(),
            "\"PERSISTING\""
        );
    }
}
