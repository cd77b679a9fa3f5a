use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::{Decision, DecisionSource, TradeAction};
use crate::snapshot::{MarketSnapshot, Sentiment};

/// Sentinel written to the dashboard record when nothing was executed.
pub const NO_EXECUTION_REFERENCE: &str = "N/A";

/// Result of the action gate for one decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    pub action_taken: bool,
    /// Opaque transaction reference from the executor.
    pub reference: Option<String>,
}

impl ActionOutcome {
    pub fn not_taken() -> Self {
        Self::default()
    }

    pub fn executed(reference: impl Into<String>) -> Self {
        Self {
            action_taken: true,
            reference: Some(reference.into()),
        }
    }
}

/// Everything one completed cycle produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub price: Decimal,
    pub rsi_14: Option<f64>,
    pub sentiment: Sentiment,
    pub decision: Decision,
    pub source: DecisionSource,
    pub action_taken: bool,
    pub execution_reference: Option<String>,
}

impl CycleOutcome {
    pub fn new(
        cycle_id: Uuid,
        snapshot: &MarketSnapshot,
        decision: Decision,
        source: DecisionSource,
        action: ActionOutcome,
    ) -> Self {
        Self {
            cycle_id,
            completed_at: Utc::now(),
            price: snapshot.price,
            rsi_14: snapshot.rsi_14,
            sentiment: snapshot.sentiment,
            decision,
            source,
            action_taken: action.action_taken,
            execution_reference: action.reference,
        }
    }

    /// Flatten into the single record external dashboards read.
    pub fn to_record(&self) -> DashboardRecord {
        DashboardRecord {
            cycle_id: self.cycle_id,
            timestamp: self.completed_at,
            ticker: self.decision.target_asset.clone(),
            price: self.price,
            rsi: self.rsi_14,
            sentiment: self.sentiment,
            decision: self.decision.action,
            agent: self.decision.agent.clone(),
            reason: self.decision.rationale.clone(),
            fraction: self.decision.fraction,
            action_taken: self.action_taken,
            source: self.source,
            tx_hash: self
                .execution_reference
                .clone()
                .unwrap_or_else(|| NO_EXECUTION_REFERENCE.to_string()),
        }
    }

    pub fn notification(&self) -> Notification {
        Notification {
            asset: self.decision.target_asset.clone(),
            action: self.decision.action,
            agent_name: self.decision.agent.clone(),
            rationale: self.decision.rationale.clone(),
            success: self.action_taken,
        }
    }
}

/// The persisted last-cycle document. Overwritten whole on every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardRecord {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub price: Decimal,
    pub rsi: Option<f64>,
    pub sentiment: Sentiment,
    pub decision: TradeAction,
    pub agent: String,
    pub reason: String,
    pub fraction: Decimal,
    pub action_taken: bool,
    pub source: DecisionSource,
    pub tx_hash: String,
}

/// Payload handed to every notification sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub asset: String,
    pub action: TradeAction,
    pub agent_name: String,
    pub rationale: String,
    pub success: bool,
}
