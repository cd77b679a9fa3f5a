use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Agent name recorded when the reasoning output could not be decoded at all.
pub const ERROR_AGENT: &str = "System";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Lenient parse of an action word from untrusted text.
    ///
    /// Case-insensitive; the legacy `HOLD_Existing` spelling maps to `Hold`.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(TradeAction::Buy),
            "SELL" => Some(TradeAction::Sell),
            "HOLD" | "HOLD_EXISTING" => Some(TradeAction::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, TradeAction::Hold)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three committee voices in the simulated debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Conservative, risk-averse.
    Warren,
    /// Risk-seeking, chases momentum.
    Chad,
    /// Analytical tie-breaker.
    Atlas,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Warren, Persona::Chad, Persona::Atlas];

    pub fn name(&self) -> &'static str {
        match self {
            Persona::Warren => "Warren",
            Persona::Chad => "Chad",
            Persona::Atlas => "Atlas",
        }
    }

    pub fn temperament(&self) -> &'static str {
        match self {
            Persona::Warren => "Conservative, risk-averse, hates volatility.",
            Persona::Chad => "Risk-loving, chases hype and momentum.",
            Persona::Atlas => "Data-driven, cold, analytical. Breaks ties.",
        }
    }

    pub fn tie_breaker() -> Persona {
        Persona::Atlas
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which path produced a cycle's decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Reasoning,
    Fallback,
}

/// A fully populated trade recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub agent: String,
    pub action: TradeAction,
    /// Share of the treasury to deploy, always within [0, 1].
    pub fraction: Decimal,
    pub rationale: String,
    /// Copied from the snapshot, never from reasoning output.
    pub target_asset: String,
}

impl Decision {
    pub fn new(
        agent: impl Into<String>,
        action: TradeAction,
        fraction: Decimal,
        rationale: impl Into<String>,
        target_asset: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            action,
            fraction: clamp_fraction(fraction),
            rationale: rationale.into(),
            target_asset: target_asset.into(),
        }
    }

    /// The decision substituted when reasoning output is undecodable.
    pub fn parse_error(target_asset: impl Into<String>) -> Self {
        Self::new(
            ERROR_AGENT,
            TradeAction::Hold,
            Decimal::ZERO,
            "parse error",
            target_asset,
        )
    }
}

pub fn clamp_fraction(fraction: Decimal) -> Decimal {
    fraction.clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_loose_accepts_variants() {
        assert_eq!(TradeAction::parse_loose("buy"), Some(TradeAction::Buy));
        assert_eq!(TradeAction::parse_loose(" SELL "), Some(TradeAction::Sell));
        assert_eq!(TradeAction::parse_loose("Hold"), Some(TradeAction::Hold));
        assert_eq!(
            TradeAction::parse_loose("HOLD_Existing"),
            Some(TradeAction::Hold)
        );
        assert_eq!(TradeAction::parse_loose("moon"), None);
        assert_eq!(TradeAction::parse_loose(""), None);
    }

    #[test]
    fn new_clamps_fraction() {
        let d = Decision::new("Chad", TradeAction::Buy, dec!(1.5), "all in", "BTC/USDT");
        assert_eq!(d.fraction, dec!(1));
        let d = Decision::new("Warren", TradeAction::Sell, dec!(-0.2), "out", "BTC/USDT");
        assert_eq!(d.fraction, dec!(0));
        let d = Decision::new("Atlas", TradeAction::Buy, dec!(0.25), "ok", "BTC/USDT");
        assert_eq!(d.fraction, dec!(0.25));
    }

    #[test]
    fn parse_error_decision_is_hold() {
        let d = Decision::parse_error("ETH/USDT");
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.fraction, Decimal::ZERO);
        assert_eq!(d.agent, ERROR_AGENT);
        assert_eq!(d.rationale, "parse error");
        assert_eq!(d.target_asset, "ETH/USDT");
    }

    #[test]
    fn action_serialization() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"BUY\"");
        assert_eq!(
            serde_json::to_string(&TradeAction::Hold).unwrap(),
            "\"HOLD\""
        );
        assert_eq!(
            serde_json::to_string(&DecisionSource::Fallback).unwrap(),
            "\"fallback\""
        );
    }

    #[test]
    fn tie_breaker_is_atlas() {
        assert_eq!(Persona::tie_breaker().name(), "Atlas");
        assert_eq!(Persona::ALL.len(), 3);
    }
}
