use rust_decimal::Decimal;
use threebody_models::{Decision, FallbackConfig, MarketSnapshot, Persona, TradeAction};

/// Deterministic decision derived from the snapshot's RSI alone.
///
/// Oversold buys a fixed fraction on Chad's behalf; anything else is a
/// zero-size HOLD from Warren. Overbought markets are not shorted.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRule {
    pub oversold: f64,
    pub overbought: f64,
    pub buy_fraction: Decimal,
}

impl Default for FallbackRule {
    fn default() -> Self {
        Self::from_config(&FallbackConfig::default())
    }
}

impl FallbackRule {
    pub fn from_config(config: &FallbackConfig) -> Self {
        Self {
            oversold: config.oversold,
            overbought: config.overbought,
            buy_fraction: config.buy_fraction,
        }
    }

    pub fn decide(&self, snapshot: &MarketSnapshot) -> Decision {
        let asset = snapshot.target_asset.as_str();
        match snapshot.rsi_14 {
            Some(rsi) if rsi < self.oversold => Decision::new(
                Persona::Chad.name(),
                TradeAction::Buy,
                self.buy_fraction,
                format!("RSI {rsi:.1} oversold"),
                asset,
            ),
            Some(rsi) if rsi > self.overbought => Decision::new(
                Persona::Warren.name(),
                TradeAction::Hold,
                Decimal::ZERO,
                format!("RSI {rsi:.1} overbought, not chasing"),
                asset,
            ),
            _ => Decision::new(
                Persona::Warren.name(),
                TradeAction::Hold,
                Decimal::ZERO,
                "Safety first",
                asset,
            ),
        }
    }
}
