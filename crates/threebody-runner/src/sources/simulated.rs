use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use threebody_models::{MarketSnapshot, Sentiment};
use tracing::debug;

use super::fear_greed::{FearGreedClient, NEUTRAL_SCORE};
use super::MarketDataProvider;
use crate::error::SourceError;

/// Placeholder address attached to simulated snapshots.
pub const SIMULATED_ASSET_ADDRESS: &str = "0xMockWrapper";

/// Synthetic price and RSI around a fixed base, with optional live sentiment.
///
/// BTC tickers sit around 85000, everything else around 3000. Price moves
/// up to 2% either way; RSI is drawn from [30, 70).
pub struct SimulatedMarketData {
    quote_asset: String,
    rng: Mutex<StdRng>,
    sentiment: Option<FearGreedClient>,
}

impl SimulatedMarketData {
    pub fn new(quote_asset: &str) -> Self {
        Self {
            quote_asset: quote_asset.to_string(),
            rng: Mutex::new(StdRng::from_entropy()),
            sentiment: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_sentiment(mut self, client: FearGreedClient) -> Self {
        self.sentiment = Some(client);
        self
    }

    pub fn base_price(asset: &str) -> f64 {
        if asset.to_ascii_uppercase().contains("BTC") {
            85_000.0
        } else {
            3_000.0
        }
    }

    fn draw(&self) -> Result<(f64, f64), SourceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SourceError::MarketData("simulator rng poisoned".to_string()))?;
        let jitter = rng.gen_range(-0.02..=0.02);
        let rsi = rng.gen_range(30.0..70.0);
        Ok((jitter, rsi))
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedMarketData {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch(&self, asset: &str) -> Result<MarketSnapshot, SourceError> {
        let base = Self::base_price(asset);
        let (jitter, rsi) = self.draw()?;

        let price = Decimal::from_f64(base * (1.0 + jitter))
            .ok_or_else(|| SourceError::MarketData(format!("unrepresentable price for {asset}")))?
            .round_dp(2);

        let (score, sentiment) = match &self.sentiment {
            Some(client) => client.sentiment().await,
            None => (NEUTRAL_SCORE, Sentiment::Neutral),
        };

        debug!(asset, price = %price, rsi, score, "Simulated market snapshot");

        Ok(MarketSnapshot::new(asset, &self.quote_asset, price)?
            .with_address(Some(SIMULATED_ASSET_ADDRESS.to_string()))
            .with_rsi(Some(rsi))
            .with_sma_200(Some(base * 0.95))
            .with_sentiment(sentiment, Some(u64::from(score) * 10)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn btc_snapshot_within_band() {
        let source = SimulatedMarketData::new("USDT").with_seed(7);
        for _ in 0..50 {
            let s = source.fetch("BTC/USDT").await.unwrap();
            assert!(s.price >= dec!(83300) && s.price <= dec!(86700), "{}", s.price);
            let rsi = s.rsi_14.unwrap();
            assert!((30.0..70.0).contains(&rsi));
            assert_eq!(s.sma_200, Some(85_000.0 * 0.95));
            assert_eq!(s.sentiment, Sentiment::Neutral);
            assert_eq!(s.mentions_24h, Some(500));
            assert_eq!(s.quote_asset, "USDT");
        }
    }

    #[tokio::test]
    async fn other_assets_use_lower_base() {
        let source = SimulatedMarketData::new("USDT").with_seed(1);
        let s = source.fetch("ETH/USDT").await.unwrap();
        assert!(s.price >= dec!(2940) && s.price <= dec!(3060));
        assert_eq!(s.target_asset, "ETH/USDT");
        assert_eq!(s.target_asset_address.as_deref(), Some(SIMULATED_ASSET_ADDRESS));
    }

    #[tokio::test]
    async fn same_seed_same_snapshot() {
        let a = SimulatedMarketData::new("USDT").with_seed(42);
        let b = SimulatedMarketData::new("USDT").with_seed(42);
        let sa = a.fetch("BTC/USDT").await.unwrap();
        let sb = b.fetch("BTC/USDT").await.unwrap();
        assert_eq!(sa.price, sb.price);
        assert_eq!(sa.rsi_14, sb.rsi_14);
    }
}
