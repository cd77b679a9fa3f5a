pub mod binance;
pub mod fear_greed;
pub mod indicators;
pub mod simulated;

use async_trait::async_trait;
use threebody_models::{MarketDataConfig, MarketProviderKind, MarketSnapshot};

use crate::error::SourceError;

pub use binance::BinanceMarketData;
pub use fear_greed::FearGreedClient;
pub use simulated::SimulatedMarketData;

/// Produces one snapshot per cycle. Mockable for testing.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, asset: &str) -> Result<MarketSnapshot, SourceError>;
}

/// Create a market data provider based on the configured kind.
pub fn create_provider(
    config: &MarketDataConfig,
    quote_asset: &str,
) -> Result<Box<dyn MarketDataProvider>, SourceError> {
    let sentiment = FearGreedClient::new(&config.fear_greed_url, config.timeout_seconds)?;
    match config.provider {
        MarketProviderKind::Simulated => Ok(Box::new(
            SimulatedMarketData::new(quote_asset).with_sentiment(sentiment),
        )),
        MarketProviderKind::Binance => Ok(Box::new(BinanceMarketData::new(
            config,
            quote_asset,
            sentiment,
        )?)),
    }
}
