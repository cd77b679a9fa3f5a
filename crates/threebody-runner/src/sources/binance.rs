use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use threebody_models::{MarketDataConfig, MarketSnapshot};
use tracing::{debug, info};

use super::fear_greed::FearGreedClient;
use super::indicators::{self, BOLLINGER_PERIOD, RSI_PERIOD, SMA_LONG_PERIOD};
use super::MarketDataProvider;
use crate::error::SourceError;

/// Index of the close price inside a Binance kline array.
const KLINE_CLOSE: usize = 4;

/// Public Binance spot klines with indicators computed locally.
pub struct BinanceMarketData {
    client: Client,
    base_url: String,
    interval: String,
    limit: u32,
    quote_asset: String,
    sentiment: FearGreedClient,
}

impl BinanceMarketData {
    pub fn new(
        config: &MarketDataConfig,
        quote_asset: &str,
        sentiment: FearGreedClient,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.binance_base_url.trim_end_matches('/').to_string(),
            interval: config.candle_interval.clone(),
            limit: config.candle_limit,
            quote_asset: quote_asset.to_string(),
            sentiment,
        })
    }

    /// `BTC/USDT` -> `BTCUSDT`.
    pub fn exchange_symbol(asset: &str) -> String {
        asset
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    /// Close prices, oldest first. The last close is kept as a string so the
    /// price keeps its exact decimal form.
    async fn closes(&self, symbol: &str) -> Result<(Vec<f64>, String), SourceError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", self.interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let klines: Vec<Vec<Value>> = response.json().await?;
        parse_closes(&klines)
    }
}

fn parse_closes(klines: &[Vec<Value>]) -> Result<(Vec<f64>, String), SourceError> {
    let raw: Vec<String> = klines
        .iter()
        .map(|k| match k.get(KLINE_CLOSE) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            other => Err(SourceError::MarketData(format!(
                "kline without close price: {other:?}"
            ))),
        })
        .collect::<Result<_, _>>()?;

    let last = raw
        .last()
        .cloned()
        .ok_or_else(|| SourceError::MarketData("no klines returned".to_string()))?;

    let closes = raw
        .iter()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|e| SourceError::MarketData(format!("bad close {s:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((closes, last))
}

#[async_trait]
impl MarketDataProvider for BinanceMarketData {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch(&self, asset: &str) -> Result<MarketSnapshot, SourceError> {
        let symbol = Self::exchange_symbol(asset);
        let (closes, last) = self.closes(&symbol).await?;
        let price = Decimal::from_str(&last)
            .map_err(|e| SourceError::MarketData(format!("bad price {last:?}: {e}")))?;

        let rsi = indicators::rsi(&closes, RSI_PERIOD);
        let sma = indicators::sma(&closes, SMA_LONG_PERIOD);
        let width = indicators::bollinger_width(&closes, BOLLINGER_PERIOD);
        debug!(symbol = %symbol, candles = closes.len(), ?rsi, ?sma, ?width, "Indicators computed");

        let (score, sentiment) = self.sentiment.sentiment().await;

        info!(asset, price = %price, "Binance snapshot fetched");

        Ok(MarketSnapshot::new(asset, &self.quote_asset, price)?
            .with_rsi(rsi)
            .with_sma_200(sma)
            .with_bollinger_width(width)
            .with_sentiment(sentiment, Some(u64::from(score) * 10)))
    }
}
