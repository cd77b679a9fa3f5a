use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Dominant crowd mood for the observed asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Classify a 0-100 fear & greed score. Above 60 is greed, below 40 is fear.
    pub fn from_fear_greed(score: u32) -> Self {
        if score > 60 {
            Sentiment::Bullish
        } else if score < 40 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "BULLISH",
            Sentiment::Bearish => "BEARISH",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cycle's observed market state. Built once by the data provider and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub captured_at: DateTime<Utc>,
    /// Traded asset, e.g. "BTC/USDT".
    pub target_asset: String,
    /// On-chain address of the asset if known.
    pub target_asset_address: Option<String>,
    pub quote_asset: String,
    pub price: Decimal,
    /// RSI(14), 0-100.
    pub rsi_14: Option<f64>,
    pub sma_200: Option<f64>,
    pub bollinger_width: Option<f64>,
    pub mentions_24h: Option<u64>,
    pub sentiment: Sentiment,
}

impl MarketSnapshot {
    /// Create a snapshot with only the required fields set. Technical fields
    /// start absent and sentiment starts neutral.
    pub fn new(
        target_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ModelError> {
        Self {
            captured_at: Utc::now(),
            target_asset: target_asset.into(),
            target_asset_address: None,
            quote_asset: quote_asset.into(),
            price,
            rsi_14: None,
            sma_200: None,
            bollinger_width: None,
            mentions_24h: None,
            sentiment: Sentiment::Neutral,
        }
        .sanitized()
    }

    pub fn with_rsi(mut self, rsi: Option<f64>) -> Self {
        self.rsi_14 = rsi.filter(|v| v.is_finite() && (0.0..=100.0).contains(v));
        self
    }

    pub fn with_sma_200(mut self, sma: Option<f64>) -> Self {
        self.sma_200 = sma.filter(|v| v.is_finite());
        self
    }

    pub fn with_bollinger_width(mut self, width: Option<f64>) -> Self {
        self.bollinger_width = width.filter(|v| v.is_finite() && *v >= 0.0);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment, mentions_24h: Option<u64>) -> Self {
        self.sentiment = sentiment;
        self.mentions_24h = mentions_24h;
        self
    }

    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.target_asset_address = address;
        self
    }

    /// Enforce the snapshot invariants on a value that came from elsewhere.
    ///
    /// A missing asset or non-positive price is an error. Out-of-range
    /// technical readings are dropped to `None` rather than rejected.
    pub fn sanitized(self) -> Result<Self, ModelError> {
        if self.target_asset.trim().is_empty() {
            return Err(ModelError::MissingAsset);
        }
        if self.price <= Decimal::ZERO {
            return Err(ModelError::NonPositivePrice(self.price));
        }
        let rsi = self.rsi_14;
        let sma = self.sma_200;
        let width = self.bollinger_width;
        Ok(self
            .with_rsi(rsi)
            .with_sma_200(sma)
            .with_bollinger_width(width))
    }

    /// Human-readable rendering embedded in the reasoning prompt.
    pub fn summary(&self) -> String {
        format!(
            "Market Context for {} (quoted in {}) at {}:\n\
             - Price: ${}\n\
             - RSI(14): {}\n\
             - SMA(200): {}\n\
             - Bollinger Band Width: {}\n\
             - Social Mentions (24h): {}\n\
             - Sentiment: {}",
            self.target_asset,
            self.quote_asset,
            self.captured_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.price.round_dp(4),
            or_na(self.rsi_14.map(|v| format!("{v:.2}"))),
            or_na(self.sma_200.map(|v| format!("{v:.2}"))),
            or_na(self.bollinger_width.map(|v| format!("{v:.4}"))),
            or_na(self.mentions_24h.map(|v| v.to_string())),
            self.sentiment,
        )
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}
