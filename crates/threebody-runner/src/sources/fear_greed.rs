use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use threebody_models::Sentiment;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Score used when the index cannot be read.
pub const NEUTRAL_SCORE: u32 = 50;

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    #[serde(default)]
    value_classification: Option<String>,
}

/// Crypto Fear & Greed index (alternative.me).
#[derive(Clone)]
pub struct FearGreedClient {
    client: Client,
    url: String,
}

impl FearGreedClient {
    pub fn new(url: &str, timeout_seconds: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Current score and its sentiment. Never fails: any error reads as neutral.
    pub async fn sentiment(&self) -> (u32, Sentiment) {
        match self.score().await {
            Ok(score) => {
                let sentiment = Sentiment::from_fear_greed(score);
                debug!(score, sentiment = %sentiment, "Fear & Greed index read");
                (score, sentiment)
            }
            Err(e) => {
                warn!(error = %e, "Fear & Greed index unavailable, assuming neutral");
                (NEUTRAL_SCORE, Sentiment::Neutral)
            }
        }
    }

    async fn score(&self) -> Result<u32, SourceError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let body: FngResponse = response.json().await?;
        let entry = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::MarketData("empty fear & greed response".to_string()))?;
        if let Some(label) = &entry.value_classification {
            debug!(label = %label, "Fear & Greed classification");
        }
        entry
            .value
            .trim()
            .parse::<u32>()
            .map_err(|e| SourceError::MarketData(format!("bad fear & greed value {:?}: {e}", entry.value)))
    }
}
