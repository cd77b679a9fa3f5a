use std::sync::Arc;
use std::time::Instant;

use threebody_models::MarketSnapshot;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::prompts::committee_prompt;
use crate::provider::ReasoningProvider;

/// Asks a reasoning provider to run the committee debate for one snapshot.
///
/// A single attempt per call. Failures go straight back to the caller, which
/// decides whether to fall back.
#[derive(Clone)]
pub struct ReasoningClient {
    provider: Arc<dyn ReasoningProvider>,
}

impl ReasoningClient {
    pub fn new(provider: Arc<dyn ReasoningProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn deliberate(&self, snapshot: &MarketSnapshot) -> Result<String, AgentError> {
        let prompt = committee_prompt(snapshot);
        let start = Instant::now();

        match self.provider.complete(&prompt).await {
            Ok(raw) => {
                info!(
                    provider = self.provider.name(),
                    asset = %snapshot.target_asset,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    response_len = raw.len(),
                    "Committee deliberation finished"
                );
                Ok(raw)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    asset = %snapshot.target_asset,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Committee deliberation failed"
                );
                Err(e)
            }
        }
    }
}
