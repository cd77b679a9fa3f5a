//! Three-Body Portfolio - autonomous trading committee agent
//!
//! Each cycle senses the market, lets a three-persona committee (or a
//! rule-based fallback) decide, optionally commits the vote on-chain, then
//! notifies sinks and records the outcome for dashboards.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use threebody::models::ThreeBodyConfig;
//! use threebody::runner::{Daemon, LoopConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ThreeBodyConfig::default();
//! let controller = threebody::build_controller(&config)?;
//! let daemon = Daemon::new(controller, LoopConfig::from_agent(&config.agent));
//! daemon.run_once().await?;
//! # Ok(())
//! # }
//! ```

pub use threebody_agents as agents;
pub use threebody_models as models;
pub use threebody_runner as runner;
pub use threebody_state as state;

use std::sync::Arc;
use std::time::Duration;

use threebody_agents::{
    AgentError, ChatCompletionsProvider, ClaudeCliProvider, FallbackRule, ReasoningClient,
};
use threebody_models::{
    ExecutionConfig, ExecutionMode, NotificationConfig, ReasoningConfig, ReasoningProviderKind,
    StateBackend, StateConfig, ThreeBodyConfig,
};
use threebody_runner::{
    create_provider, ActionGate, CycleController, DiscordSink, DryRunExecutor, ExecutionError,
    Executor, FanOut, JsonRpcExecutor, NotificationSink, NotifyError, WebhookSink,
};
use threebody_state::{JsonFileStore, SqliteStore, StateError, StateStore};

/// `None` when reasoning is disabled or the chat provider has no API key.
pub fn build_reasoning_client(
    config: &ReasoningConfig,
) -> Result<Option<ReasoningClient>, AgentError> {
    match config.provider {
        ReasoningProviderKind::Disabled => Ok(None),
        ReasoningProviderKind::ChatCompletions => match &config.api_key {
            Some(key) => {
                let provider = ChatCompletionsProvider::new(config, key.clone())?;
                Ok(Some(ReasoningClient::new(Arc::new(provider))))
            }
            None => {
                tracing::warn!("No reasoning API key (GROQ_API_KEY), committee runs on the fallback rule");
                Ok(None)
            }
        },
        ReasoningProviderKind::ClaudeCli => {
            let provider = ClaudeCliProvider::new(
                config.model.clone(),
                Duration::from_secs(config.timeout_seconds),
            );
            Ok(Some(ReasoningClient::new(Arc::new(provider))))
        }
    }
}

pub fn build_executor(
    config: &ExecutionConfig,
) -> Result<Option<Arc<dyn Executor>>, ExecutionError> {
    match config.mode {
        ExecutionMode::Disabled => Ok(None),
        ExecutionMode::DryRun => Ok(Some(Arc::new(DryRunExecutor))),
        ExecutionMode::JsonRpc => Ok(Some(Arc::new(JsonRpcExecutor::new(config)?))),
    }
}

/// One sink per configured URL, Discord first.
pub fn build_sinks(config: &NotificationConfig) -> Result<FanOut, NotifyError> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();
    if let Some(url) = &config.discord_webhook_url {
        sinks.push(Arc::new(DiscordSink::new(url, config.timeout_seconds)?));
    }
    if let Some(url) = &config.webhook_url {
        sinks.push(Arc::new(WebhookSink::new(url, config.timeout_seconds)?));
    }
    if sinks.is_empty() {
        tracing::info!("No notification sinks configured");
    }
    Ok(FanOut::new(sinks))
}

pub fn build_state_store(config: &StateConfig) -> Result<Arc<dyn StateStore>, StateError> {
    match config.backend {
        StateBackend::JsonFile => Ok(Arc::new(JsonFileStore::new(&config.path))),
        StateBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}

/// Build a CycleController from configuration.
pub fn build_controller(config: &ThreeBodyConfig) -> Result<CycleController, anyhow::Error> {
    let market = create_provider(&config.market_data, &config.agent.quote_asset)?;
    let executor = build_executor(&config.execution)?;
    let gate = ActionGate::new(executor, config.execution.voters.clone());
    let store = build_state_store(&config.state)?;

    Ok(
        CycleController::new(config.agent.ticker.clone(), Arc::from(market), gate, store)
            .with_reasoning(build_reasoning_client(&config.reasoning)?)
            .with_fallback(FallbackRule::from_config(&config.fallback))
            .with_fan_out(build_sinks(&config.notifications)?),
    )
}
