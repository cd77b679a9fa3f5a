use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration. Every section is optional in TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ThreeBodyConfig {
    pub agent: AgentConfig,
    pub market_data: MarketDataConfig,
    pub reasoning: ReasoningConfig,
    pub fallback: FallbackConfig,
    pub execution: ExecutionConfig,
    pub notifications: NotificationConfig,
    pub state: StateConfig,
}

/// What to trade and how often.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub ticker: String,
    pub quote_asset: String,
    /// Sleep between cycles.
    pub interval_seconds: u64,
    /// Sleep after a cycle escaped its own failure boundary.
    pub recovery_interval_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ticker: "BTC/USDT".to_string(),
            quote_asset: "USDT".to_string(),
            interval_seconds: 300,
            recovery_interval_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarketProviderKind {
    #[default]
    Simulated,
    Binance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketDataConfig {
    pub provider: MarketProviderKind,
    pub binance_base_url: String,
    pub fear_greed_url: String,
    /// Kline interval requested from the exchange.
    pub candle_interval: String,
    pub candle_limit: u32,
    pub timeout_seconds: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            provider: MarketProviderKind::Simulated,
            binance_base_url: "https://api.binance.com".to_string(),
            fear_greed_url: "https://api.alternative.me/fng/".to_string(),
            candle_interval: "1h".to_string(),
            candle_limit: 200,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningProviderKind {
    /// OpenAI-compatible chat completions endpoint (Groq by default).
    #[default]
    ChatCompletions,
    ClaudeCli,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    pub provider: ReasoningProviderKind,
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: ReasoningProviderKind::ChatCompletions,
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            timeout_seconds: 45,
        }
    }
}

/// Rule-based decision used when reasoning is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    pub oversold: f64,
    pub overbought: f64,
    pub buy_fraction: Decimal,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
            buy_fraction: Decimal::new(1, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Disabled,
    #[default]
    DryRun,
    JsonRpc,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub rpc_url: String,
    /// Contract the fixed call is sent to.
    pub contract_address: Option<String>,
    /// Unlocked node account that sends the transaction.
    pub from_address: Option<String>,
    pub gas: u64,
    pub timeout_seconds: u64,
    /// Identities authorizing each submission.
    pub voters: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::DryRun,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: None,
            from_address: None,
            gas: 200_000,
            timeout_seconds: 30,
            voters: vec!["Chad".to_string(), "Atlas".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub discord_webhook_url: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: None,
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    JsonFile,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::JsonFile,
            path: "frontend_layer/dashboard_state.json".to_string(),
        }
    }
}

impl ThreeBodyConfig {
    /// Apply environment-style overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("THREEBODY_TICKER") {
            self.agent.ticker = v;
        }
        if let Some(v) = get("THREEBODY_QUOTE_ASSET") {
            self.agent.quote_asset = v;
        }
        if let Some(v) = get("THREEBODY_INTERVAL_SECONDS") {
            self.agent.interval_seconds = parse_number("THREEBODY_INTERVAL_SECONDS", &v)?;
        }
        if let Some(v) = get("THREEBODY_RECOVERY_INTERVAL_SECONDS") {
            self.agent.recovery_interval_seconds =
                parse_number("THREEBODY_RECOVERY_INTERVAL_SECONDS", &v)?;
        }
        if let Some(v) = get("THREEBODY_MARKET_PROVIDER") {
            self.market_data.provider = parse_kind("THREEBODY_MARKET_PROVIDER", &v)?;
        }
        if let Some(v) = get("THREEBODY_REASONING_PROVIDER") {
            self.reasoning.provider = parse_kind("THREEBODY_REASONING_PROVIDER", &v)?;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.reasoning.api_key = Some(v);
        }
        if let Some(v) = get("THREEBODY_REASONING_MODEL") {
            self.reasoning.model = v;
        }
        if let Some(v) = get("THREEBODY_EXECUTION_MODE") {
            self.execution.mode = parse_kind("THREEBODY_EXECUTION_MODE", &v)?;
        }
        if let Some(v) = get("WEB3_RPC_URL") {
            self.execution.rpc_url = v;
        }
        if let Some(v) = get("SAFE_ADDRESS") {
            self.execution.contract_address = Some(v);
        }
        if let Some(v) = get("THREEBODY_FROM_ADDRESS") {
            self.execution.from_address = Some(v);
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.notifications.discord_webhook_url = Some(v);
        }
        if let Some(v) = get("THREEBODY_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(v);
        }
        if let Some(v) = get("THREEBODY_STATE_BACKEND") {
            self.state.backend = parse_kind("THREEBODY_STATE_BACKEND", &v)?;
        }
        if let Some(v) = get("THREEBODY_STATE_PATH") {
            self.state.path = v;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.ticker.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.ticker must not be empty".into()));
        }
        if self.agent.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "agent.interval_seconds must be positive".into(),
            ));
        }
        if self.agent.recovery_interval_seconds < self.agent.interval_seconds {
            return Err(ConfigError::Invalid(format!(
                "agent.recovery_interval_seconds ({}) must not be shorter than agent.interval_seconds ({})",
                self.agent.recovery_interval_seconds, self.agent.interval_seconds
            )));
        }
        if self.fallback.oversold >= self.fallback.overbought {
            return Err(ConfigError::Invalid(format!(
                "fallback.oversold ({}) must be below fallback.overbought ({})",
                self.fallback.oversold, self.fallback.overbought
            )));
        }
        if self.fallback.buy_fraction <= Decimal::ZERO || self.fallback.buy_fraction > Decimal::ONE
        {
            return Err(ConfigError::Invalid(format!(
                "fallback.buy_fraction must be in (0, 1], got {}",
                self.fallback.buy_fraction
            )));
        }
        if self.state.path.trim().is_empty() {
            return Err(ConfigError::Invalid("state.path must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_kind<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized)).map_err(|_| {
        ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ThreeBodyConfig::default();
        assert_eq!(config.agent.ticker, "BTC/USDT");
        assert_eq!(config.agent.interval_seconds, 300);
        assert_eq!(config.agent.recovery_interval_seconds, 600);
        assert_eq!(config.fallback.buy_fraction, dec!(0.1));
        assert_eq!(config.execution.voters, vec!["Chad", "Atlas"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: ThreeBodyConfig = toml::from_str("").unwrap();
        assert_eq!(config, ThreeBodyConfig::default());
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[agent]
ticker = "ETH/USDT"
interval_seconds = 60

[market_data]
provider = "binance"

[reasoning]
provider = "claude_cli"
model = "claude-3-5-haiku-latest"

[fallback]
oversold = 25.0
buy_fraction = "0.05"

[execution]
mode = "json_rpc"
contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[state]
backend = "sqlite"
path = "/tmp/threebody.db"
"#;
        let config: ThreeBodyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.ticker, "ETH/USDT");
        assert_eq!(config.agent.quote_asset, "USDT");
        assert_eq!(config.agent.interval_seconds, 60);
        assert_eq!(config.market_data.provider, MarketProviderKind::Binance);
        assert_eq!(config.reasoning.provider, ReasoningProviderKind::ClaudeCli);
        assert_eq!(config.fallback.oversold, 25.0);
        assert_eq!(config.fallback.overbought, 70.0);
        assert_eq!(config.fallback.buy_fraction, dec!(0.05));
        assert_eq!(config.execution.mode, ExecutionMode::JsonRpc);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ThreeBodyConfig::default();
        config
            .apply_env(lookup(&[
                ("THREEBODY_TICKER", "SOL/USDT"),
                ("THREEBODY_INTERVAL_SECONDS", "15"),
                ("THREEBODY_REASONING_PROVIDER", "disabled"),
                ("THREEBODY_EXECUTION_MODE", "json-rpc"),
                ("GROQ_API_KEY", "gsk_test"),
                ("SAFE_ADDRESS", "0xabc"),
                ("DISCORD_WEBHOOK_URL", "https://discord.test/hook"),
                ("THREEBODY_STATE_BACKEND", "SQLITE"),
            ]))
            .unwrap();
        assert_eq!(config.agent.ticker, "SOL/USDT");
        assert_eq!(config.agent.interval_seconds, 15);
        assert_eq!(config.reasoning.provider, ReasoningProviderKind::Disabled);
        assert_eq!(config.reasoning.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.execution.mode, ExecutionMode::JsonRpc);
        assert_eq!(config.execution.contract_address.as_deref(), Some("0xabc"));
        assert_eq!(
            config.notifications.discord_webhook_url.as_deref(),
            Some("https://discord.test/hook")
        );
        assert_eq!(config.state.backend, StateBackend::Sqlite);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = ThreeBodyConfig::default();
        config
            .apply_env(lookup(&[("THREEBODY_TICKER", ""), ("GROQ_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(config.agent.ticker, "BTC/USDT");
        assert_eq!(config.reasoning.api_key, None);
    }

    #[test]
    fn malformed_env_values_are_rejected() {
        let mut config = ThreeBodyConfig::default();
        let err = config
            .apply_env(lookup(&[("THREEBODY_INTERVAL_SECONDS", "five")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                key: "THREEBODY_INTERVAL_SECONDS".to_string(),
                value: "five".to_string(),
            }
        );

        let err = config
            .apply_env(lookup(&[("THREEBODY_MARKET_PROVIDER", "kraken")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        let mut config = ThreeBodyConfig::default();
        config.fallback.oversold = 80.0;
        assert!(config.validate().is_err());

        let mut config = ThreeBodyConfig::default();
        config.fallback.buy_fraction = dec!(1.5);
        assert!(config.validate().is_err());

        let mut config = ThreeBodyConfig::default();
        config.agent.interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn recovery_interval_is_never_shorter_than_interval() {
        let mut config = ThreeBodyConfig::default();
        assert!(config.agent.recovery_interval_seconds > config.agent.interval_seconds);

        config.agent.recovery_interval_seconds = 60;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("recovery_interval_seconds")));

        config.agent.recovery_interval_seconds = config.agent.interval_seconds;
        assert!(config.validate().is_ok());

        config
            .apply_env(lookup(&[
                ("THREEBODY_INTERVAL_SECONDS", "900"),
                ("THREEBODY_RECOVERY_INTERVAL_SECONDS", "120"),
            ]))
            .unwrap();
        assert!(config.validate().is_err());
    }
}
