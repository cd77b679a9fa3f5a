pub mod config;
pub mod decision;
pub mod error;
pub mod outcome;
pub mod snapshot;

pub use config::{
    AgentConfig, ExecutionConfig, ExecutionMode, FallbackConfig, MarketDataConfig,
    MarketProviderKind, NotificationConfig, ReasoningConfig, ReasoningProviderKind, StateBackend,
    StateConfig, ThreeBodyConfig,
};
pub use decision::{Decision, DecisionSource, Persona, TradeAction, ERROR_AGENT};
pub use error::{ConfigError, ModelError};
pub use outcome::{ActionOutcome, CycleOutcome, DashboardRecord, Notification, NO_EXECUTION_REFERENCE};
pub use snapshot::{MarketSnapshot, Sentiment};
