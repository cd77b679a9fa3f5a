pub mod controller;
pub mod daemon;
pub mod error;
pub mod execution;
pub mod gate;
pub mod notify;
pub mod sources;
pub mod test_support;

pub use controller::{CycleController, CycleReport, CycleState};
pub use daemon::{Daemon, LoopConfig, RunSummary};
pub use error::{CycleError, ExecutionError, NotifyError, SourceError};
pub use execution::{DryRunExecutor, ExecutionReceipt, Executor, JsonRpcExecutor};
pub use gate::ActionGate;
pub use notify::{DiscordSink, FanOut, NotificationSink, WebhookSink};
pub use sources::{create_provider, MarketDataProvider};
