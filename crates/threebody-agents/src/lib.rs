pub mod error;
pub mod fallback;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod reasoning;

pub mod test_support;

pub use error::AgentError;
pub use fallback::FallbackRule;
pub use parser::parse_decision;
pub use provider::{ChatCompletionsProvider, ClaudeCliProvider, ReasoningProvider};
pub use reasoning::ReasoningClient;
