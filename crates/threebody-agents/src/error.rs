use thiserror::Error;

/// Failure of the reasoning stage. Never retried inside this crate.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reasoning response parse error: {0}")]
    Parse(String),

    #[error("Reasoning provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Reasoning provider returned an empty response")]
    EmptyResponse,

    #[error("Reasoning timed out after {0} seconds")]
    Timeout(u64),
}
