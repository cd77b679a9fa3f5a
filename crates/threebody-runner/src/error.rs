use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] threebody_models::ModelError),
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Executor not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected RPC response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink {sink} rejected notification with status {status}: {body}")]
    Rejected {
        sink: String,
        status: u16,
        body: String,
    },
}

/// Why a cycle ended in `CYCLE_FAILED`.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Sensing failed: {0}")]
    Sensing(#[from] SourceError),

    #[error("State write failed: {0}")]
    State(#[from] threebody_state::StateError),

    #[error("Cycle task panicked: {0}")]
    Panicked(String),
}
