use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Snapshot price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Snapshot is missing a target asset")]
    MissingAsset,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
