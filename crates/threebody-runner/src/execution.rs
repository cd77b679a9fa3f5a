use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use threebody_models::{Decision, ExecutionConfig};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ExecutionError;

/// Function selector of the treasury contract's `increment()`.
pub const INCREMENT_SELECTOR: &str = "0xd09de08a";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    /// Opaque transaction reference, usually a tx hash.
    pub reference: String,
}

/// Commits a decision on-chain. Mockable for testing.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(
        &self,
        decision: &Decision,
        voters: &[String],
    ) -> Result<ExecutionReceipt, ExecutionError>;
}

/// Logs the vote and hands back a synthetic reference.
#[derive(Debug, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn submit(
        &self,
        decision: &Decision,
        voters: &[String],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let reference = format!("dry-run-{}", Uuid::new_v4());
        info!(
            action = %decision.action,
            asset = %decision.target_asset,
            fraction = %decision.fraction,
            voters = ?voters,
            reference = %reference,
            "Dry-run execution"
        );
        Ok(ExecutionReceipt { reference })
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Sends `increment()` to the treasury contract through `eth_sendTransaction`.
///
/// Relies on the node holding the sender's key (Anvil, Hardhat). Direction
/// and size of the decision do not change the call.
pub struct JsonRpcExecutor {
    client: Client,
    rpc_url: String,
    contract_address: Option<String>,
    from_address: Option<String>,
    gas: u64,
}

impl JsonRpcExecutor {
    pub fn new(config: &ExecutionConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            contract_address: config.contract_address.clone(),
            from_address: config.from_address.clone(),
            gas: config.gas,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ExecutionError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!(method, url = %self.rpc_url, "JSON-RPC request");

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ExecutionError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .ok_or_else(|| ExecutionError::UnexpectedResponse(format!("{method}: no result")))
    }

    /// Configured sender, or the node's first unlocked account.
    async fn sender(&self) -> Result<String, ExecutionError> {
        if let Some(from) = &self.from_address {
            return Ok(from.clone());
        }
        let accounts = self.call("eth_accounts", json!([])).await?;
        accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ExecutionError::NotConfigured("node exposes no unlocked accounts".to_string())
            })
    }
}

#[async_trait]
impl Executor for JsonRpcExecutor {
    fn name(&self) -> &str {
        "json_rpc"
    }

    async fn submit(
        &self,
        decision: &Decision,
        voters: &[String],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let contract = self.contract_address.as_deref().ok_or_else(|| {
            ExecutionError::NotConfigured("contract address (SAFE_ADDRESS) not set".to_string())
        })?;
        let from = self.sender().await?;

        info!(
            action = %decision.action,
            asset = %decision.target_asset,
            voters = ?voters,
            contract,
            "Submitting vote on-chain"
        );

        let tx = json!({
            "from": from,
            "to": contract,
            "gas": format!("{:#x}", self.gas),
            "data": INCREMENT_SELECTOR,
        });
        let result = self.call("eth_sendTransaction", json!([tx])).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| ExecutionError::UnexpectedResponse(format!("tx hash: {result}")))?;

        info!(tx_hash = hash, "Transaction broadcast");
        Ok(ExecutionReceipt {
            reference: hash.to_string(),
        })
    }
}
