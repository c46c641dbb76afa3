//! JSON-RPC [`ChainClient`] implementation over HTTP

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::codec;
use crate::contracts::ContractHandle;
use crate::error::{ReadError, RelayError};
use crate::poll::{poll_until, PollPolicy, Probe};
use crate::types::{ChainTag, TxHash};

use super::{ChainClient, ConfirmationReceipt, SignedTx};

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Transaction receipt as returned by the node
#[derive(Debug, Deserialize)]
struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    status: Option<String>,
}

fn parse_quantity(hex_str: &str) -> Result<u64, ReadError> {
    u64::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .map_err(|e| ReadError::Transport(format!("bad quantity {:?}: {}", hex_str, e)))
}

/// Generic JSON-RPC client for one ledger endpoint
pub struct HttpChainClient {
    chain: ChainTag,
    rpc_url: String,
    client: Client,
    poll: PollPolicy,
}

impl HttpChainClient {
    pub fn new(chain: ChainTag, rpc_url: String, poll: PollPolicy) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            chain,
            rpc_url,
            client,
            poll,
        })
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, ReadError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReadError::Transport(format!("{}: {}", method, e)))?
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| ReadError::Transport(format!("{}: malformed response: {}", method, e)))?;

        if let Some(error) = response.error {
            // The node answered; distinguish an executed-and-reverted call
            // from everything else the RPC layer can throw at us.
            let lower = error.message.to_lowercase();
            if lower.contains("revert") {
                return Err(ReadError::Revert(error.message));
            }
            return Err(ReadError::Transport(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(response.result)
    }

    async fn rpc_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ReadError> {
        self.rpc(method, params)
            .await?
            .ok_or_else(|| ReadError::Transport(format!("{}: empty result", method)))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, ReadError> {
        self.rpc(
            "eth_getTransactionReceipt",
            serde_json::json!([tx_hash.to_hex()]),
        )
        .await
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    fn chain(&self) -> &ChainTag {
        &self.chain
    }

    async fn submit(&self, tx: SignedTx) -> Result<TxHash, RelayError> {
        let params = serde_json::json!([{
            "from": tx.from.to_hex(),
            "to": tx.to.to_hex(),
            "gas": format!("0x{:x}", tx.gas_limit),
            "data": format!("0x{}", hex::encode(&tx.data)),
        }]);

        let result: String = self
            .rpc_required("eth_sendTransaction", params)
            .await
            .map_err(|e| RelayError::Submission(e.to_string()))?;

        let tx_hash = TxHash::from_hex(&result)
            .map_err(|e| RelayError::Submission(format!("node returned bad tx hash: {}", e)))?;

        tracing::debug!(chain = %self.chain, tx_hash = %tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: &TxHash,
        min_confirmations: u32,
        deadline: Duration,
    ) -> Result<ConfirmationReceipt, RelayError> {
        let policy = self.poll.with_deadline(deadline);

        let outcome = poll_until(&policy, |_| async move {
            let receipt = match self.transaction_receipt(tx_hash).await? {
                Some(r) => r,
                None => return Ok(Probe::NotYet),
            };

            if receipt.status.as_deref() == Some("0x0") {
                let block_number = receipt
                    .block_number
                    .as_deref()
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or_default();
                return Ok(Probe::Ready(ConfirmationReceipt {
                    tx_hash: *tx_hash,
                    block_number,
                    confirmations: 0,
                    succeeded: false,
                }));
            }

            let tx_block = match receipt.block_number.as_deref() {
                Some(hex_block) => parse_quantity(hex_block)?,
                None => return Ok(Probe::NotYet),
            };
            let head = self.current_block().await?;
            let confirmations = head.saturating_sub(tx_block) + 1;

            if confirmations >= min_confirmations as u64 {
                Ok(Probe::Ready(ConfirmationReceipt {
                    tx_hash: *tx_hash,
                    block_number: tx_block,
                    confirmations: confirmations as u32,
                    succeeded: true,
                }))
            } else {
                Ok(Probe::NotYet)
            }
        })
        .await
        .map_err(|e| e.into_relay_error())?;

        Ok(outcome.value)
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        signature: &str,
        args: &[[u8; 32]],
    ) -> Result<String, ReadError> {
        let data = codec::call_data(signature, args);
        let params = serde_json::json!([
            {
                "to": contract.address.to_hex(),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ]);

        self.rpc_required("eth_call", params).await
    }

    async fn current_block(&self) -> Result<u64, ReadError> {
        let hex_block: String = self.rpc_required("eth_blockNumber", serde_json::json!([])).await?;
        parse_quantity(&hex_block)
    }
}
