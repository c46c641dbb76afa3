//! Thin abstraction over a remote ledger
//!
//! The orchestrator and relay watcher only ever talk to a chain through
//! [`ChainClient`]; the concrete transport lives in [`http`]. Connections
//! are safe for concurrent read access — every method takes `&self`.

use async_trait::async_trait;
use std::time::Duration;

use crate::contracts::ContractHandle;
use crate::error::{ReadError, RelayError};
use crate::types::{Address, ChainTag, TxHash};

pub mod http;

pub use http::HttpChainClient;

/// A transaction ready for submission. Signing is an external collaborator's
/// concern; the client only carries the signed/signable envelope to the node.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub gas_limit: u64,
}

/// Inclusion proof for a submitted transaction
#[derive(Debug, Clone)]
pub struct ConfirmationReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub confirmations: u32,
    /// False when the transaction was included but reverted
    pub succeeded: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Tag of the ledger this client talks to
    fn chain(&self) -> &ChainTag;

    /// Submit a transaction to the node.
    ///
    /// Fails with [`RelayError::Submission`] on malformed input or node
    /// rejection (insufficient balance, nonce conflict). Never retried
    /// internally: the transaction may have partially entered the mempool,
    /// so the retry decision belongs to the caller.
    async fn submit(&self, tx: SignedTx) -> Result<TxHash, RelayError>;

    /// Block until `tx_hash` is included with at least `min_confirmations`
    /// blocks on top, or fail with [`RelayError::Timeout`] at the deadline.
    async fn wait_for_confirmation(
        &self,
        tx_hash: &TxHash,
        min_confirmations: u32,
        deadline: Duration,
    ) -> Result<ConfirmationReceipt, RelayError>;

    /// Side-effect-free contract read. `signature` is the full method
    /// signature (e.g. `"relayedMessages(bytes32)"`), `args` the 32-byte
    /// call words. Returns the hex-encoded result word.
    ///
    /// [`ReadError::Revert`] is an application-level answer and must not be
    /// retried; [`ReadError::Transport`] is fair game for the polling loop.
    async fn call(
        &self,
        contract: &ContractHandle,
        signature: &str,
        args: &[[u8; 32]],
    ) -> Result<String, ReadError>;

    /// Current head block number
    async fn current_block(&self) -> Result<u64, ReadError>;
}
