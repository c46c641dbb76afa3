//! Shared types for cross-domain message cycles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec;
use crate::error::RelayError;

fn parse_fixed<const N: usize>(hex_str: &str, what: &str) -> Result<[u8; N], RelayError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str)
        .map_err(|e| RelayError::Config(format!("invalid hex for {}: {}", what, e)))?;
    if bytes.len() != N {
        return Err(RelayError::Config(format!(
            "{} must be {} bytes, got {}",
            what,
            N,
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Identifier of a ledger reachable through a [`crate::chain::ChainClient`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainTag(pub String);

impl ChainTag {
    pub fn new(tag: impl Into<String>) -> Self {
        ChainTag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account or contract address (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self, RelayError> {
        Ok(Address(parse_fixed::<20>(hex_str, "address")?))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Transaction hash (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_hex(hex_str: &str) -> Result<Self, RelayError> {
        Ok(TxHash(parse_fixed::<32>(hex_str, "tx hash")?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Content-derived identifier correlating a source-chain send with its
/// destination-chain execution (keccak256, 32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub [u8; 32]);

impl MessageId {
    pub fn from_hex(hex_str: &str) -> Result<Self, RelayError> {
        Ok(MessageId(parse_fixed::<32>(hex_str, "message id")?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// One logical message in transit between two ledgers.
///
/// Immutable once created. The identifier is derived from the message
/// content plus sender/nonce context, so an identical resubmission with the
/// same nonce maps to the same id while distinct logical sends never collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossDomainMessage {
    pub source_chain: ChainTag,
    pub dest_chain: ChainTag,
    pub sender: Address,
    pub target: Address,
    pub payload: Vec<u8>,
    pub gas_limit: u64,
    pub nonce: u64,
    pub message_id: MessageId,
}

impl CrossDomainMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_chain: ChainTag,
        dest_chain: ChainTag,
        sender: Address,
        target: Address,
        payload: Vec<u8>,
        gas_limit: u64,
        nonce: u64,
    ) -> Self {
        let message_id = codec::message_id(&sender, &target, &payload, gas_limit, nonce);
        Self {
            source_chain,
            dest_chain,
            sender,
            target,
            payload,
            gas_limit,
            nonce,
            message_id,
        }
    }
}

/// Status of one source-chain submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    Pending,
    Confirmed,
    Failed,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Pending => "pending",
            SendStatus::Confirmed => "confirmed",
            SendStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One submission of a [`CrossDomainMessage`] to the source chain.
/// Owned exclusively by the orchestrator for the duration of a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendAttempt {
    pub tx_hash: TxHash,
    pub confirmations: u32,
    pub status: SendStatus,
    pub submitted_at: DateTime<Utc>,
}

impl SendAttempt {
    pub fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            confirmations: 0,
            status: SendStatus::Pending,
            submitted_at: Utc::now(),
        }
    }
}

/// Destination-chain observation of a message, produced only by the
/// relay watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRecord {
    pub message_id: MessageId,
    pub relayed: bool,
    /// Present iff `relayed`
    pub relay_tx_hash: Option<TxHash>,
    pub observed_at_block: u64,
}

/// Receipt bundling everything known about a completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub message: CrossDomainMessage,
    pub attempt: SendAttempt,
    pub relay: RelayRecord,
    /// Post-state read back from the destination target
    pub verified_value: Vec<u8>,
    pub completed_at: DateTime<Utc>,
}
