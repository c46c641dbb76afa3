//! Relay watcher: turns "submitted on the source chain" into "observed as
//! executed on the destination chain"
//!
//! Cross-domain relay latency is bridge- and congestion-dependent and
//! unbounded in the worst case, so the watcher polls the destination
//! messenger's relay-status lookup with backoff instead of subscribing, and
//! leaves the give-up decision to the caller through an explicit deadline.

use std::sync::Arc;
use std::time::Duration;

use crate::chain::ChainClient;
use crate::codec;
use crate::contracts::ContractHandle;
use crate::error::RelayError;
use crate::metrics;
use crate::poll::{poll_until, PollError, PollPolicy, Probe};
use crate::types::{MessageId, RelayRecord, TxHash};

/// Relay-status lookup on the destination messenger, by message identifier
pub const RELAYED_MESSAGES: &str = "relayedMessages(bytes32)";
/// Transaction hash the messenger recorded for an executed message
pub const RELAY_TRANSACTION_OF: &str = "relayTransactionOf(bytes32)";

pub struct RelayWatcher {
    dest: Arc<dyn ChainClient>,
    messenger: ContractHandle,
    policy: PollPolicy,
}

impl RelayWatcher {
    pub fn new(dest: Arc<dyn ChainClient>, messenger: ContractHandle, policy: PollPolicy) -> Self {
        Self {
            dest,
            messenger,
            policy,
        }
    }

    /// Poll the destination chain until `message_id` is observed as relayed,
    /// or fail with [`RelayError::RelayTimeout`] once `deadline` elapses.
    ///
    /// A read that succeeds but reports "not yet relayed" is expected steady
    /// state and keeps polling; transient read failures are retried with
    /// bounded backoff inside the polling loop. An already-relayed message
    /// returns on the first probe without sleeping.
    pub async fn await_relay(
        &self,
        message_id: &MessageId,
        deadline: Duration,
    ) -> Result<RelayRecord, RelayError> {
        let chain = self.dest.chain().clone();
        tracing::info!(
            chain = %chain,
            message_id = %message_id,
            deadline_ms = deadline.as_millis() as u64,
            "Polling for relay"
        );

        let policy = self.policy.with_deadline(deadline);
        let id_word = *message_id.as_bytes();

        let outcome = poll_until(&policy, |attempt| {
            let chain = chain.clone();
            async move {
                metrics::record_relay_poll(chain.as_str());
                let result = self
                    .dest
                    .call(&self.messenger, RELAYED_MESSAGES, &[id_word])
                    .await?;
                if codec::decode_bool(&result)? {
                    Ok(Probe::Ready(attempt))
                } else {
                    tracing::debug!(message_id = %message_id, attempt, "Not yet relayed");
                    Ok(Probe::NotYet)
                }
            }
        })
        .await
        .map_err(|e| match e {
            PollError::Timeout { waited, polls } => RelayError::RelayTimeout {
                message_id: *message_id,
                waited_ms: waited.as_millis() as u64,
                polls,
            },
            other => other.into_relay_error(),
        })?;

        let relay_tx_hash = self.relay_transaction(&id_word).await?;
        let observed_at_block = self.dest.current_block().await?;

        metrics::record_relay_observed(self.dest.chain().as_str());
        tracing::info!(
            chain = %self.dest.chain(),
            message_id = %message_id,
            polls = outcome.polls,
            elapsed_ms = outcome.waited.as_millis() as u64,
            block = observed_at_block,
            "Relay observed"
        );

        Ok(RelayRecord {
            message_id: *message_id,
            relayed: true,
            relay_tx_hash,
            observed_at_block,
        })
    }

    async fn relay_transaction(&self, id_word: &[u8; 32]) -> Result<Option<TxHash>, RelayError> {
        let result = self
            .dest
            .call(&self.messenger, RELAY_TRANSACTION_OF, &[*id_word])
            .await?;
        let word = codec::decode_word(&result).map_err(RelayError::Read)?;
        if word == [0u8; 32] {
            return Ok(None);
        }
        Ok(Some(TxHash(word)))
    }
}
