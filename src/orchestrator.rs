//! Deposit/withdraw orchestrator
//!
//! Drives one value-carrying message from one ledger to the other through
//! the bridge messenger, then verifies the effect landed: resolve contracts,
//! submit, wait for source confirmation, hand off to the relay watcher,
//! read back the destination post-state.
//!
//! Each call to [`Orchestrator::run`] is one independent cycle owning its
//! own [`SendAttempt`] and [`RelayRecord`]; concurrent cycles share only the
//! chain clients and resolved contract handles, both read-only. Dropping the
//! returned future cancels the cycle at its next suspension point
//! (confirmation wait, relay poll, inter-poll sleep) with nothing left
//! running.

use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::chain::{ChainClient, SignedTx};
use crate::codec;
use crate::contracts::{resolve_or_deploy, ContractDeployer, ContractHandle, ContractRole};
use crate::error::RelayError;
use crate::metrics;
use crate::poll::{poll_until, PollPolicy, Probe};
use crate::types::{Address, CrossDomainMessage, Receipt, SendAttempt, SendStatus};
use crate::watcher::RelayWatcher;

/// Setter invoked on the target through the relayed message
pub const SET_VALUE: &str = "setValue(bytes32)";
/// Last stored value on the target
pub const VALUE: &str = "value()";
/// Number of relayed writes the target has accepted
pub const TOTAL_COUNT: &str = "totalCount()";

/// The two operations exposed outward. Both drive the same send/verify
/// pipeline; they differ only in which ledger the message is submitted to.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Chain A → chain B
    Deposit { value: [u8; 32] },
    /// Chain B → chain A
    Withdraw { value: [u8; 32] },
}

impl Operation {
    pub fn direction(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Withdraw { .. } => "withdraw",
        }
    }

    pub fn value(&self) -> &[u8; 32] {
        match self {
            Operation::Deposit { value } | Operation::Withdraw { value } => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    ResolvingContracts,
    Submitting,
    AwaitingSourceConfirmation,
    AwaitingRelay,
    VerifyingEffect,
    Done,
}

impl CycleState {
    fn as_str(&self) -> &'static str {
        match self {
            CycleState::ResolvingContracts => "resolving_contracts",
            CycleState::Submitting => "submitting",
            CycleState::AwaitingSourceConfirmation => "awaiting_source_confirmation",
            CycleState::AwaitingRelay => "awaiting_relay",
            CycleState::VerifyingEffect => "verifying_effect",
            CycleState::Done => "done",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-sender nonce assignment.
///
/// This is the one serialization point between concurrent cycles on the
/// same sender: nonces are handed out before submission, never inside a
/// polling loop, so cycles cannot race on assignment.
#[derive(Default)]
pub struct NonceManager {
    next: Mutex<HashMap<Address, u64>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, sender: &Address) -> u64 {
        let mut map = self.next.lock().expect("nonce map lock poisoned");
        let counter = map.entry(*sender).or_insert(0);
        let nonce = *counter;
        *counter += 1;
        nonce
    }
}

/// Wiring for one ledger: client plus externally supplied contract
/// addresses (absent addresses are deployed on first use).
#[derive(Clone)]
pub struct ChainEnv {
    pub client: Arc<dyn ChainClient>,
    pub messenger: Option<Address>,
    pub storage: Option<Address>,
}

/// Timeout/retry policy for one orchestrated cycle
#[derive(Debug, Clone)]
pub struct OrchestratorPolicy {
    /// Destination execution budget carried by each message
    pub gas_limit: u64,
    /// Minimum inclusion depth on the source chain
    pub confirmations: u32,
    pub confirmation_deadline: Duration,
    /// Bounded by the bridge's challenge window where one exists
    pub relay_deadline: Duration,
    pub poll: PollPolicy,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            gas_limit: 1_000_000,
            confirmations: 1,
            confirmation_deadline: Duration::from_secs(60),
            relay_deadline: Duration::from_secs(120),
            poll: PollPolicy::default(),
        }
    }
}

pub struct Orchestrator {
    chain_a: ChainEnv,
    chain_b: ChainEnv,
    deployer: Arc<dyn ContractDeployer>,
    sender: Address,
    policy: OrchestratorPolicy,
    nonces: NonceManager,
}

impl Orchestrator {
    pub fn new(
        chain_a: ChainEnv,
        chain_b: ChainEnv,
        deployer: Arc<dyn ContractDeployer>,
        sender: Address,
        policy: OrchestratorPolicy,
    ) -> Self {
        Self {
            chain_a,
            chain_b,
            deployer,
            sender,
            policy,
            nonces: NonceManager::new(),
        }
    }

    /// Run one send/verify cycle to completion.
    ///
    /// Every invocation mints a fresh nonce, so retrying a failed cycle is
    /// always safe — it is a new logical send with a new identifier. A
    /// submission that failed is never resubmitted under the same nonce.
    pub async fn run(&self, operation: Operation) -> Result<Receipt, RelayError> {
        let started = Instant::now();
        let direction = operation.direction();
        let (submit_env, verify_env) = match operation {
            Operation::Deposit { .. } => (&self.chain_a, &self.chain_b),
            Operation::Withdraw { .. } => (&self.chain_b, &self.chain_a),
        };

        tracing::info!(
            direction,
            source = %submit_env.client.chain(),
            dest = %verify_env.client.chain(),
            "Starting cross-domain cycle"
        );

        self.transition(direction, CycleState::ResolvingContracts);
        let source_messenger = resolve_or_deploy(
            self.deployer.as_ref(),
            ContractRole::SourceMessenger,
            submit_env.messenger.as_ref(),
        )
        .await?;
        let dest_messenger = resolve_or_deploy(
            self.deployer.as_ref(),
            ContractRole::DestMessenger,
            verify_env.messenger.as_ref(),
        )
        .await?;
        let target = resolve_or_deploy(
            self.deployer.as_ref(),
            ContractRole::TargetStorage,
            verify_env.storage.as_ref(),
        )
        .await?;

        // Snapshot the write counter before submitting so the post-relay
        // diff is attributable to this message alone.
        let baseline_count = self.read_count(verify_env, &target).await?;

        self.transition(direction, CycleState::Submitting);
        let nonce = self.nonces.next(&self.sender);
        let value = *operation.value();
        let payload = codec::call_data(SET_VALUE, &[value]);
        let message = CrossDomainMessage::new(
            submit_env.client.chain().clone(),
            verify_env.client.chain().clone(),
            self.sender,
            target.address,
            payload,
            self.policy.gas_limit,
            nonce,
        );
        let data = codec::encode_call(&message.target, &message.payload, message.gas_limit);

        let tx_hash = match submit_env
            .client
            .submit(SignedTx {
                from: self.sender,
                to: source_messenger.address,
                data,
                gas_limit: message.gas_limit,
            })
            .await
        {
            Ok(tx_hash) => {
                metrics::record_submission(submit_env.client.chain().as_str(), true);
                tx_hash
            }
            Err(e) => {
                metrics::record_submission(submit_env.client.chain().as_str(), false);
                tracing::error!(
                    direction,
                    message_id = %message.message_id,
                    error = %e,
                    "Submission failed, cycle abandoned"
                );
                return Err(e);
            }
        };
        let mut attempt = SendAttempt::new(tx_hash);
        tracing::info!(
            direction,
            message_id = %message.message_id,
            nonce,
            tx_hash = %tx_hash,
            "Message submitted"
        );

        self.transition(direction, CycleState::AwaitingSourceConfirmation);
        let confirmation = submit_env
            .client
            .wait_for_confirmation(
                &tx_hash,
                self.policy.confirmations,
                self.policy.confirmation_deadline,
            )
            .await?;
        if !confirmation.succeeded {
            attempt.status = SendStatus::Failed;
            return Err(RelayError::Submission(format!(
                "transaction {} reverted on source chain",
                tx_hash
            )));
        }
        attempt.confirmations = confirmation.confirmations;
        attempt.status = SendStatus::Confirmed;

        self.transition(direction, CycleState::AwaitingRelay);
        let watcher = RelayWatcher::new(
            verify_env.client.clone(),
            dest_messenger,
            self.policy.poll.clone(),
        );
        let relay = watcher
            .await_relay(&message.message_id, self.policy.relay_deadline)
            .await?;

        self.transition(direction, CycleState::VerifyingEffect);
        let actual = self.read_value(verify_env, &target).await?;
        if actual != value {
            metrics::record_verification_failure(verify_env.client.chain().as_str());
            return Err(RelayError::Verification {
                expected: format!("0x{}", hex::encode(value)),
                actual: format!("0x{}", hex::encode(actual)),
            });
        }
        let count = self.read_count(verify_env, &target).await?;
        if count != baseline_count + 1 {
            metrics::record_verification_failure(verify_env.client.chain().as_str());
            return Err(RelayError::Verification {
                expected: format!("totalCount {}", baseline_count + 1),
                actual: format!("totalCount {}", count),
            });
        }

        self.transition(direction, CycleState::Done);
        metrics::record_cycle(direction, started.elapsed().as_secs_f64());
        tracing::info!(
            direction,
            message_id = %message.message_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        Ok(Receipt {
            message,
            attempt,
            relay,
            verified_value: actual.to_vec(),
            completed_at: Utc::now(),
        })
    }

    fn transition(&self, direction: &str, state: CycleState) {
        tracing::debug!(direction, state = %state, "Cycle state");
    }

    async fn read_value(
        &self,
        env: &ChainEnv,
        target: &ContractHandle,
    ) -> Result<[u8; 32], RelayError> {
        self.read_word(env, target, VALUE).await
    }

    async fn read_count(&self, env: &ChainEnv, target: &ContractHandle) -> Result<u64, RelayError> {
        let word = self.read_word(env, target, TOTAL_COUNT).await?;
        let mut out = [0u8; 8];
        out.copy_from_slice(&word[24..]);
        Ok(u64::from_be_bytes(out))
    }

    /// One logical read through the polling loop so transient transport
    /// faults are absorbed up to the retry bound. A successful read is
    /// ready immediately; only errors cause re-probing.
    async fn read_word(
        &self,
        env: &ChainEnv,
        target: &ContractHandle,
        signature: &str,
    ) -> Result<[u8; 32], RelayError> {
        let outcome = poll_until(&self.policy.poll, |_| async move {
            let result = env.client.call(target, signature, &[]).await?;
            Ok(Probe::Ready(codec::decode_word(&result)?))
        })
        .await
        .map_err(|e| e.into_relay_error())?;
        Ok(outcome.value)
    }
}
