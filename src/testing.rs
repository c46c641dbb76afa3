//! In-memory test doubles for the chain client and deployment collaborator
//!
//! Used by the crate's own unit and integration tests. The mock chain is
//! scriptable: relay observation can be armed to fire after a fixed number
//! of status probes, applying the storage effect atomically when it does,
//! which mirrors how a real bridge makes the relayed flag and the state
//! change visible together.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chain::{ChainClient, ConfirmationReceipt, SignedTx};
use crate::codec;
use crate::contracts::{ContractDeployer, ContractHandle, ContractRole};
use crate::error::{ReadError, RelayError};
use crate::types::{Address, ChainTag, MessageId, TxHash};

struct RelayScript {
    after_polls: u32,
    payload: Vec<u8>,
    count_delta: u64,
}

struct MockState {
    block: u64,
    relay_polls: u32,
    relay_script: Option<RelayScript>,
    relayed: HashMap<MessageId, TxHash>,
    storage_value: [u8; 32],
    total_count: u64,
    read_failures: u32,
    submissions: Vec<SignedTx>,
    reject_submissions: bool,
    confirm_reverts: bool,
}

/// Scriptable in-memory ledger
#[derive(Clone)]
pub struct MockChain {
    chain: ChainTag,
    state: Arc<Mutex<MockState>>,
}

fn word_hex(word: [u8; 32]) -> String {
    format!("0x{}", hex::encode(word))
}

impl MockChain {
    pub fn new(chain: ChainTag) -> Self {
        Self {
            chain,
            state: Arc::new(Mutex::new(MockState {
                block: 100,
                relay_polls: 0,
                relay_script: None,
                relayed: HashMap::new(),
                storage_value: [0u8; 32],
                total_count: 0,
                read_failures: 0,
                submissions: Vec::new(),
                reject_submissions: false,
                confirm_reverts: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock chain lock poisoned")
    }

    /// Arm relay observation: whichever message id is queried will report
    /// relayed on the `after_polls`-th status probe, applying `payload` to
    /// storage and bumping the write counter by one at that moment.
    pub fn script_relay_after(&self, after_polls: u32, payload: Vec<u8>) {
        self.script_relay_effect(after_polls, payload, 1);
    }

    /// Like [`MockChain::script_relay_after`] but with an explicit counter
    /// delta, for simulating a concurrent writer racing the cycle.
    pub fn script_relay_effect(&self, after_polls: u32, payload: Vec<u8>, count_delta: u64) {
        self.lock().relay_script = Some(RelayScript {
            after_polls,
            payload,
            count_delta,
        });
    }

    /// Fail the next `n` reads with a transport error
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().read_failures = n;
    }

    /// Make submissions fail with a node rejection
    pub fn reject_submissions(&self) {
        self.lock().reject_submissions = true;
    }

    /// Make submitted transactions confirm as reverted
    pub fn confirm_reverts(&self) {
        self.lock().confirm_reverts = true;
    }

    pub fn set_total_count(&self, count: u64) {
        self.lock().total_count = count;
    }

    /// Number of relay-status probes served so far
    pub fn relay_polls(&self) -> u32 {
        self.lock().relay_polls
    }

    pub fn current_block_sync(&self) -> u64 {
        self.lock().block
    }

    pub fn storage_value(&self) -> [u8; 32] {
        self.lock().storage_value
    }

    pub fn total_count(&self) -> u64 {
        self.lock().total_count
    }

    pub fn submissions(&self) -> Vec<SignedTx> {
        self.lock().submissions.clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain(&self) -> &ChainTag {
        &self.chain
    }

    async fn submit(&self, tx: SignedTx) -> Result<TxHash, RelayError> {
        let mut state = self.lock();
        if state.reject_submissions {
            return Err(RelayError::Submission(
                "node rejected transaction: insufficient funds".into(),
            ));
        }

        let mut preimage = tx.data.clone();
        preimage.extend_from_slice(&(state.submissions.len() as u64).to_be_bytes());
        let tx_hash = TxHash(codec::keccak256(&preimage));

        state.submissions.push(tx);
        state.block += 1;
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: &TxHash,
        min_confirmations: u32,
        _deadline: Duration,
    ) -> Result<ConfirmationReceipt, RelayError> {
        let state = self.lock();
        Ok(ConfirmationReceipt {
            tx_hash: *tx_hash,
            block_number: state.block,
            confirmations: min_confirmations.max(1),
            succeeded: !state.confirm_reverts,
        })
    }

    async fn call(
        &self,
        _contract: &ContractHandle,
        signature: &str,
        args: &[[u8; 32]],
    ) -> Result<String, ReadError> {
        let mut state = self.lock();

        if state.read_failures > 0 {
            state.read_failures -= 1;
            return Err(ReadError::Transport("mock: connection refused".into()));
        }

        match signature {
            crate::watcher::RELAYED_MESSAGES => {
                let id = MessageId(args[0]);
                state.relay_polls += 1;

                if state.relayed.contains_key(&id) {
                    return Ok(word_hex(codec::to_word(&[1])));
                }

                let fire = state
                    .relay_script
                    .as_ref()
                    .map(|s| state.relay_polls >= s.after_polls)
                    .unwrap_or(false);
                if fire {
                    let script = state.relay_script.take().expect("script checked above");
                    let mut preimage = b"relay".to_vec();
                    preimage.extend_from_slice(id.as_bytes());
                    state.relayed.insert(id, TxHash(codec::keccak256(&preimage)));
                    state.storage_value = codec::to_word(&script.payload);
                    state.total_count += script.count_delta;
                    state.block += 1;
                    return Ok(word_hex(codec::to_word(&[1])));
                }

                Ok(word_hex([0u8; 32]))
            }
            crate::watcher::RELAY_TRANSACTION_OF => {
                let id = MessageId(args[0]);
                match state.relayed.get(&id) {
                    Some(tx_hash) => Ok(word_hex(*tx_hash.as_bytes())),
                    None => Ok(word_hex([0u8; 32])),
                }
            }
            "value()" => Ok(word_hex(state.storage_value)),
            "totalCount()" => Ok(word_hex(codec::to_word(&state.total_count.to_be_bytes()))),
            other => Err(ReadError::Revert(format!("unknown method {}", other))),
        }
    }

    async fn current_block(&self) -> Result<u64, ReadError> {
        Ok(self.lock().block)
    }
}

/// Deployer that mints deterministic addresses and counts invocations
pub struct CountingDeployer {
    deploys: AtomicU32,
}

impl CountingDeployer {
    pub fn new() -> Self {
        Self {
            deploys: AtomicU32::new(0),
        }
    }

    pub fn deploy_count(&self) -> u32 {
        self.deploys.load(Ordering::SeqCst)
    }
}

impl Default for CountingDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractDeployer for CountingDeployer {
    async fn deploy(&self, role: ContractRole) -> Result<Address, RelayError> {
        let n = self.deploys.fetch_add(1, Ordering::SeqCst);
        let mut addr = [0u8; 20];
        addr[0] = match role {
            ContractRole::SourceMessenger => 0xa0,
            ContractRole::DestMessenger => 0xb0,
            ContractRole::TargetStorage => 0xc0,
        };
        addr[19] = n as u8 + 1;
        Ok(Address(addr))
    }
}
