//! xdomain-relay: Cross-Domain Message Orchestrator & Relay Watcher
//!
//! Drives a value-carrying message from one ledger ("chain A") to another
//! ("chain B") through an asynchronous bridge messenger, then confirms the
//! message's effect landed on the remote side — all under bounded
//! retry/backoff and explicit timeout policy.
//!
//! - **Types** - `CrossDomainMessage`, `RelayRecord`, `SendAttempt`, ids
//! - **Codec** - deterministic message encoding + keccak256 identifiers
//! - **Chain** - `ChainClient` trait and the JSON-RPC implementation
//! - **Poll** - the shared bounded-retry polling primitive
//! - **Watcher** - destination-chain relay observation
//! - **Contracts** - contract roles and resolve-or-deploy
//! - **Orchestrator** - the send/confirm/relay/verify state machine
//! - **Testing** - in-memory chain and deployer doubles
//!
//! The orchestrator's [`Orchestrator::run`] is the sole outward entry
//! point; deployment, signing, and configuration sources are collaborators
//! behind narrow interfaces.

pub mod api;
pub mod chain;
pub mod codec;
pub mod config;
pub mod contracts;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod poll;
pub mod testing;
pub mod types;
pub mod watcher;

// Re-export commonly used items at the crate root
pub use chain::{ChainClient, ConfirmationReceipt, HttpChainClient, SignedTx};
pub use config::Config;
pub use contracts::{resolve_or_deploy, ContractDeployer, ContractHandle, ContractRole, NoDeployer};
pub use error::{ReadError, RelayError};
pub use orchestrator::{
    ChainEnv, NonceManager, Operation, Orchestrator, OrchestratorPolicy,
};
pub use poll::{poll_until, PollError, PollOutcome, PollPolicy, Probe};
pub use types::{
    Address, ChainTag, CrossDomainMessage, MessageId, Receipt, RelayRecord, SendAttempt,
    SendStatus, TxHash,
};
pub use watcher::RelayWatcher;
