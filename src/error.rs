//! Error taxonomy for the relay core
//!
//! Transient transport faults are absorbed inside the polling loop up to the
//! configured retry bound; every other variant propagates to the caller
//! untouched.

use crate::types::MessageId;

/// Failure modes of a read against a remote ledger.
///
/// The split matters for retry decisions: transport faults are retryable,
/// a revert is an application-level answer and is not.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Node unreachable, request timed out, malformed response.
    #[error("transport: {0}")]
    Transport(String),

    /// The call executed and reverted.
    #[error("call reverted: {0}")]
    Revert(String),
}

impl ReadError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ReadError::Transport(_))
    }
}

/// Top-level error type for orchestrated send/verify cycles.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The transaction never reliably entered the source chain.
    /// Never retried automatically — a resubmit needs a fresh nonce.
    #[error("submission failed: {0}")]
    Submission(String),

    /// A confirmation or generic chain wait exceeded its deadline.
    /// The original transaction may still land later; retry is a caller
    /// decision.
    #[error("timed out after {waited_ms}ms ({polls} polls)")]
    Timeout { waited_ms: u64, polls: u32 },

    /// The bridge has not relayed the message within the deadline.
    /// Distinct from [`RelayError::Timeout`] so callers can tell a stalled
    /// bridge from a slow chain read.
    #[error("message {message_id} not relayed after {waited_ms}ms ({polls} polls)")]
    RelayTimeout {
        message_id: MessageId,
        waited_ms: u64,
        polls: u32,
    },

    #[error(transparent)]
    Read(#[from] ReadError),

    /// Destination state does not match the expected post-state after a
    /// confirmed relay. Signals a bridge bug or a concurrent writer; always
    /// surfaced.
    #[error("verification failed: expected {expected}, got {actual}")]
    Verification { expected: String, actual: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
