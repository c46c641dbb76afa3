//! Configuration for the orchestrator daemon
//!
//! Loaded from environment variables (with optional .env file), validated
//! once at startup.

use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::orchestrator::OrchestratorPolicy;
use crate::poll::PollPolicy;
use crate::types::Address;

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub source: ChainConfig,
    pub dest: ChainConfig,
    pub sender: Address,
    pub relay: RelayConfig,
    pub operation: OperationConfig,
    pub api_port: u16,
}

/// Wiring for one ledger
#[derive(Clone)]
pub struct ChainConfig {
    pub tag: String,
    pub rpc_url: String,
    pub messenger_address: Option<Address>,
    pub storage_address: Option<Address>,
}

/// Custom Debug that redacts the RPC URL (hosted endpoints embed API keys).
impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("tag", &self.tag)
            .field("rpc_url", &"<redacted>")
            .field("messenger_address", &self.messenger_address)
            .field("storage_address", &self.storage_address)
            .finish()
    }
}

/// Polling and timeout policy
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub relay_deadline_ms: u64,
    pub confirmation_deadline_ms: u64,
    pub confirmations: u32,
    pub retry_limit: u32,
    pub gas_limit: u64,
}

impl RelayConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            deadline: Duration::from_millis(self.relay_deadline_ms),
            retry_limit: self.retry_limit,
        }
    }

    pub fn orchestrator_policy(&self) -> OrchestratorPolicy {
        OrchestratorPolicy {
            gas_limit: self.gas_limit,
            confirmations: self.confirmations,
            confirmation_deadline: Duration::from_millis(self.confirmation_deadline_ms),
            relay_deadline: Duration::from_millis(self.relay_deadline_ms),
            poll: self.poll_policy(),
        }
    }
}

/// The operation the daemon drives once started
#[derive(Debug, Clone)]
pub struct OperationConfig {
    /// "deposit" or "withdraw"
    pub kind: String,
    /// 32-byte value carried by the message
    pub value: [u8; 32],
}

/// Default functions
fn default_poll_interval() -> u64 {
    500
}

fn default_max_poll_interval() -> u64 {
    5_000
}

fn default_relay_deadline() -> u64 {
    120_000
}

fn default_confirmation_deadline() -> u64 {
    60_000
}

fn default_confirmations() -> u32 {
    1
}

fn default_retry_limit() -> u32 {
    3
}

fn default_gas_limit() -> u64 {
    1_000_000
}

fn default_api_port() -> u16 {
    9090
}

fn optional_address(var: &str) -> Result<Option<Address>> {
    match env::var(var) {
        Ok(v) if !v.is_empty() => {
            let addr = Address::from_hex(&v).map_err(|e| eyre!("{}: {}", var, e))?;
            Ok(Some(addr))
        }
        _ => Ok(None),
    }
}

fn env_or_default<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads .env file if present, then reads from environment.
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        let source = ChainConfig {
            tag: env::var("SOURCE_CHAIN_TAG").unwrap_or_else(|_| "source".to_string()),
            rpc_url: env::var("SOURCE_RPC_URL")
                .map_err(|_| eyre!("SOURCE_RPC_URL environment variable is required"))?,
            messenger_address: optional_address("SOURCE_MESSENGER_ADDRESS")?,
            storage_address: optional_address("SOURCE_STORAGE_ADDRESS")?,
        };

        let dest = ChainConfig {
            tag: env::var("DEST_CHAIN_TAG").unwrap_or_else(|_| "dest".to_string()),
            rpc_url: env::var("DEST_RPC_URL")
                .map_err(|_| eyre!("DEST_RPC_URL environment variable is required"))?,
            messenger_address: optional_address("DEST_MESSENGER_ADDRESS")?,
            storage_address: optional_address("DEST_STORAGE_ADDRESS")?,
        };

        let sender_raw = env::var("SENDER_ADDRESS")
            .map_err(|_| eyre!("SENDER_ADDRESS environment variable is required"))?;
        let sender = Address::from_hex(&sender_raw).map_err(|e| eyre!("SENDER_ADDRESS: {}", e))?;

        let relay = RelayConfig {
            poll_interval_ms: env_or_default("POLL_INTERVAL_MS", default_poll_interval()),
            max_poll_interval_ms: env_or_default(
                "MAX_POLL_INTERVAL_MS",
                default_max_poll_interval(),
            ),
            relay_deadline_ms: env_or_default("RELAY_DEADLINE_MS", default_relay_deadline()),
            confirmation_deadline_ms: env_or_default(
                "CONFIRMATION_DEADLINE_MS",
                default_confirmation_deadline(),
            ),
            confirmations: env_or_default("CONFIRMATIONS", default_confirmations()),
            retry_limit: env_or_default("RETRY_LIMIT", default_retry_limit()),
            gas_limit: env_or_default("GAS_LIMIT", default_gas_limit()),
        };

        let value_raw = env::var("OPERATION_VALUE")
            .unwrap_or_else(|_| format!("0x{}", "42".repeat(32)));
        let value_hex = value_raw.strip_prefix("0x").unwrap_or(&value_raw);
        let value_bytes =
            hex::decode(value_hex).wrap_err("OPERATION_VALUE must be valid hex")?;
        if value_bytes.len() != 32 {
            return Err(eyre!(
                "OPERATION_VALUE must be 32 bytes, got {}",
                value_bytes.len()
            ));
        }
        let mut value = [0u8; 32];
        value.copy_from_slice(&value_bytes);

        let operation = OperationConfig {
            kind: env::var("OPERATION").unwrap_or_else(|_| "deposit".to_string()),
            value,
        };

        let config = Config {
            source,
            dest,
            sender,
            relay,
            operation,
            api_port: env_or_default("API_PORT", default_api_port()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.source.rpc_url.is_empty() {
            return Err(eyre!("SOURCE_RPC_URL cannot be empty"));
        }
        if self.dest.rpc_url.is_empty() {
            return Err(eyre!("DEST_RPC_URL cannot be empty"));
        }
        if self.source.tag == self.dest.tag {
            return Err(eyre!(
                "source and dest chain tags must differ, both are {:?}",
                self.source.tag
            ));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(eyre!("POLL_INTERVAL_MS must be greater than 0"));
        }
        if self.relay.max_poll_interval_ms < self.relay.poll_interval_ms {
            return Err(eyre!(
                "MAX_POLL_INTERVAL_MS must be at least POLL_INTERVAL_MS"
            ));
        }
        if self.relay.relay_deadline_ms < self.relay.poll_interval_ms {
            return Err(eyre!("RELAY_DEADLINE_MS must be at least POLL_INTERVAL_MS"));
        }
        if self.relay.confirmations == 0 {
            return Err(eyre!("CONFIRMATIONS must be at least 1"));
        }
        if self.relay.gas_limit == 0 {
            return Err(eyre!("GAS_LIMIT must be greater than 0"));
        }
        match self.operation.kind.as_str() {
            "deposit" | "withdraw" => {}
            other => {
                return Err(eyre!(
                    "OPERATION must be \"deposit\" or \"withdraw\", got {:?}",
                    other
                ));
            }
        }
        Ok(())
    }
}
