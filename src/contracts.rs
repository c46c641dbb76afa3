//! Contract roles and resolve-or-deploy
//!
//! Deployment itself is an external collaborator behind
//! [`ContractDeployer`]; the core only decides whether a deployment is
//! needed at all. An externally supplied address always wins, which is what
//! makes re-running a cycle idempotent at this stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RelayError;
use crate::types::Address;

/// Named contract role within one orchestrated cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractRole {
    /// Messenger on the chain the message is submitted to
    SourceMessenger,
    /// Messenger on the chain the message executes on
    DestMessenger,
    /// The contract whose state the relayed call mutates
    TargetStorage,
}

impl ContractRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractRole::SourceMessenger => "source_messenger",
            ContractRole::DestMessenger => "dest_messenger",
            ContractRole::TargetStorage => "target_storage",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved (role, address) pair. Read-only once resolved for the
/// remainder of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHandle {
    pub role: ContractRole,
    pub address: Address,
}

/// Deployment collaborator. Out of core scope; implementations typically
/// shell out to deployment tooling or a factory contract.
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    async fn deploy(&self, role: ContractRole) -> Result<Address, RelayError>;
}

/// Deployer for environments where every contract must be pre-deployed and
/// supplied through configuration.
pub struct NoDeployer;

#[async_trait]
impl ContractDeployer for NoDeployer {
    async fn deploy(&self, role: ContractRole) -> Result<Address, RelayError> {
        Err(RelayError::Config(format!(
            "no address configured for {} and no deployment collaborator available",
            role
        )))
    }
}

/// Resolve a contract role to a handle, deploying only when no address was
/// supplied. A configured address never triggers a deployment transaction.
pub async fn resolve_or_deploy(
    deployer: &dyn ContractDeployer,
    role: ContractRole,
    configured: Option<&Address>,
) -> Result<ContractHandle, RelayError> {
    if let Some(address) = configured {
        tracing::debug!(role = %role, address = %address, "Using existing contract");
        return Ok(ContractHandle {
            role,
            address: *address,
        });
    }

    let address = deployer.deploy(role).await?;
    tracing::info!(role = %role, address = %address, "Deployed contract");
    Ok(ContractHandle { role, address })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDeployer {
        deploys: AtomicU32,
    }

    #[async_trait]
    impl ContractDeployer for CountingDeployer {
        async fn deploy(&self, _role: ContractRole) -> Result<Address, RelayError> {
            self.deploys.fetch_add(1, Ordering::SeqCst);
            Ok(Address([0x99; 20]))
        }
    }

    #[tokio::test]
    async fn test_configured_address_never_redeploys() {
        let deployer = CountingDeployer {
            deploys: AtomicU32::new(0),
        };
        let configured = Address([0x11; 20]);

        for _ in 0..2 {
            let handle = resolve_or_deploy(
                &deployer,
                ContractRole::TargetStorage,
                Some(&configured),
            )
            .await
            .unwrap();
            assert_eq!(handle.address, configured);
        }

        assert_eq!(deployer.deploys.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_address_deploys() {
        let deployer = CountingDeployer {
            deploys: AtomicU32::new(0),
        };
        let handle = resolve_or_deploy(&deployer, ContractRole::TargetStorage, None)
            .await
            .unwrap();
        assert_eq!(handle.address, Address([0x99; 20]));
        assert_eq!(deployer.deploys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_deployer_reports_missing_config() {
        let err = resolve_or_deploy(&NoDeployer, ContractRole::SourceMessenger, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }
}
