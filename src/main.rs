use std::sync::Arc;

use xdomain_relay::{
    api, config::Config, ChainEnv, ChainTag, HttpChainClient, NoDeployer, Operation, Orchestrator,
};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting cross-domain relay orchestrator");

    let config = Config::load()?;
    tracing::info!(
        source = %config.source.tag,
        dest = %config.dest.tag,
        operation = %config.operation.kind,
        "Configuration loaded"
    );

    let source_client = HttpChainClient::new(
        ChainTag::new(config.source.tag.clone()),
        config.source.rpc_url.clone(),
        config.relay.poll_policy(),
    )?;
    let dest_client = HttpChainClient::new(
        ChainTag::new(config.dest.tag.clone()),
        config.dest.rpc_url.clone(),
        config.relay.poll_policy(),
    )?;

    let chain_a = ChainEnv {
        client: Arc::new(source_client),
        messenger: config.source.messenger_address,
        storage: config.source.storage_address,
    };
    let chain_b = ChainEnv {
        client: Arc::new(dest_client),
        messenger: config.dest.messenger_address,
        storage: config.dest.storage_address,
    };

    // Deployment is left to external tooling; every contract must arrive
    // through configuration.
    let orchestrator = Orchestrator::new(
        chain_a,
        chain_b,
        Arc::new(NoDeployer),
        config.sender,
        config.relay.orchestrator_policy(),
    );

    // Create shutdown channel and signal handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    // Start metrics/health API server
    let api_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tokio::spawn(async move {
        if let Err(e) = api::start_api_server(api_addr).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    let operation = match config.operation.kind.as_str() {
        "withdraw" => Operation::Withdraw {
            value: config.operation.value,
        },
        _ => Operation::Deposit {
            value: config.operation.value,
        },
    };

    tokio::select! {
        result = orchestrator.run(operation) => {
            match result {
                Ok(receipt) => {
                    tracing::info!(
                        message_id = %receipt.message.message_id,
                        tx_hash = %receipt.attempt.tx_hash,
                        relay_tx = ?receipt.relay.relay_tx_hash,
                        value = %format!("0x{}", hex::encode(&receipt.verified_value)),
                        "Cycle verified on destination chain"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Cycle failed");
                    return Err(e.into());
                }
            }
        }
        _ = shutdown_rx.recv() => {
            tracing::info!("Shutdown signal received, abandoning cycle");
        }
    }

    tracing::info!("Cross-domain relay orchestrator stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xdomain_relay=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
