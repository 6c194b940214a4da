use std::{net::SocketAddr, process::ExitCode};

use clap::Parser;
use eots_service::{EotsServer, config::CustodianConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// The configuration for the standalone custodian binary.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
pub struct ExampleCustodianConfig {
    /// The bind addr of the AXUM server
    #[clap(long, env = "EOTSD_BIND_ADDR", default_value = "127.0.0.1:4321")]
    pub bind_addr: SocketAddr,

    /// The custodian service config
    #[clap(flatten)]
    pub service_config: CustodianConfig,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eots_service_example=trace,info")),
        )
        .init();

    let config = ExampleCustodianConfig::parse();
    let result = start_service(config).await;
    match result {
        Ok(()) => {
            tracing::info!("good night!");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            // we don't want to double print the error therefore we just return FAILURE
            tracing::error!("{err:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn start_service(config: ExampleCustodianConfig) -> eyre::Result<()> {
    tracing::info!("starting eots-service..");
    let cancellation_token = CancellationToken::new();

    tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("cannot listen for ctrl-c: {err:?}");
            }
            tracing::info!("received shutdown signal..");
            cancellation_token.cancel();
        }
    });

    let server = EotsServer::init(
        &config.service_config,
        config.bind_addr,
        cancellation_token,
    )
    .await?;
    tracing::info!("everything started successfully - now waiting for shutdown...");
    server.run_until_shutdown().await
}
