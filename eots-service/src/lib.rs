#![deny(missing_docs)]
//! Custody-and-signing service for EOTS finality providers.
//!
//! The service keeps finality-provider signing keys sealed under operator
//! passphrases and produces two kinds of signatures over 32-byte digests:
//! plain BIP-340 Schnorr signatures and EOTS signatures whose one-time
//! randomness is committed to a `(chain, height)` slot ahead of time. The
//! ledger of committed randomness and signing records is the safety core:
//! without it, signing two digests at the same slot would leak the secret key
//! (see [`eots_core::eots::extract_secret_key`]).
//!
//! The main entry point for embedders is the [`EotsServiceBuilder`]. It
//! connects to the custody database, initializes the schema and returns an
//! `axum::Router` that can be incorporated into a larger `axum` server,
//! together with the [`EotsManager`] for direct (non-HTTP) use.
//!
//! Binaries that just want a standalone custodian use [`EotsServer`], which
//! wraps the builder with a TCP listener and a `CancellationToken`-driven
//! graceful shutdown: cancelling the token stops the server, and an
//! unexpected server exit cancels the token so the hosting application can
//! react.

use std::net::SocketAddr;
use std::str::FromStr as _;

use axum::Router;
use eyre::Context as _;
use secrecy::ExposeSecret as _;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::CustodianConfig;

pub(crate) mod api;
pub mod config;
pub mod metrics;
pub(crate) mod services;

pub use services::manager::{EotsManager, KeyRecord, ManagerError};

/// [`EotsServiceBuilder`] to initialize the custodian service.
pub struct EotsServiceBuilder {
    root: Router,
    manager: EotsManager,
}

impl EotsServiceBuilder {
    /// Initializes the custodian service.
    ///
    /// Connects to the custody database (creating the file and schema if
    /// missing), describes the service metrics and prepares the root router
    /// with the health and info endpoints.
    pub async fn init(config: &CustodianConfig) -> eyre::Result<Self> {
        let connection_string = config.db_connection_string.expose_secret();
        if connection_string.contains(":memory:") || connection_string.contains("mode=memory") {
            // an in-memory DB forgets every commitment on shutdown
            config.environment.assert_is_dev();
        }
        tracing::info!("connecting to custody DB..");
        let options = SqliteConnectOptions::from_str(connection_string)
            .context("while parsing DB connection string")?
            .create_if_missing(true);
        // A single pinned connection: an in-memory database dies with its
        // connection, and a single writer sidesteps SQLite lock contention.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("while connecting to custody DB")?;
        services::init_schema(&pool)
            .await
            .context("while initializing custody DB schema")?;
        metrics::describe_metrics();

        let manager = EotsManager::new(pool);
        let root = Router::new()
            .merge(api::health::routes())
            .merge(api::info::routes());
        Ok(Self { root, manager })
    }

    /// Build the `axum` [`Router`] with all custodian endpoints.
    ///
    /// # Returns
    ///
    /// Returns a tuple containing:
    /// - An Axum `Router` instance with the configured REST API routes.
    /// - The [`EotsManager`] for direct use by the hosting application.
    pub fn build(self) -> (Router, EotsManager) {
        let router = self
            .root
            .nest("/v1", api::v1::routes(self.manager.clone()))
            .layer(TraceLayer::new_for_http());
        (router, self.manager)
    }
}

/// A standalone custodian server: the service router behind a TCP listener
/// with graceful shutdown.
pub struct EotsServer {
    cancellation_token: CancellationToken,
    local_addr: SocketAddr,
    listener: Option<TcpListener>,
    router: Option<Router>,
    manager: EotsManager,
    server_task: Option<tokio::task::JoinHandle<eyre::Result<()>>>,
}

impl EotsServer {
    /// Initializes the custodian service and binds the TCP listener.
    pub async fn init(
        config: &CustodianConfig,
        bind_addr: SocketAddr,
        cancellation_token: CancellationToken,
    ) -> eyre::Result<Self> {
        let (router, manager) = EotsServiceBuilder::init(config).await?.build();
        let listener = TcpListener::bind(bind_addr)
            .await
            .context("while binding listener")?;
        let local_addr = listener
            .local_addr()
            .context("while reading local address")?;
        Ok(Self {
            cancellation_token,
            local_addr,
            listener: Some(listener),
            router: Some(router),
            manager,
            server_task: None,
        })
    }

    /// The address the listener is bound to. Useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The custodian manager backing the server.
    pub fn manager(&self) -> &EotsManager {
        &self.manager
    }

    /// A clone of the server's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Spawns the HTTP server task. Fails if already started.
    ///
    /// When the server exits, expectedly or not, the cancellation token is
    /// cancelled so the hosting application observes the shutdown.
    pub fn start(&mut self) -> eyre::Result<()> {
        let (listener, router) = match (self.listener.take(), self.router.take()) {
            (Some(listener), Some(router)) => (listener, router),
            _ => eyre::bail!("server already started"),
        };
        let cancellation_token = self.cancellation_token.clone();
        tracing::info!("listening on {}..", self.local_addr);
        self.server_task = Some(tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown({
                    let cancellation_token = cancellation_token.clone();
                    async move { cancellation_token.cancelled().await }
                })
                .await
                .context("while serving HTTP");
            cancellation_token.cancel();
            result
        }));
        Ok(())
    }

    /// Runs the server until the cancellation token is cancelled, starting it
    /// first if necessary.
    pub async fn run_until_shutdown(mut self) -> eyre::Result<()> {
        if self.server_task.is_none() {
            self.start()?;
        }
        match self.server_task.take() {
            Some(server_task) => server_task.await.context("server task panicked")?,
            None => eyre::bail!("server task went missing"),
        }
    }

    /// Signals the server to shut down gracefully.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }
}
