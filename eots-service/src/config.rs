//! Configuration types and CLI/environment parsing for the custodian.
//!
//! Concrete deployments may have a more detailed config and can use the
//! exposed [`CustodianConfig`] and flatten it with `#[clap(flatten)]`.
//!
//! Additionally this module defines the [`Environment`] to assert dev-only
//! code paths.

use clap::{Parser, ValueEnum};
use secrecy::SecretString;

/// The environment the service is running in.
///
/// Main usage for the `Environment` is to call
/// [`Environment::assert_is_dev`]. Code paths that are intended for `dev`
/// only (like in-memory custody databases) shall assert that they are called
/// from the `dev` environment.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Environment {
    /// Production environment.
    Prod,
    /// Development environment.
    Dev,
}

impl Environment {
    /// Asserts that `Environment` is `dev`. Panics if not the case.
    pub fn assert_is_dev(&self) {
        assert!(matches!(self, Environment::Dev), "Is not dev environment")
    }
}

/// The configuration for the EOTS custodian core functionality.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
pub struct CustodianConfig {
    /// The environment of the custodian (either `prod` or `dev`).
    #[clap(long, env = "EOTSD_ENVIRONMENT", default_value = "prod")]
    pub environment: Environment,

    /// The SQLite connection string for the custody database, e.g.
    /// `sqlite:///var/lib/eotsd/custody.db`. An in-memory database
    /// (`sqlite::memory:`) forgets every commitment on shutdown and is
    /// therefore refused outside the `dev` environment.
    #[clap(long, env = "EOTSD_DB_CONNECTION_STRING")]
    pub db_connection_string: SecretString,
}
