//! API module for the EOTS custodian service.
//!
//! This module defines all HTTP endpoints of the custodian and organizes them
//! into submodules:
//!
//! - [`errors`] – Defines the API error type and its mapping to HTTP statuses.
//! - [`health`] – Provides the health endpoint (`/health`).
//! - [`info`] – Info about the service (`/version`).
//! - [`v1`] – Version 1 of the custodian REST endpoints under `/v1`.

pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod info;
pub(crate) mod v1;
