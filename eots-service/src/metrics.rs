//! Metrics definitions for the custodian service.
//!
//! This module defines all metrics keys used by the service and provides a
//! helper [`describe_metrics`] to set metadata for each metric using the
//! `metrics` crate.

/// Metrics key for counting created keys.
pub const METRICS_ID_CUSTODIAN_KEYS_CREATED: &str = "eots.custodian.keys.created";
/// Metrics key for counting committed randomness values (one per height).
pub const METRICS_ID_CUSTODIAN_RANDOMNESS_COMMITTED: &str = "eots.custodian.randomness.committed";
/// Metrics key for counting Schnorr signatures produced.
pub const METRICS_ID_CUSTODIAN_SIGN_SCHNORR: &str = "eots.custodian.sign.schnorr";
/// Metrics key for counting EOTS signatures produced.
pub const METRICS_ID_CUSTODIAN_SIGN_EOTS: &str = "eots.custodian.sign.eots";
/// Metrics key for counting EOTS signing requests answered from the signing
/// record (same height, same digest).
pub const METRICS_ID_CUSTODIAN_SIGN_EOTS_REPLAYS: &str = "eots.custodian.sign.eots.replays";
/// Metrics key for counting rejected attempts to sign an already-signed
/// height with a different digest.
pub const METRICS_ID_CUSTODIAN_DOUBLE_SIGN_REJECTED: &str =
    "eots.custodian.sign.eots.double_sign_rejected";

/// Describe all metrics used by the service.
///
/// This calls the `describe_*` functions from the `metrics` crate to set
/// metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_KEYS_CREATED,
        metrics::Unit::Count,
        "Number of keys created"
    );

    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_RANDOMNESS_COMMITTED,
        metrics::Unit::Count,
        "Number of randomness commitments written"
    );

    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_SIGN_SCHNORR,
        metrics::Unit::Count,
        "Number of Schnorr signatures produced"
    );

    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_SIGN_EOTS,
        metrics::Unit::Count,
        "Number of EOTS signatures produced"
    );

    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_SIGN_EOTS_REPLAYS,
        metrics::Unit::Count,
        "Number of EOTS signing requests answered from the signing record"
    );

    metrics::describe_counter!(
        METRICS_ID_CUSTODIAN_DOUBLE_SIGN_REJECTED,
        metrics::Unit::Count,
        "Number of EOTS signing requests rejected as double-sign attempts"
    );
}
