//! Request and response payloads exchanged between the custodian service and
//! its trusted caller, plus the numeric error codes attached to failure
//! responses. Payloads are versioned; the current version lives in [`v1`].

use serde::{Deserialize, Serialize};

pub mod v1;

/// Stable numeric codes for the service error taxonomy.
///
/// The HTTP status conveys the error class; the code pins down the exact
/// variant so callers do not parse messages.
pub mod error_codes {
    /// A key with the requested name already exists.
    pub const KEY_ALREADY_EXISTS: u16 = 1001;
    /// No key record for the requested public key.
    pub const KEY_NOT_FOUND: u16 = 1002;
    /// The passphrase failed to decrypt the key record.
    pub const INVALID_PASSPHRASE: u16 = 1003;
    /// A randomness commitment already exists for a height in the requested
    /// batch; the whole batch was rejected.
    pub const RANDOMNESS_ALREADY_COMMITTED: u16 = 1004;
    /// No randomness commitment exists for the requested height.
    pub const RANDOMNESS_NOT_FOUND: u16 = 1005;
    /// The height was already signed with a different digest.
    pub const DOUBLE_SIGN: u16 = 1006;
    /// The request is structurally invalid (e.g. a zero count).
    pub const INVALID_REQUEST: u16 = 1007;
    /// Backend storage failure.
    pub const INTERNAL: u16 = 1099;
}

/// The failure body returned for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// One of [`error_codes`].
    pub code: u16,
    /// Human-readable description; not meant for programmatic matching.
    pub message: String,
}
