//! Version 1 of the custodian REST endpoints.
//!
//! - `POST /keys` – generate and store a new passphrase-sealed key.
//! - `POST /keys/record` – load the record of a stored key.
//! - `POST /randomness` – commit public randomness for a height range.
//! - `POST /sign/schnorr` – plain BIP-340 signature over a digest.
//! - `POST /sign/eots` – one-time signature bound to a (chain, height) slot.
//!
//! All endpoints take their parameters as a JSON body because every request
//! carries the key's passphrase; passphrases never belong in a URL.

use axum::{Json, Router, routing::post};
use eots_types::api::v1::{
    CreateKeyRequest, CreateKeyResponse, CreateRandomnessRequest, CreateRandomnessResponse,
    KeyRecordRequest, KeyRecordResponse, SignEotsRequest, SignEotsResponse, SignSchnorrRequest,
    SignSchnorrResponse,
};

use crate::api::errors::ApiError;
use crate::services::manager::EotsManager;

/// Create a router containing the v1 endpoints.
pub(crate) fn routes(manager: EotsManager) -> Router {
    Router::new()
        .route("/keys", {
            let manager = manager.clone();
            post(move |request| create_key(manager.clone(), request))
        })
        .route("/keys/record", {
            let manager = manager.clone();
            post(move |request| key_record(manager.clone(), request))
        })
        .route("/randomness", {
            let manager = manager.clone();
            post(move |request| create_randomness(manager.clone(), request))
        })
        .route("/sign/schnorr", {
            let manager = manager.clone();
            post(move |request| sign_schnorr(manager.clone(), request))
        })
        .route(
            "/sign/eots",
            post(move |request| sign_eots(manager.clone(), request)),
        )
}

/// Generates a new key sealed with the request's passphrase.
///
/// Returns `200 OK` with the new x-only public key.
/// Returns `409 Conflict` if a key with the name already exists.
async fn create_key(
    manager: EotsManager,
    Json(request): Json<CreateKeyRequest>,
) -> Result<Json<CreateKeyResponse>, ApiError> {
    let derivation_path = match request.derivation_path.as_str() {
        "" => None,
        path => Some(path),
    };
    let public_key = manager
        .create_key(&request.name, &request.passphrase, derivation_path)
        .await?;
    Ok(Json(CreateKeyResponse { public_key }))
}

/// Loads the record of the key identified by its public key.
///
/// Returns `200 OK` with the key's name and public key.
/// Returns `404 Not Found` for unknown keys, `401 Unauthorized` for a wrong
/// passphrase.
async fn key_record(
    manager: EotsManager,
    Json(request): Json<KeyRecordRequest>,
) -> Result<Json<KeyRecordResponse>, ApiError> {
    let record = manager
        .key_record(&request.public_key, &request.passphrase)
        .await?;
    Ok(Json(KeyRecordResponse {
        name: record.name,
        public_key: record.public_key,
    }))
}

/// Commits public randomness for `count` heights starting at `start_height`.
///
/// Returns `200 OK` with the public commitments in height order.
/// Returns `409 Conflict` if any height in the range is already committed;
/// in that case nothing is written.
async fn create_randomness(
    manager: EotsManager,
    Json(request): Json<CreateRandomnessRequest>,
) -> Result<Json<CreateRandomnessResponse>, ApiError> {
    let public_randomness = manager
        .create_randomness_pair_list(
            &request.public_key,
            &request.chain_id,
            request.start_height,
            request.count,
            &request.passphrase,
        )
        .await?;
    Ok(Json(CreateRandomnessResponse { public_randomness }))
}

/// Produces a plain BIP-340 Schnorr signature over the digest.
///
/// Returns `200 OK` with the 64-byte signature.
async fn sign_schnorr(
    manager: EotsManager,
    Json(request): Json<SignSchnorrRequest>,
) -> Result<Json<SignSchnorrResponse>, ApiError> {
    let signature = manager
        .sign_schnorr(&request.public_key, &request.digest, &request.passphrase)
        .await?;
    Ok(Json(SignSchnorrResponse { signature }))
}

/// Produces an EOTS signature over the digest at the requested slot.
///
/// Returns `200 OK` with the signature. Repeating the same digest for a
/// signed slot returns the recorded signature.
/// Returns `404 Not Found` if no randomness is committed for the height.
/// Returns `403 Forbidden` if the slot was already signed for a different
/// digest.
async fn sign_eots(
    manager: EotsManager,
    Json(request): Json<SignEotsRequest>,
) -> Result<Json<SignEotsResponse>, ApiError> {
    let signature = manager
        .sign_eots(
            &request.public_key,
            &request.chain_id,
            &request.digest,
            request.height,
            &request.passphrase,
        )
        .await?;
    Ok(Json(SignEotsResponse { signature }))
}
