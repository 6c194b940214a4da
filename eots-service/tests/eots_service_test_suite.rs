use std::time::Duration;

use eots_core::{eots, schnorr};
use eots_service::{EotsServer, config::CustodianConfig};
use eots_types::ChainId;
use eots_types::api::v1::{
    CreateRandomnessResponse, KeyRecordResponse, SignEotsResponse, SignSchnorrResponse,
};
use eots_types::api::{ErrorResponse, error_codes};
use http::StatusCode;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::setup::{PASSPHRASE, TestCustodian, digest, temp_db_connection_string};

mod setup;

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_duplicate_key_names_are_rejected() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    custodian.create_key("alice").await;

    let response = custodian.post_create_key("alice", PASSPHRASE, "").await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::KEY_ALREADY_EXISTS
    );

    // the name is taken regardless of the passphrase
    let response = custodian
        .post_create_key("alice", "another passphrase", "")
        .await;
    response.assert_status(StatusCode::CONFLICT);

    custodian.create_key("bob").await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_key_record_lookup() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let bob = custodian.create_key("bob").await;

    let response = custodian.post_key_record(alice, PASSPHRASE).await;
    response.assert_status_ok();
    let record = response.json::<KeyRecordResponse>();
    assert_eq!(record.name, "alice");
    assert_eq!(record.public_key, alice);

    let record = custodian
        .post_key_record(bob, PASSPHRASE)
        .await
        .json::<KeyRecordResponse>();
    assert_eq!(record.name, "bob");

    // unknown public key
    let unknown = custodian.create_key("throwaway").await;
    let fresh = TestCustodian::start().await?;
    let response = fresh.post_key_record(unknown, PASSPHRASE).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::KEY_NOT_FOUND
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_schnorr_signatures_verify_and_are_deterministic() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let msg = digest(0x42);

    let response = custodian.post_sign_schnorr(alice, msg, PASSPHRASE).await;
    response.assert_status_ok();
    let first = response.json::<SignSchnorrResponse>().signature;
    schnorr::verify(&alice, &msg, &first)?;

    let second = custodian
        .post_sign_schnorr(alice, msg, PASSPHRASE)
        .await
        .json::<SignSchnorrResponse>()
        .signature;
    assert_eq!(first, second);

    // a different digest gets a different nonce
    let other = custodian
        .post_sign_schnorr(alice, digest(0x43), PASSPHRASE)
        .await
        .json::<SignSchnorrResponse>()
        .signature;
    assert_ne!(first.r, other.r);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_eots_signing_against_published_randomness() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let chain = ChainId::from("test-chain");

    let response = custodian
        .post_randomness(alice, &chain, 100, 4, PASSPHRASE)
        .await;
    response.assert_status_ok();
    let published = response
        .json::<CreateRandomnessResponse>()
        .public_randomness;
    assert_eq!(published.len(), 4);

    let msg = digest(0xaa);
    let response = custodian
        .post_sign_eots(alice, &chain, msg, 100, PASSPHRASE)
        .await;
    response.assert_status_ok();
    let signature = response.json::<SignEotsResponse>().signature;
    // the signature must use exactly the randomness published for the height
    assert_eq!(signature.pub_rand, published[0]);
    eots::verify(&alice, &msg, &signature)?;

    // no commitment exists for height 105
    let response = custodian
        .post_sign_eots(alice, &chain, msg, 105, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::RANDOMNESS_NOT_FOUND
    );

    // the same chain id on another height and another chain id on the same
    // height both have their own commitments
    let response = custodian
        .post_sign_eots(alice, &ChainId::from("other-chain"), msg, 100, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_overlapping_batch_fails_entirely() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let chain = ChainId::from("test-chain");

    let published = custodian
        .post_randomness(alice, &chain, 10, 5, PASSPHRASE)
        .await
        .json::<CreateRandomnessResponse>()
        .public_randomness;

    // heights 12..=14 overlap the first batch
    let response = custodian
        .post_randomness(alice, &chain, 12, 5, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::RANDOMNESS_ALREADY_COMMITTED
    );

    // the failed batch must not have written heights 15 and 16
    let response = custodian
        .post_randomness(alice, &chain, 15, 2, PASSPHRASE)
        .await;
    response.assert_status_ok();

    // the original commitment for height 12 is untouched
    let signature = custodian
        .post_sign_eots(alice, &chain, digest(0x01), 12, PASSPHRASE)
        .await
        .json::<SignEotsResponse>()
        .signature;
    assert_eq!(signature.pub_rand, published[2]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_wrong_passphrase_is_rejected_everywhere() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let chain = ChainId::from("test-chain");
    custodian
        .post_randomness(alice, &chain, 1, 1, PASSPHRASE)
        .await
        .assert_status_ok();

    let responses = [
        custodian.post_key_record(alice, "wrong").await,
        custodian.post_randomness(alice, &chain, 2, 1, "wrong").await,
        custodian
            .post_sign_schnorr(alice, digest(0x01), "wrong")
            .await,
        custodian
            .post_sign_eots(alice, &chain, digest(0x01), 1, "wrong")
            .await,
    ];
    for response in responses {
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<ErrorResponse>().code,
            error_codes::INVALID_PASSPHRASE
        );
    }

    // the failed requests had no side effects: height 2 is still free and
    // height 1 is still unsigned
    custodian
        .post_randomness(alice, &chain, 2, 1, PASSPHRASE)
        .await
        .assert_status_ok();
    custodian
        .post_sign_eots(alice, &chain, digest(0x02), 1, PASSPHRASE)
        .await
        .assert_status_ok();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_same_slot_replays_same_digest_and_refuses_new_one() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let chain = ChainId::from("test-chain");
    custodian
        .post_randomness(alice, &chain, 50, 1, PASSPHRASE)
        .await
        .assert_status_ok();

    let first = custodian
        .post_sign_eots(alice, &chain, digest(0xaa), 50, PASSPHRASE)
        .await
        .json::<SignEotsResponse>()
        .signature;

    // the same digest is idempotent
    let replay = custodian
        .post_sign_eots(alice, &chain, digest(0xaa), 50, PASSPHRASE)
        .await
        .json::<SignEotsResponse>()
        .signature;
    assert_eq!(first, replay);

    // a different digest at the signed slot would leak the key
    let response = custodian
        .post_sign_eots(alice, &chain, digest(0xbb), 50, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::DOUBLE_SIGN
    );

    // the rejection changed nothing, the original digest still replays
    let replay = custodian
        .post_sign_eots(alice, &chain, digest(0xaa), 50, PASSPHRASE)
        .await
        .json::<SignEotsResponse>()
        .signature;
    assert_eq!(first, replay);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_commitments_survive_restart() -> eyre::Result<()> {
    let connection_string = temp_db_connection_string("restart");
    let chain = ChainId::from("test-chain");
    let msg = digest(0x77);

    let custodian = TestCustodian::start_with_db(&connection_string).await?;
    let alice = custodian.create_key("alice").await;
    let published = custodian
        .post_randomness(alice, &chain, 7, 1, PASSPHRASE)
        .await
        .json::<CreateRandomnessResponse>()
        .public_randomness;
    drop(custodian);

    let restarted = TestCustodian::start_with_db(&connection_string).await?;
    let signature = restarted
        .post_sign_eots(alice, &chain, msg, 7, PASSPHRASE)
        .await
        .json::<SignEotsResponse>()
        .signature;
    assert_eq!(signature.pub_rand, published[0]);
    eots::verify(&alice, &msg, &signature)?;

    // the key store survived as well
    let response = restarted.post_create_key("alice", PASSPHRASE, "").await;
    response.assert_status(StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_invalid_requests_are_rejected() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let alice = custodian.create_key("alice").await;
    let chain = ChainId::from("test-chain");

    let response = custodian
        .post_randomness(alice, &chain, 10, 0, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<ErrorResponse>().code,
        error_codes::INVALID_REQUEST
    );

    let response = custodian
        .post_randomness(alice, &chain, u64::MAX - 1, 5, PASSPHRASE)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = custodian.post_create_key("", PASSPHRASE, "").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_health_and_version_endpoints() -> eyre::Result<()> {
    let custodian = TestCustodian::start().await?;
    let response = custodian.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("healthy");

    let response = custodian.server.get("/version").await;
    response.assert_status_ok();
    assert!(response.text().contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_server_shuts_down_on_cancellation() -> eyre::Result<()> {
    let config = CustodianConfig {
        environment: eots_service::config::Environment::Dev,
        db_connection_string: SecretString::from("sqlite::memory:"),
    };
    let cancellation_token = CancellationToken::new();
    let server = EotsServer::init(
        &config,
        "127.0.0.1:0".parse()?,
        cancellation_token.clone(),
    )
    .await?;
    assert_ne!(server.local_addr().port(), 0);

    let server_task = tokio::spawn(server.run_until_shutdown());
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancellation_token.cancel();
    tokio::time::timeout(Duration::from_secs(5), server_task).await???;
    Ok(())
}
