use axum_test::{TestResponse, TestServer};
use eots_core::keys::EotsPublicKey;
use eots_service::{EotsManager, EotsServiceBuilder, config::CustodianConfig, config::Environment};
use eots_types::ChainId;
use eots_types::api::v1::{
    CreateKeyRequest, CreateKeyResponse, CreateRandomnessRequest, KeyRecordRequest,
    SignEotsRequest, SignSchnorrRequest,
};
use secrecy::SecretString;

pub const PASSPHRASE: &str = "correct horse battery staple";

pub struct TestCustodian {
    pub server: TestServer,
    #[allow(unused)]
    pub manager: EotsManager,
}

impl TestCustodian {
    pub async fn start() -> eyre::Result<Self> {
        Self::start_with_db("sqlite::memory:").await
    }

    pub async fn start_with_db(connection_string: &str) -> eyre::Result<Self> {
        let config = CustodianConfig {
            environment: Environment::Dev,
            db_connection_string: SecretString::from(connection_string),
        };
        let (router, manager) = EotsServiceBuilder::init(&config).await?.build();
        let server = TestServer::builder()
            .http_transport()
            .build(router)
            .expect("Can build test-server");
        Ok(Self { server, manager })
    }

    /// Creates a key with [`PASSPHRASE`] and returns its public key.
    pub async fn create_key(&self, name: &str) -> EotsPublicKey {
        let response = self.post_create_key(name, PASSPHRASE, "").await;
        response.assert_status_ok();
        response.json::<CreateKeyResponse>().public_key
    }

    pub async fn post_create_key(
        &self,
        name: &str,
        passphrase: &str,
        derivation_path: &str,
    ) -> TestResponse {
        self.server
            .post("/v1/keys")
            .json(&CreateKeyRequest {
                name: name.to_string(),
                passphrase: passphrase.to_string(),
                derivation_path: derivation_path.to_string(),
            })
            .await
    }

    pub async fn post_key_record(
        &self,
        public_key: EotsPublicKey,
        passphrase: &str,
    ) -> TestResponse {
        self.server
            .post("/v1/keys/record")
            .json(&KeyRecordRequest {
                public_key,
                passphrase: passphrase.to_string(),
            })
            .await
    }

    pub async fn post_randomness(
        &self,
        public_key: EotsPublicKey,
        chain_id: &ChainId,
        start_height: u64,
        count: u32,
        passphrase: &str,
    ) -> TestResponse {
        self.server
            .post("/v1/randomness")
            .json(&CreateRandomnessRequest {
                public_key,
                chain_id: chain_id.clone(),
                start_height,
                count,
                passphrase: passphrase.to_string(),
            })
            .await
    }

    pub async fn post_sign_schnorr(
        &self,
        public_key: EotsPublicKey,
        digest: [u8; 32],
        passphrase: &str,
    ) -> TestResponse {
        self.server
            .post("/v1/sign/schnorr")
            .json(&SignSchnorrRequest {
                public_key,
                digest,
                passphrase: passphrase.to_string(),
            })
            .await
    }

    pub async fn post_sign_eots(
        &self,
        public_key: EotsPublicKey,
        chain_id: &ChainId,
        digest: [u8; 32],
        height: u64,
        passphrase: &str,
    ) -> TestResponse {
        self.server
            .post("/v1/sign/eots")
            .json(&SignEotsRequest {
                public_key,
                chain_id: chain_id.clone(),
                digest,
                height,
                passphrase: passphrase.to_string(),
            })
            .await
    }
}

/// A fresh file-backed connection string in the system temp dir. Used by
/// tests that restart the custodian, which an in-memory DB cannot survive.
pub fn temp_db_connection_string(tag: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("eots-custodian-{tag}-{:016x}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub fn digest(byte: u8) -> [u8; 32] {
    [byte; 32]
}
