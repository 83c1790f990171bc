use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::WalletCoreConfig;
use crate::crypto::key_deriver::SIGNATURE_SIZE;
use crate::crypto::{
    DeriveKeyParams, DerivedKeyMaterial, HdWalletDetails, HdWalletService, SignMetadata,
};
use crate::error::{WalletError, WalletResult};
use crate::signing::{
    arbitrary_data_schema, arc60_schema, report_sign_failure, report_sign_success,
    FailureSurface, SignRequest, SignRequestKind, SigningStore, Transport,
};
use crate::storage::KeyValueStorage;

// Core Initialization

/// `filter` unless `RUST_LOG` is set; `filter` must parse either way
fn env_filter(filter: &str) -> WalletResult<EnvFilter> {
    let configured = EnvFilter::try_new(filter)
        .map_err(|err| WalletError::Config(format!("invalid log filter: {err}")))?;
    Ok(EnvFilter::try_from_default_env().unwrap_or(configured))
}

/// Install the process-wide `fmt` subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(filter: &str) -> WalletResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .try_init()
        .map_err(|err| WalletError::Config(format!("unable to install subscriber: {err}")))
}

/// Entry point for the app shell: HD engine plus signing queue
#[derive(Debug)]
pub struct WalletCore {
    config: WalletCoreConfig,
    hd_wallet: HdWalletService,
    signing_store: Arc<SigningStore>,
}

impl WalletCore {
    pub fn new(config: WalletCoreConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        let hd_wallet = HdWalletService::new().with_word_count(config.mnemonic_words);
        let signing_store = Arc::new(SigningStore::with_config(storage, &config));
        info!(pending = signing_store.len(), "wallet core ready");
        Self {
            config,
            hd_wallet,
            signing_store,
        }
    }

    /// [`WalletCore::new`] after installing logging from `config.log_filter`
    ///
    /// A subscriber installed earlier by the host stays in place.
    pub fn bootstrap(
        config: WalletCoreConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> WalletResult<Self> {
        let filter = env_filter(&config.log_filter)?;
        if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
            debug!("tracing subscriber already installed");
        }
        Ok(Self::new(config, storage))
    }

    pub fn config(&self) -> &WalletCoreConfig {
        &self.config
    }

    pub fn hd_wallet(&self) -> &HdWalletService {
        &self.hd_wallet
    }

    pub fn signing_store(&self) -> &Arc<SigningStore> {
        &self.signing_store
    }

    // --- Key Management ---

    pub fn create_mnemonic(&self) -> WalletResult<String> {
        self.hd_wallet.create_mnemonic()
    }

    /// Key material for `account`/`key_index` under the configured derivation type
    pub async fn derive_key(
        &self,
        mnemonic: &str,
        account: u32,
        key_index: u32,
    ) -> WalletResult<DerivedKeyMaterial> {
        let params = DeriveKeyParams::new(mnemonic)
            .account(account)
            .key_index(key_index)
            .derivation_type(self.config.default_derivation_type);
        self.hd_wallet.derive_key(params).await
    }

    // --- Sign Requests ---

    pub fn submit_request(&self, request: SignRequest) -> bool {
        self.signing_store.add_sign_request(request)
    }

    /// Sign `txn_bytes` for a queued request
    ///
    /// Success completes the request. A failure is reported and the request
    /// stays queued for retry or rejection.
    pub async fn sign_request_transaction(
        &self,
        request: &SignRequest,
        mnemonic: &str,
        details: &HdWalletDetails,
        txn_bytes: &[u8],
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        match self
            .hd_wallet
            .sign_transaction(mnemonic, details, txn_bytes)
            .await
        {
            Ok(signature) => {
                self.complete_request(request, &[signature.to_vec()]);
                Ok(signature)
            }
            Err(err) => {
                self.fail_request(request, &err);
                Err(err)
            }
        }
    }

    /// Sign every payload of an arbitrary-data or ARC-60 request
    ///
    /// `accounts` maps signer addresses to their HD descriptors. Settles the
    /// request like [`WalletCore::sign_request_transaction`]. Validation
    /// errors (wrong request kind, unknown signer) are returned unsettled.
    pub async fn sign_request_data(
        &self,
        request: &SignRequest,
        mnemonic: &str,
        accounts: &HashMap<String, HdWalletDetails>,
    ) -> WalletResult<Vec<[u8; SIGNATURE_SIZE]>> {
        match self.sign_payloads(request, mnemonic, accounts).await {
            Ok(signatures) => {
                let raw: Vec<Vec<u8>> = signatures.iter().map(|sig| sig.to_vec()).collect();
                self.complete_request(request, &raw);
                Ok(signatures)
            }
            Err(err @ WalletError::Validation(_)) => Err(err),
            Err(err) => {
                self.fail_request(request, &err);
                Err(err)
            }
        }
    }

    async fn sign_payloads(
        &self,
        request: &SignRequest,
        mnemonic: &str,
        accounts: &HashMap<String, HdWalletDetails>,
    ) -> WalletResult<Vec<[u8; SIGNATURE_SIZE]>> {
        match &request.kind {
            SignRequestKind::Transactions(_) => Err(WalletError::Validation(
                "transaction requests are signed with sign_request_transaction".to_string(),
            )),
            SignRequestKind::ArbitraryData(arbitrary) => {
                let metadata = SignMetadata::base64(arbitrary_data_schema());
                let mut signatures = Vec::with_capacity(arbitrary.data.len());
                for item in &arbitrary.data {
                    let details = signer_details(accounts, &item.signer)?;
                    let signature = self
                        .hd_wallet
                        .sign_data_with_metadata(mnemonic, details, item.data.as_bytes(), &metadata)
                        .await?;
                    signatures.push(signature);
                }
                Ok(signatures)
            }
            SignRequestKind::Arc60(arc60) => {
                let details = signer_details(accounts, &arc60.signer)?;
                let metadata = SignMetadata {
                    encoding: arc60.encoding,
                    schema: arc60_schema(arc60.scope),
                };
                let signature = self
                    .hd_wallet
                    .sign_data_with_metadata(mnemonic, details, arc60.data.as_bytes(), &metadata)
                    .await?;
                Ok(vec![signature])
            }
        }
    }

    /// User confirmed and signing succeeded
    pub fn complete_request(&self, request: &SignRequest, signatures: &[Vec<u8>]) -> bool {
        report_sign_success(request, signatures);
        let removed = self.signing_store.remove_sign_request(request);
        debug!(request_id = ?request.id(), removed, "sign request completed");
        removed
    }

    /// User declined: dequeue, and tell external callers
    pub fn reject_request(&self, request: &SignRequest) -> bool {
        let removed = self.signing_store.remove_sign_request(request);
        if request.transport != Transport::Algod {
            let error = WalletError::Validation("request rejected by user".to_string());
            report_sign_failure(request, &error);
        }
        debug!(request_id = ?request.id(), removed, "sign request rejected");
        removed
    }

    /// Report a signing failure; the request stays queued
    pub fn fail_request(&self, request: &SignRequest, error: &WalletError) -> FailureSurface {
        report_sign_failure(request, error)
    }
}

fn signer_details<'a>(
    accounts: &'a HashMap<String, HdWalletDetails>,
    signer: &str,
) -> WalletResult<&'a HdWalletDetails> {
    accounts
        .get(signer)
        .ok_or_else(|| WalletError::Validation(format!("no HD account for signer {signer}")))
}
