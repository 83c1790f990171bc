// wallet-core/src/crypto/hd_wallet.rs
//
// HD Wallet Service - mnemonic in, key material / signatures out
//
// Every call re-derives from the supplied mnemonic. Nothing is cached, so no
// long-lived key material exists between calls.

use crate::crypto::key_deriver::{
    Bip32Ed25519, KeyTree, RootKey, SignMetadata, SIGNATURE_SIZE,
};
use crate::crypto::mnemonic::{WalletMnemonic, WordCount};
use crate::crypto::paths::{BIP32DerivationType, DerivationPaths, KeyContext};
use crate::error::WalletResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

// =============================================================================
// TYPES
// =============================================================================

/// Per-account HD descriptor, persisted by the accounts store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdWalletDetails {
    pub wallet_id: String,
    pub account: u32,
    pub change: u32,
    pub key_index: u32,
    #[serde(default)]
    pub derivation_type: BIP32DerivationType,
}

/// Arguments of [`HdWalletService::derive_key`]
///
/// No `Debug`: it borrows the mnemonic.
#[derive(Clone, Copy)]
pub struct DeriveKeyParams<'a> {
    pub mnemonic: &'a str,
    pub account: u32,
    pub key_index: u32,
    pub derivation_type: BIP32DerivationType,
}

impl<'a> DeriveKeyParams<'a> {
    /// Account 0, key index 0, Peikert
    pub fn new(mnemonic: &'a str) -> Self {
        Self {
            mnemonic,
            account: 0,
            key_index: 0,
            derivation_type: BIP32DerivationType::default(),
        }
    }

    pub fn account(mut self, account: u32) -> Self {
        self.account = account;
        self
    }

    pub fn key_index(mut self, key_index: u32) -> Self {
        self.key_index = key_index;
        self
    }

    pub fn derivation_type(mut self, derivation_type: BIP32DerivationType) -> Self {
        self.derivation_type = derivation_type;
        self
    }
}

/// Output of [`HdWalletService::derive_key`], both fields base64
///
/// `private_key` is the 96-byte extended key, `address` the 32-byte public key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeyMaterial {
    pub private_key: String,
    pub address: String,
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("private_key", &"[REDACTED]")
            .field("address", &self.address)
            .finish()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Debug)]
pub struct HdWalletService<K = Bip32Ed25519> {
    key_tree: K,
    word_count: WordCount,
}

impl Default for HdWalletService<Bip32Ed25519> {
    fn default() -> Self {
        Self::new()
    }
}

impl HdWalletService<Bip32Ed25519> {
    pub fn new() -> Self {
        Self::with_key_tree(Bip32Ed25519::new())
    }
}

impl<K: KeyTree> HdWalletService<K> {
    pub fn with_key_tree(key_tree: K) -> Self {
        Self {
            key_tree,
            word_count: WordCount::default(),
        }
    }

    /// Word count used by [`HdWalletService::create_mnemonic`]
    pub fn with_word_count(mut self, word_count: WordCount) -> Self {
        self.word_count = word_count;
        self
    }

    pub fn key_tree(&self) -> &K {
        &self.key_tree
    }

    /// Generate a fresh BIP-39 phrase from OS entropy
    pub fn create_mnemonic(&self) -> WalletResult<String> {
        let mnemonic = WalletMnemonic::with_word_count(self.word_count)?;
        debug!(words = mnemonic.word_count(), "created mnemonic");
        Ok(mnemonic.phrase().to_string())
    }

    /// Validate the phrase, derive the seed off-thread, build the root key
    ///
    /// Validation happens before any seed work, so a bad phrase fails with
    /// `InvalidMnemonic` and never reaches PBKDF2.
    pub async fn mnemonic_to_root_key(&self, mnemonic: &str) -> WalletResult<RootKey> {
        let mnemonic = WalletMnemonic::from_phrase(mnemonic)?;
        let seed = mnemonic.to_seed_async(None).await?;
        self.key_tree.from_seed(&seed[..])
    }

    /// Derive the private key and address for one account/key index
    ///
    /// The private key comes from a raw path walk and the address from a
    /// context key-gen call. The two calls take different argument shapes
    /// and must stay separate.
    #[instrument(skip_all, fields(account = params.account, key_index = params.key_index))]
    pub async fn derive_key(
        &self,
        params: DeriveKeyParams<'_>,
    ) -> WalletResult<DerivedKeyMaterial> {
        let root = self.mnemonic_to_root_key(params.mnemonic).await?;
        let path = DerivationPaths::address(params.account, params.key_index);

        let private_key = self
            .key_tree
            .derive_key(&root, &path, true, params.derivation_type)
            .await?;
        let address = self
            .key_tree
            .key_gen(
                &root,
                KeyContext::Address,
                params.account,
                params.key_index,
                params.derivation_type,
            )
            .await?;

        debug!(path = %DerivationPaths::to_path_string(&path), "derived key material");
        Ok(DerivedKeyMaterial {
            private_key: STANDARD.encode(&private_key[..]),
            address: STANDARD.encode(address),
        })
    }

    /// Sign prefix-encoded transaction bytes with the key described by `details`
    #[instrument(
        skip_all,
        fields(
            wallet_id = %details.wallet_id,
            account = details.account,
            key_index = details.key_index
        )
    )]
    pub async fn sign_transaction(
        &self,
        mnemonic: &str,
        details: &HdWalletDetails,
        txn_bytes: &[u8],
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        let root = self.mnemonic_to_root_key(mnemonic).await?;
        let signature = self
            .key_tree
            .sign_algo_transaction(
                &root,
                KeyContext::Address,
                details.account,
                details.key_index,
                txn_bytes,
                details.derivation_type,
            )
            .await?;
        debug!("signed transaction");
        Ok(signature)
    }

    /// Sign a base64 payload after checking it against `schema`
    pub async fn sign_data(
        &self,
        mnemonic: &str,
        details: &HdWalletDetails,
        payload: &[u8],
        schema: Value,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        self.sign_data_with_metadata(mnemonic, details, payload, &SignMetadata::base64(schema))
            .await
    }

    /// Sign a payload whose encoding and schema come from the request
    #[instrument(
        skip_all,
        fields(
            wallet_id = %details.wallet_id,
            account = details.account,
            key_index = details.key_index
        )
    )]
    pub async fn sign_data_with_metadata(
        &self,
        mnemonic: &str,
        details: &HdWalletDetails,
        payload: &[u8],
        metadata: &SignMetadata,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        let root = self.mnemonic_to_root_key(mnemonic).await?;
        let signature = self
            .key_tree
            .sign_data(
                &root,
                KeyContext::Address,
                details.account,
                details.key_index,
                payload,
                metadata,
                details.derivation_type,
            )
            .await?;
        debug!(encoding = ?metadata.encoding, "signed data");
        Ok(signature)
    }

    pub fn verify_signature(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
        self.key_tree
            .verify_with_public_key(signature, message, public_key)
    }

    /// Blocking variant of [`HdWalletService::mnemonic_to_root_key`]
    pub fn root_key_sync(&self, mnemonic: &str) -> WalletResult<RootKey> {
        let mnemonic = WalletMnemonic::from_phrase(mnemonic)?;
        let seed = mnemonic.to_seed(None)?;
        self.key_tree.from_seed(&seed[..])
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_deriver::EXTENDED_KEY_SIZE;
    use crate::crypto::paths::harden;
    use crate::error::{MnemonicError, WalletError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use zeroize::Zeroizing;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn details(account: u32, key_index: u32) -> HdWalletDetails {
        HdWalletDetails {
            wallet_id: "wallet-1".to_string(),
            account,
            change: 0,
            key_index,
            derivation_type: BIP32DerivationType::Peikert,
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        DeriveKey {
            path: Vec<u32>,
            is_private: bool,
            derivation_type: BIP32DerivationType,
        },
        KeyGen {
            context: KeyContext,
            account: u32,
            key_index: u32,
            derivation_type: BIP32DerivationType,
        },
    }

    #[derive(Default)]
    struct RecordingKeyTree {
        calls: Mutex<Vec<Call>>,
    }

    #[async_trait]
    impl KeyTree for RecordingKeyTree {
        fn from_seed(&self, _seed: &[u8]) -> WalletResult<RootKey> {
            Ok(RootKey::from_bytes([7u8; EXTENDED_KEY_SIZE]))
        }

        async fn derive_key(
            &self,
            _root: &RootKey,
            path: &[u32],
            is_private: bool,
            derivation_type: BIP32DerivationType,
        ) -> WalletResult<Zeroizing<Vec<u8>>> {
            self.calls.lock().push(Call::DeriveKey {
                path: path.to_vec(),
                is_private,
                derivation_type,
            });
            Ok(Zeroizing::new(vec![1u8; EXTENDED_KEY_SIZE]))
        }

        async fn key_gen(
            &self,
            _root: &RootKey,
            context: KeyContext,
            account: u32,
            key_index: u32,
            derivation_type: BIP32DerivationType,
        ) -> WalletResult<[u8; 32]> {
            self.calls.lock().push(Call::KeyGen {
                context,
                account,
                key_index,
                derivation_type,
            });
            Ok([2u8; 32])
        }

        async fn sign_algo_transaction(
            &self,
            _root: &RootKey,
            _context: KeyContext,
            _account: u32,
            _key_index: u32,
            _prefix_encoded_tx: &[u8],
            _derivation_type: BIP32DerivationType,
        ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
            Ok([0u8; SIGNATURE_SIZE])
        }

        async fn sign_data(
            &self,
            _root: &RootKey,
            _context: KeyContext,
            _account: u32,
            _key_index: u32,
            _data: &[u8],
            _metadata: &SignMetadata,
            _derivation_type: BIP32DerivationType,
        ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
            Ok([0u8; SIGNATURE_SIZE])
        }

        fn verify_with_public_key(
            &self,
            _signature: &[u8],
            _message: &[u8],
            _public_key: &[u8],
        ) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_derive_key_keeps_distinct_call_shapes() {
        let service = HdWalletService::with_key_tree(RecordingKeyTree::default());
        let params = DeriveKeyParams::new(TEST_MNEMONIC)
            .account(7)
            .key_index(9)
            .derivation_type(BIP32DerivationType::Khovratovich);

        let material = service.derive_key(params).await.unwrap();
        assert_eq!(material.private_key, STANDARD.encode([1u8; EXTENDED_KEY_SIZE]));
        assert_eq!(material.address, STANDARD.encode([2u8; 32]));

        let calls = service.key_tree().calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                Call::DeriveKey {
                    path: vec![harden(44), harden(283), harden(7), 0, 9],
                    is_private: true,
                    derivation_type: BIP32DerivationType::Khovratovich,
                },
                Call::KeyGen {
                    context: KeyContext::Address,
                    account: 7,
                    key_index: 9,
                    derivation_type: BIP32DerivationType::Khovratovich,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_derive_key_defaults() {
        let service = HdWalletService::with_key_tree(RecordingKeyTree::default());
        service.derive_key(DeriveKeyParams::new(TEST_MNEMONIC)).await.unwrap();

        let calls = service.key_tree().calls.lock().clone();
        assert_eq!(
            calls[0],
            Call::DeriveKey {
                path: vec![harden(44), harden(283), harden(0), 0, 0],
                is_private: true,
                derivation_type: BIP32DerivationType::Peikert,
            }
        );
    }

    #[tokio::test]
    async fn test_derive_key_is_deterministic() {
        let service = HdWalletService::new();
        for (account, key_index, dt) in [
            (0, 0, BIP32DerivationType::Peikert),
            (3, 1, BIP32DerivationType::Khovratovich),
        ] {
            let params = DeriveKeyParams::new(TEST_MNEMONIC)
                .account(account)
                .key_index(key_index)
                .derivation_type(dt);
            let first = service.derive_key(params).await.unwrap();
            let second = service.derive_key(params).await.unwrap();
            assert_eq!(first, second);
            assert_eq!(STANDARD.decode(&first.private_key).unwrap().len(), EXTENDED_KEY_SIZE);
            assert_eq!(STANDARD.decode(&first.address).unwrap().len(), 32);
        }
    }

    #[tokio::test]
    async fn test_mnemonic_to_root_key_matches_sync_path() {
        let service = HdWalletService::new();
        let async_root = service.mnemonic_to_root_key(TEST_MNEMONIC).await.unwrap();
        let sync_root = service.root_key_sync(TEST_MNEMONIC).unwrap();
        assert_eq!(async_root.as_bytes(), sync_root.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_mnemonic_is_rejected_before_derivation() {
        let service = HdWalletService::with_key_tree(RecordingKeyTree::default());
        let err = service
            .mnemonic_to_root_key("abandon abandon abandon")
            .await
            .unwrap_err();
        assert_eq!(err, WalletError::InvalidMnemonic(MnemonicError::InvalidWordCount(3)));

        let err = service
            .derive_key(DeriveKeyParams::new("not a real phrase at all"))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic(_)));
        assert!(service.key_tree().calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sign_transaction_verifies_against_derived_address() {
        let service = HdWalletService::new();
        let details = details(1, 4);
        let txn = b"TX\x81\xa3fee\xcd\x03\xe8";

        let material = service
            .derive_key(DeriveKeyParams::new(TEST_MNEMONIC).account(1).key_index(4))
            .await
            .unwrap();
        let address = STANDARD.decode(&material.address).unwrap();

        let signature = service
            .sign_transaction(TEST_MNEMONIC, &details, txn)
            .await
            .unwrap();
        assert!(service.verify_signature(&signature, txn, &address));
    }

    #[tokio::test]
    async fn test_sign_data_uses_schema() {
        let service = HdWalletService::new();
        let details = details(0, 0);
        let schema = json!({ "type": "object", "required": ["challenge"] });

        let ok = STANDARD.encode(br#"{"challenge":"c2lnbg=="}"#);
        assert!(service
            .sign_data(TEST_MNEMONIC, &details, ok.as_bytes(), schema.clone())
            .await
            .is_ok());

        let missing = STANDARD.encode(br#"{"other":1}"#);
        let err = service
            .sign_data(TEST_MNEMONIC, &details, missing.as_bytes(), schema)
            .await
            .unwrap_err();
        assert!(err.is_signing_error());
    }

    #[test]
    fn test_create_mnemonic_round_trips() {
        let service = HdWalletService::new().with_word_count(WordCount::Twelve);
        let phrase = service.create_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(WalletMnemonic::from_phrase(&phrase).is_ok());
    }

    #[test]
    fn test_derived_material_debug_is_redacted() {
        let material = DerivedKeyMaterial {
            private_key: "c2VjcmV0".to_string(),
            address: "YWRkcg==".to_string(),
        };
        let debug_output = format!("{:?}", material);
        assert!(!debug_output.contains("c2VjcmV0"));
        assert!(debug_output.contains("YWRkcg=="));
    }

    #[test]
    fn test_hd_wallet_details_serde_shape() {
        let value = serde_json::to_value(details(2, 5)).unwrap();
        assert_eq!(
            value,
            json!({
                "walletId": "wallet-1",
                "account": 2,
                "change": 0,
                "keyIndex": 5,
                "derivationType": "peikert"
            })
        );
    }
}
