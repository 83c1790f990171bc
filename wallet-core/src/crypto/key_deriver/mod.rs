// wallet-core/src/crypto/key_deriver/mod.rs
//
// Key Derivation Engine - BIP32-Ed25519 key tree
//
// Architecture:
// ┌──────────────────────────────────────────────────────────┐
// │  Seed (64 bytes from BIP-39 Mnemonic)                    │
// │                    │ from_seed                           │
// │                    ▼                                     │
// │  RootKey  kL(32) || kR(32) || chain code(32)             │
// │                    │ derive_child_node_private (per level)│
// │                    ▼                                     │
// │  m/44'/283'/account'/0/key_index                         │
// │     ├─ private: extended key (96 bytes)                  │
// │     ├─ public:  kL·B (32 bytes)                          │
// │     └─ sign:    ed25519 over the extended key            │
// └──────────────────────────────────────────────────────────┘

pub mod bip32_ed25519;
pub mod data_validation;

pub use bip32_ed25519::{trunc_256_minus_g_bits, Bip32Ed25519};
pub use data_validation::{Encoding, SignMetadata};

use crate::crypto::paths::{BIP32DerivationType, KeyContext};
use crate::error::WalletResult;
use async_trait::async_trait;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const ED25519_SCALAR_SIZE: usize = 32;
pub const CHAIN_CODE_SIZE: usize = 32;
pub const EXTENDED_KEY_SIZE: usize = 96;
pub const SIGNATURE_SIZE: usize = 64;

// =============================================================================
// COMMON TYPES
// =============================================================================

/// Root of the key tree: `kL || kR || chain code`
///
/// Owned by the call that created it. Never serialized, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RootKey {
    bytes: [u8; EXTENDED_KEY_SIZE],
}

impl RootKey {
    pub fn from_bytes(bytes: [u8; EXTENDED_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; EXTENDED_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootKey([REDACTED])")
    }
}

// =============================================================================
// KEY TREE
// =============================================================================

/// Operations over a BIP32-Ed25519 key tree
///
/// This is the seam between the wallet service and the concrete tree
/// implementation; the service never touches scalars directly.
#[async_trait]
pub trait KeyTree: Send + Sync {
    /// Build the root key from a BIP-39 seed
    fn from_seed(&self, seed: &[u8]) -> WalletResult<RootKey>;

    /// Walk `path` from the root
    ///
    /// Private: 96-byte extended private key. Public: `kL·B || chain code`.
    async fn derive_key(
        &self,
        root: &RootKey,
        path: &[u32],
        is_private: bool,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<Zeroizing<Vec<u8>>>;

    /// Public key at `m/44'/coin'/account'/0/key_index`
    async fn key_gen(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; 32]>;

    /// Sign already prefix-encoded transaction bytes
    #[allow(clippy::too_many_arguments)]
    async fn sign_algo_transaction(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        prefix_encoded_tx: &[u8],
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]>;

    /// Sign arbitrary data after validating it against `metadata`
    #[allow(clippy::too_many_arguments)]
    async fn sign_data(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        data: &[u8],
        metadata: &SignMetadata,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]>;

    fn verify_with_public_key(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_debug_is_redacted() {
        let root = RootKey::from_bytes([0xab; EXTENDED_KEY_SIZE]);
        let debug_output = format!("{:?}", root);
        assert!(!debug_output.contains("ab"));
        assert!(debug_output.contains("REDACTED"));
    }
}
