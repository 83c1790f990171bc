// wallet-core/src/crypto/paths.rs
//
// Derivation Paths Module - BIP-44 layout for the BIP32-Ed25519 key tree
// m / purpose' / coin_type' / account' / change / key_index

use serde::{Deserialize, Serialize};

// =============================================================================
// SLIP-44 COIN TYPES
// =============================================================================
/// SLIP-44 coin types used by the key contexts
/// Ref: https://github.com/satoshilabs/slips/blob/master/slip-0044.md
pub mod coin_type {
    pub const ALGORAND: u32 = 283;
    /// Identity keys live under coin type 0
    pub const IDENTITY: u32 = 0;
}

pub const BIP44_PURPOSE: u32 = 44;
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Mark an index as hardened
#[inline]
pub const fn harden(index: u32) -> u32 {
    index | HARDENED_OFFSET
}

#[inline]
pub const fn is_hardened(index: u32) -> bool {
    index >= HARDENED_OFFSET
}

// =============================================================================
// KEY CONTEXT & DERIVATION TYPE
// =============================================================================

/// Which branch of the tree a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyContext {
    /// Account (spending) keys, coin type 283
    Address,
    /// Identity keys, coin type 0
    Identity,
}

impl KeyContext {
    #[inline]
    pub const fn coin_type(self) -> u32 {
        match self {
            KeyContext::Address => coin_type::ALGORAND,
            KeyContext::Identity => coin_type::IDENTITY,
        }
    }
}

/// Child-key tweak strategy for BIP32-Ed25519
///
/// Both strategies compute `kL' = kL + 8 * trunc(ZL)`; they differ in how many
/// high bits of `ZL` are dropped before the add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BIP32DerivationType {
    /// Original BIP32-Ed25519 paper: keep 224 bits of ZL
    Khovratovich,
    /// Peikert's amendment: keep 247 bits of ZL
    #[default]
    Peikert,
}

impl BIP32DerivationType {
    /// Number of high bits of ZL zeroed before scaling
    #[inline]
    pub const fn g(self) -> u32 {
        match self {
            BIP32DerivationType::Khovratovich => 32,
            BIP32DerivationType::Peikert => 9,
        }
    }
}

// =============================================================================
// DERIVATION PATHS
// =============================================================================
/// Path builders for the wallet's key tree
///
/// # Conventions
/// - purpose, coin type and account are hardened
/// - change and key index are soft, so public keys can be derived from the
///   account-level extended public key
pub struct DerivationPaths;

impl DerivationPaths {
    /// `m/44'/coin'/account'/0/key_index` for the given context
    #[inline]
    pub fn bip44(context: KeyContext, account: u32, key_index: u32) -> [u32; 5] {
        [
            harden(BIP44_PURPOSE),
            harden(context.coin_type()),
            harden(account),
            0,
            key_index,
        ]
    }

    /// Address key path: `m/44'/283'/account'/0/key_index`
    #[inline]
    pub fn address(account: u32, key_index: u32) -> [u32; 5] {
        Self::bip44(KeyContext::Address, account, key_index)
    }

    /// Render a numeric path in `m/44'/283'/0'/0/0` form
    pub fn to_path_string(path: &[u32]) -> String {
        let mut out = String::from("m");
        for &idx in path {
            if is_hardened(idx) {
                out.push_str(&format!("/{}'", idx & !HARDENED_OFFSET));
            } else {
                out.push_str(&format!("/{}", idx));
            }
        }
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
