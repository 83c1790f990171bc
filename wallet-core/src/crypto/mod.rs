// wallet-core/src/crypto/mod.rs

//! Core Cryptography Module
//!
//! - **Mnemonic**: BIP-39 phrases and seeds via [`WalletMnemonic`].
//! - **Key Tree**: BIP32-Ed25519 derivation and signing via [`KeyTree`] / [`Bip32Ed25519`].
//! - **Primitives**: the ed25519 capability set the tree is built on, via [`Ed25519Crypto`].
//! - **Derivation Paths**: `m/44'/283'/account'/0/key_index` builders via [`DerivationPaths`].
//! - **HD Wallet Service**: mnemonic in, keys and signatures out, via [`HdWalletService`].

pub mod hd_wallet;
pub mod key_deriver;
pub mod mnemonic;
pub mod paths;
pub mod primitives;

// Re-exports for cleaner API access
pub use hd_wallet::{DeriveKeyParams, DerivedKeyMaterial, HdWalletDetails, HdWalletService};
pub use key_deriver::{Bip32Ed25519, Encoding, KeyTree, RootKey, SignMetadata};
pub use mnemonic::{WalletMnemonic, WordCount};
pub use paths::{harden, BIP32DerivationType, DerivationPaths, KeyContext};
pub use primitives::{DalekCrypto, Ed25519Crypto};
