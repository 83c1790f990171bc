// wallet-core/src/lib.rs

//! Wallet Core
//!
//! HD key derivation and signing for Algorand accounts, plus the queue of
//! pending sign requests the app walks the user through.

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod signing;
pub mod storage;

pub use api::{init_tracing, WalletCore};
pub use config::WalletCoreConfig;
pub use error::{CryptoError, MnemonicError, WalletError, WalletResult};
