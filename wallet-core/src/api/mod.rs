// wallet-core/src/api/mod.rs

#[allow(clippy::module_inception)]
pub mod api;

pub use api::{init_tracing, WalletCore};
