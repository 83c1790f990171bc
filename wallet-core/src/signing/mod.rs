// wallet-core/src/signing/mod.rs

//! Sign Requests
//!
//! - **Request model**: what callers ask the wallet to sign, via [`SignRequest`].
//! - **Store**: the pending queue and its persisted snapshot, via [`SigningStore`].
//! - **Analysis**: groups, list rows, fee total and warnings for one request.
//! - **Failure surfacing**: per-transport reporting of outcomes.

pub mod analysis;
pub mod failure;
pub mod request;
pub mod store;

pub use analysis::{
    aggregated_warnings, all_transactions, groups, list_items, total_fee, ListItem,
    SignRequestSummary, TransactionWarning, WarningType,
};
pub use failure::{report_sign_failure, report_sign_success, FailureSurface};
pub use request::{
    arbitrary_data_schema, arc60_schema, Arc60Scope, Arc60SignRequest, ArbitraryDataItem,
    ArbitraryDataSignRequest, PeraTransaction, SignRequest, SignRequestHandler, SignRequestKind,
    TransactionSignRequest, TransactionType, Transport,
};
pub use store::{SigningStore, SIGNING_STORE_KEY, SIGNING_STORE_VERSION};
