// wallet-core/src/signing/request.rs
//
// Sign Request Models - what callers ask the wallet to sign
//
// Wire shape (camelCase JSON, `type` discriminator):
//   { "id": "...", "transport": "algod", "type": "transactions", "txs": [[...]] }

use crate::crypto::key_deriver::Encoding;
use crate::error::WalletError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// TRANSPORT & HANDLER
// =============================================================================

/// How a request reached the wallet, and so how its outcome is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Built in-app; the wallet submits to algod itself
    Algod,
    /// Programmatic caller holding callbacks; never persisted
    Callback,
    /// WalletConnect session
    WalletConnect,
}

/// Outcome sink for requests whose caller lives outside the wallet UI
pub trait SignRequestHandler: Send + Sync + fmt::Debug {
    fn on_success(&self, _signatures: &[Vec<u8>]) {}

    fn on_error(&self, error: &WalletError);
}

// =============================================================================
// SIGN REQUEST
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Assigned by the store when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub transport: Transport,
    #[serde(flatten)]
    pub kind: SignRequestKind,
    #[serde(skip)]
    pub handler: Option<Arc<dyn SignRequestHandler>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignRequestKind {
    #[serde(rename = "transactions")]
    Transactions(TransactionSignRequest),
    #[serde(rename = "arbitrary-data")]
    ArbitraryData(ArbitraryDataSignRequest),
    #[serde(rename = "arc60")]
    Arc60(Arc60SignRequest),
}

impl SignRequest {
    pub fn new(transport: Transport, kind: SignRequestKind) -> Self {
        Self {
            id: None,
            transport,
            kind,
            handler: None,
        }
    }

    /// Transaction request made of one or more submitted batches
    pub fn transactions(transport: Transport, txs: Vec<Vec<PeraTransaction>>) -> Self {
        Self::new(
            transport,
            SignRequestKind::Transactions(TransactionSignRequest { txs }),
        )
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn SignRequestHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Only requests that do not depend on in-memory callbacks may be persisted
    pub fn is_persistable(&self) -> bool {
        self.transport != Transport::Callback
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SignRequestKind::Transactions(_) => "transactions",
            SignRequestKind::ArbitraryData(_) => "arbitrary-data",
            SignRequestKind::Arc60(_) => "arc60",
        }
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Pay,
    Axfer,
    Acfg,
    Afrz,
    Appl,
    Keyreg,
    Stpf,
    Hb,
}

/// Decoded view of one transaction, as much as analysis needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeraTransaction {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub sender: String,
    /// microAlgos
    pub fee: u64,
    /// Base64 atomic group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_remainder_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rekey_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PeraTransaction {
    pub fn new(tx_type: TransactionType, sender: impl Into<String>, fee: u64) -> Self {
        Self {
            tx_type,
            sender: sender.into(),
            fee,
            group: None,
            receiver: None,
            amount: None,
            close_remainder_to: None,
            rekey_to: None,
            note: None,
        }
    }

    /// Payment from `sender` to `receiver`
    pub fn payment(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        fee: u64,
    ) -> Self {
        let mut txn = Self::new(TransactionType::Pay, sender, fee);
        txn.receiver = Some(receiver.into());
        txn.amount = Some(amount);
        txn
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_close_remainder_to(mut self, address: impl Into<String>) -> Self {
        self.close_remainder_to = Some(address.into());
        self
    }

    pub fn with_rekey_to(mut self, address: impl Into<String>) -> Self {
        self.rekey_to = Some(address.into());
        self
    }

    /// Group id, ignoring empty strings
    pub fn group_id(&self) -> Option<&str> {
        self.group.as_deref().filter(|g| !g.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignRequest {
    /// One inner list per submitted batch
    pub txs: Vec<Vec<PeraTransaction>>,
}

// =============================================================================
// ARBITRARY DATA & ARC-60
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitraryDataItem {
    pub signer: String,
    /// Base64 JSON payload
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitraryDataSignRequest {
    pub data: Vec<ArbitraryDataItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Arc60Scope {
    Unknown,
    Auth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arc60SignRequest {
    pub signer: String,
    pub origin: String,
    /// Base64 JSON payload
    pub data: String,
    pub scope: Arc60Scope,
    pub encoding: Encoding,
}

// =============================================================================
// SIGNING SCHEMAS
// =============================================================================

/// Schema arbitrary-data payloads must satisfy
pub fn arbitrary_data_schema() -> Value {
    json!({ "type": "object" })
}

/// Schema for ARC-60 payloads, by scope
pub fn arc60_schema(scope: Arc60Scope) -> Value {
    match scope {
        Arc60Scope::Auth => json!({
            "type": "object",
            "required": ["domain", "authenticationData"],
            "properties": {
                "domain": { "type": "string" },
                "authenticationData": { "type": "string" }
            }
        }),
        Arc60Scope::Unknown => json!({ "type": "object" }),
    }
}
