// wallet-core/src/signing/analysis.rs
//
// Sign Request Analysis - presentation structures derived from one request
//
// Pure functions over a borrowed request. Nothing here reads or writes the
// signing store; callers pass the active request in.

use crate::signing::request::{PeraTransaction, SignRequest, SignRequestKind, TransactionType};
use serde::Serialize;
use std::collections::HashMap;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningType {
    /// Payment closes the sender account
    Close,
    /// Transaction changes the sender's authorized key
    Rekey,
}

impl WarningType {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningType::Close => "close",
            WarningType::Rekey => "rekey",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWarning {
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub sender_address: String,
    pub target_address: String,
}

impl TransactionWarning {
    /// Stable key for list rendering: `{type}-{sender}-{target}`
    pub fn key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.warning_type.as_str(),
            self.sender_address,
            self.target_address
        )
    }
}

/// Flat-list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListItem<'a> {
    Transaction {
        transaction: &'a PeraTransaction,
    },
    Group {
        transactions: Vec<&'a PeraTransaction>,
        #[serde(rename = "groupIndex")]
        group_index: usize,
    },
}

// =============================================================================
// SELECTORS
// =============================================================================

/// Every transaction across all batches, in submission order
pub fn all_transactions(request: &SignRequest) -> Vec<&PeraTransaction> {
    match &request.kind {
        SignRequestKind::Transactions(txn_request) => txn_request.txs.iter().flatten().collect(),
        SignRequestKind::ArbitraryData(_) | SignRequestKind::Arc60(_) => Vec::new(),
    }
}

/// Partition by atomic group id, groups ordered by first appearance
///
/// Ungrouped transactions become singleton groups.
pub fn groups<'a>(transactions: &[&'a PeraTransaction]) -> Vec<Vec<&'a PeraTransaction>> {
    let mut out: Vec<Vec<&PeraTransaction>> = Vec::new();
    let mut slot_by_group: HashMap<&str, usize> = HashMap::new();

    for &txn in transactions {
        match txn.group_id() {
            Some(group_id) => match slot_by_group.get(group_id) {
                Some(&slot) => out[slot].push(txn),
                None => {
                    slot_by_group.insert(group_id, out.len());
                    out.push(vec![txn]);
                }
            },
            None => out.push(vec![txn]),
        }
    }
    out
}

/// Multi-member groups render as one group row, singletons as a bare row
pub fn list_items<'a>(groups: &[Vec<&'a PeraTransaction>]) -> Vec<ListItem<'a>> {
    groups
        .iter()
        .enumerate()
        .filter_map(|(group_index, members)| match members.as_slice() {
            [] => None,
            [single] => Some(ListItem::Transaction {
                transaction: *single,
            }),
            _ => Some(ListItem::Group {
                transactions: members.clone(),
                group_index,
            }),
        })
        .collect()
}

/// Exact fee total in microAlgos
pub fn total_fee(transactions: &[&PeraTransaction]) -> u128 {
    transactions.iter().map(|txn| u128::from(txn.fee)).sum()
}

/// Close and rekey warnings, one per qualifying transaction and condition
pub fn aggregated_warnings(transactions: &[&PeraTransaction]) -> Vec<TransactionWarning> {
    let mut warnings = Vec::new();
    for txn in transactions {
        if txn.tx_type == TransactionType::Pay {
            if let Some(target) = non_empty(&txn.close_remainder_to) {
                warnings.push(TransactionWarning {
                    warning_type: WarningType::Close,
                    sender_address: txn.sender.clone(),
                    target_address: target.to_string(),
                });
            }
        }
        if let Some(target) = non_empty(&txn.rekey_to) {
            warnings.push(TransactionWarning {
                warning_type: WarningType::Rekey,
                sender_address: txn.sender.clone(),
                target_address: target.to_string(),
            });
        }
    }
    warnings
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Everything the confirmation screen needs, computed in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequestSummary<'a> {
    pub all_transactions: Vec<&'a PeraTransaction>,
    pub groups: Vec<Vec<&'a PeraTransaction>>,
    pub list_items: Vec<ListItem<'a>>,
    pub total_fee: u128,
    pub aggregated_warnings: Vec<TransactionWarning>,
}

impl<'a> SignRequestSummary<'a> {
    pub fn from_request(request: &'a SignRequest) -> Self {
        let all_transactions = all_transactions(request);
        let groups = groups(&all_transactions);
        let list_items = list_items(&groups);
        let total_fee = total_fee(&all_transactions);
        let aggregated_warnings = aggregated_warnings(&all_transactions);

        Self {
            all_transactions,
            groups,
            list_items,
            total_fee,
            aggregated_warnings,
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.aggregated_warnings.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::request::{ArbitraryDataSignRequest, Transport};

    fn pay(sender: &str, fee: u64) -> PeraTransaction {
        PeraTransaction::payment(sender, "RECEIVER", 1, fee)
    }

    #[test]
    fn test_all_transactions_flattens_batches_in_order() {
        let request = SignRequest::transactions(
            Transport::Algod,
            vec![vec![pay("A", 1), pay("B", 1)], vec![pay("C", 1)]],
        );
        let senders: Vec<&str> = all_transactions(&request)
            .iter()
            .map(|t| t.sender.as_str())
            .collect();
        assert_eq!(senders, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_groups_and_list_items() {
        let a = pay("A", 1000).with_group("g1");
        let b = pay("B", 1000).with_group("g1");
        let c = pay("C", 1000);
        let txs = vec![vec![a.clone(), b.clone(), c.clone()]];
        let request = SignRequest::transactions(Transport::Algod, txs);

        let all = all_transactions(&request);
        let grouped = groups(&all);
        assert_eq!(grouped, vec![vec![&a, &b], vec![&c]]);

        let items = list_items(&grouped);
        assert_eq!(
            items,
            vec![
                ListItem::Group {
                    transactions: vec![&a, &b],
                    group_index: 0,
                },
                ListItem::Transaction { transaction: &c },
            ]
        );
    }

    #[test]
    fn test_groups_follow_first_appearance_across_batches() {
        let x1 = pay("X1", 1).with_group("gx");
        let y = pay("Y", 1).with_group("gy");
        let x2 = pay("X2", 1).with_group("gx");
        let request = SignRequest::transactions(
            Transport::Algod,
            vec![vec![x1.clone(), y.clone()], vec![x2.clone()]],
        );

        let all = all_transactions(&request);
        let grouped = groups(&all);
        assert_eq!(grouped, vec![vec![&x1, &x2], vec![&y]]);

        // Single-member group renders as a bare transaction row
        let items = list_items(&grouped);
        assert_eq!(items[1], ListItem::Transaction { transaction: &y });
    }

    #[test]
    fn test_total_fee_is_exact() {
        let request = SignRequest::transactions(
            Transport::Algod,
            vec![vec![pay("A", 1000), pay("B", 2000), pay("C", 500)]],
        );
        assert_eq!(total_fee(&all_transactions(&request)), 3500);

        let huge = SignRequest::transactions(
            Transport::Algod,
            vec![vec![pay("A", u64::MAX), pay("B", u64::MAX)]],
        );
        assert_eq!(
            total_fee(&all_transactions(&huge)),
            2 * u128::from(u64::MAX)
        );
    }

    #[test]
    fn test_no_warnings_for_plain_transactions() {
        let request =
            SignRequest::transactions(Transport::Algod, vec![vec![pay("A", 1000), pay("B", 1000)]]);
        assert!(aggregated_warnings(&all_transactions(&request)).is_empty());
    }

    #[test]
    fn test_close_and_rekey_warnings() {
        let close = pay("SENDER1", 1000).with_close_remainder_to("CLOSE_TO");
        let rekey =
            PeraTransaction::new(TransactionType::Appl, "SENDER2", 1000).with_rekey_to("NEW_AUTH");
        let request = SignRequest::transactions(Transport::Algod, vec![vec![close, rekey]]);

        let warnings = aggregated_warnings(&all_transactions(&request));
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].warning_type, WarningType::Close);
        assert_eq!(warnings[0].sender_address, "SENDER1");
        assert_eq!(warnings[0].target_address, "CLOSE_TO");
        assert_eq!(warnings[1].warning_type, WarningType::Rekey);
        assert_eq!(warnings[1].key(), "rekey-SENDER2-NEW_AUTH");
    }

    #[test]
    fn test_close_only_applies_to_payments_and_empty_fields_are_ignored() {
        let mut asset_close = PeraTransaction::new(TransactionType::Axfer, "A", 1000);
        asset_close.close_remainder_to = Some("X".to_string());
        let empty_close = pay("B", 1000).with_close_remainder_to("");
        let empty_rekey = pay("C", 1000).with_rekey_to("");
        let request = SignRequest::transactions(
            Transport::Algod,
            vec![vec![asset_close, empty_close, empty_rekey]],
        );
        assert!(aggregated_warnings(&all_transactions(&request)).is_empty());
    }

    #[test]
    fn test_summary_for_non_transaction_request_is_empty() {
        let request = SignRequest::new(
            Transport::WalletConnect,
            SignRequestKind::ArbitraryData(ArbitraryDataSignRequest {
                data: vec![],
                origin: None,
            }),
        );
        let summary = SignRequestSummary::from_request(&request);
        assert!(summary.all_transactions.is_empty());
        assert!(summary.list_items.is_empty());
        assert_eq!(summary.total_fee, 0);
        assert!(!summary.has_warnings());
    }

    #[test]
    fn test_list_item_serializes_for_rendering() {
        let a = pay("A", 1).with_group("g");
        let b = pay("B", 1).with_group("g");
        let request = SignRequest::transactions(Transport::Algod, vec![vec![a, b]]);
        let summary = SignRequestSummary::from_request(&request);

        let value = serde_json::to_value(&summary.list_items[0]).unwrap();
        assert_eq!(value["type"], "group");
        assert_eq!(value["groupIndex"], 0);
        assert_eq!(value["transactions"].as_array().unwrap().len(), 2);
    }
}
