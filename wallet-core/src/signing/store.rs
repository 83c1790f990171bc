// wallet-core/src/signing/store.rs
//
// Signing Store - FIFO queue of pending sign requests
//
// ```text
//   add_sign_request ──► [ live queue ] ──► snapshot (callback entries dropped)
//                              │                     │
//   remove / reset ────────────┘                     ▼
//                                          KeyValueStorage["signing-store"]
//                                          { state: { pendingSignRequests }, version }
// ```
//
// The live queue is the source of truth. Write-through failures are logged
// and left for `persist()` to report.

use crate::config::WalletCoreConfig;
use crate::error::{WalletError, WalletResult};
use crate::signing::request::SignRequest;
use crate::storage::KeyValueStorage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default storage key of the persisted snapshot
pub const SIGNING_STORE_KEY: &str = "signing-store";

/// Default snapshot version
pub const SIGNING_STORE_VERSION: u32 = 0;

// =============================================================================
// PERSISTED SHAPE
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    pending_sign_requests: Vec<SignRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEnvelope {
    state: PersistedState,
    version: u32,
}

// =============================================================================
// STORE
// =============================================================================

pub struct SigningStore {
    storage: Arc<dyn KeyValueStorage>,
    storage_key: String,
    version: u32,
    pending: RwLock<Vec<SignRequest>>,
}

impl std::fmt::Debug for SigningStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningStore")
            .field("storage_key", &self.storage_key)
            .field("version", &self.version)
            .field("pending", &self.pending.read().len())
            .finish()
    }
}

impl SigningStore {
    /// Store under the default key and version, rehydrated from `storage`
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_settings(storage, SIGNING_STORE_KEY, SIGNING_STORE_VERSION)
    }

    pub fn with_config(storage: Arc<dyn KeyValueStorage>, config: &WalletCoreConfig) -> Self {
        Self::with_settings(storage, &config.storage_key, config.persist_version)
    }

    pub fn with_settings(
        storage: Arc<dyn KeyValueStorage>,
        storage_key: impl Into<String>,
        version: u32,
    ) -> Self {
        let store = Self {
            storage,
            storage_key: storage_key.into(),
            version,
            pending: RwLock::new(Vec::new()),
        };
        let restored = store.rehydrate();
        if !restored.is_empty() {
            info!(
                count = restored.len(),
                key = %store.storage_key,
                "restored pending sign requests"
            );
        }
        *store.pending.write() = restored;
        store
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Append `request`, assigning a v4 uuid when it has no id
    ///
    /// Returns `false`, leaving the queue untouched, when the id is already queued.
    pub fn add_sign_request(&self, mut request: SignRequest) -> bool {
        let id = match request.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                request.id = Some(id.clone());
                id
            }
        };

        let mut pending = self.pending.write();
        if pending.iter().any(|queued| queued.id() == Some(id.as_str())) {
            debug!(request_id = %id, "sign request already queued");
            return false;
        }
        debug!(
            request_id = %id,
            kind = request.type_name(),
            transport = ?request.transport,
            "sign request queued"
        );
        pending.push(request);
        self.write_through(&pending);
        true
    }

    /// Remove the queued request with the same id as `request`
    pub fn remove_sign_request(&self, request: &SignRequest) -> bool {
        let Some(id) = request.id() else {
            return false;
        };

        let mut pending = self.pending.write();
        let Some(position) = pending.iter().position(|queued| queued.id() == Some(id)) else {
            return false;
        };
        pending.remove(position);
        debug!(request_id = %id, "sign request removed");
        self.write_through(&pending);
        true
    }

    /// Drop every pending request and the persisted snapshot with them
    pub fn reset_state(&self) {
        let mut pending = self.pending.write();
        pending.clear();
        info!("signing store reset");
        self.write_through(&pending);
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn pending_sign_requests(&self) -> Vec<SignRequest> {
        self.pending.read().clone()
    }

    /// Oldest pending request, the one a confirmation screen shows
    pub fn head(&self) -> Option<SignRequest> {
        self.pending.read().first().cloned()
    }

    pub fn get(&self, id: &str) -> Option<SignRequest> {
        self.pending
            .read()
            .iter()
            .find(|queued| queued.id() == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pending.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.read().is_empty()
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write the persistable snapshot now
    pub fn persist(&self) -> WalletResult<()> {
        let pending = self.pending.read();
        self.save(&pending)
    }

    /// Snapshots are saved while the caller still holds the queue lock, so
    /// storage always sees them in mutation order.
    fn save(&self, pending: &[SignRequest]) -> WalletResult<()> {
        let envelope = PersistedEnvelope {
            state: PersistedState {
                pending_sign_requests: pending
                    .iter()
                    .filter(|request| request.is_persistable())
                    .cloned()
                    .collect(),
            },
            version: self.version,
        };
        let value = serde_json::to_value(&envelope)?;
        self.storage.set_item(&self.storage_key, value)
    }

    fn write_through(&self, pending: &[SignRequest]) {
        if let Err(err) = self.save(pending) {
            warn!(key = %self.storage_key, error = %err, "failed to persist signing store");
        }
    }

    fn rehydrate(&self) -> Vec<SignRequest> {
        let value = match self.storage.get_item(&self.storage_key) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key = %self.storage_key, error = %err, "failed to read signing store");
                return Vec::new();
            }
        };

        match self.decode_snapshot(value) {
            Ok(requests) => requests,
            Err(err) => {
                warn!(key = %self.storage_key, error = %err, "discarding persisted signing store");
                Vec::new()
            }
        }
    }

    fn decode_snapshot(&self, value: Value) -> WalletResult<Vec<SignRequest>> {
        let envelope: PersistedEnvelope = serde_json::from_value(value)?;
        if envelope.version != self.version {
            return Err(WalletError::Storage(format!(
                "snapshot version {} does not match {}",
                envelope.version, self.version
            )));
        }

        let mut seen = HashSet::new();
        Ok(envelope
            .state
            .pending_sign_requests
            .into_iter()
            .filter(|request| request.is_persistable())
            .filter(|request| match request.id() {
                Some(id) => seen.insert(id.to_string()),
                None => false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::request::{PeraTransaction, SignRequestHandler, Transport};
    use crate::storage::{FileStorage, MemoryStorage};
    use serde_json::json;

    fn algod_request() -> SignRequest {
        SignRequest::transactions(
            Transport::Algod,
            vec![vec![PeraTransaction::payment("SENDER", "RECEIVER", 1, 1000)]],
        )
    }

    #[derive(Debug)]
    struct NoopHandler;

    impl SignRequestHandler for NoopHandler {
        fn on_error(&self, _error: &WalletError) {}
    }

    /// Storage whose writes always fail
    struct ReadOnlyStorage;

    impl KeyValueStorage for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> WalletResult<Option<Value>> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: Value) -> WalletResult<()> {
            Err(WalletError::Storage("read-only".to_string()))
        }

        fn remove_item(&self, _key: &str) -> WalletResult<()> {
            Err(WalletError::Storage("read-only".to_string()))
        }
    }

    #[test]
    fn test_add_assigns_uuid() {
        let store = SigningStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.add_sign_request(algod_request()));

        let head = store.head().unwrap();
        let id = head.id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(store.get(id).map(|r| r.kind), Some(head.kind.clone()));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let store = SigningStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.add_sign_request(algod_request().with_id("x")));
        assert!(!store.add_sign_request(algod_request().with_id("x")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_queue_is_fifo() {
        let store = SigningStore::new(Arc::new(MemoryStorage::new()));
        store.add_sign_request(algod_request().with_id("first"));
        store.add_sign_request(algod_request().with_id("second"));

        let ids: Vec<String> = store
            .pending_sign_requests()
            .iter()
            .filter_map(|r| r.id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(store.head().unwrap().id(), Some("first"));
    }

    #[test]
    fn test_remove() {
        let store = SigningStore::new(Arc::new(MemoryStorage::new()));
        let request = algod_request().with_id("y");
        assert!(store.add_sign_request(request.clone()));

        assert!(!store.remove_sign_request(&algod_request().with_id("missing")));
        assert!(!store.remove_sign_request(&algod_request()));
        assert_eq!(store.len(), 1);

        assert!(store.remove_sign_request(&request));
        assert!(store.is_empty());
        assert!(!store.remove_sign_request(&request));
    }

    #[test]
    fn test_callback_requests_stay_in_memory_only() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SigningStore::new(storage.clone());

        store.add_sign_request(algod_request().with_id("algod"));
        store.add_sign_request(
            SignRequest::transactions(Transport::Callback, vec![])
                .with_id("callback")
                .with_handler(Arc::new(NoopHandler)),
        );
        assert_eq!(store.len(), 2);

        let persisted = storage.get_item(SIGNING_STORE_KEY).unwrap().unwrap();
        let entries = persisted["state"]["pendingSignRequests"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], "algod");
        assert_eq!(persisted["version"], 0);
    }

    #[test]
    fn test_rehydrates_from_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
            let store = SigningStore::new(storage);
            store.add_sign_request(algod_request().with_id("kept"));
            store.add_sign_request(
                SignRequest::transactions(Transport::Callback, vec![]).with_id("lost"),
            );
        }

        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let store = SigningStore::new(storage);
        assert_eq!(store.len(), 1);
        assert_eq!(store.head().unwrap().id(), Some("kept"));
        assert_eq!(store.head().unwrap().kind, algod_request().kind);
    }

    #[test]
    fn test_version_mismatch_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(
                SIGNING_STORE_KEY,
                json!({
                    "state": { "pendingSignRequests": [
                        serde_json::to_value(algod_request().with_id("old")).unwrap()
                    ] },
                    "version": 7
                }),
            )
            .unwrap();

        let store = SigningStore::new(storage);
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(SIGNING_STORE_KEY, json!({ "state": "garbage" }))
            .unwrap();
        let store = SigningStore::new(storage);
        assert!(store.is_empty());
        assert!(store.add_sign_request(algod_request()));
    }

    #[test]
    fn test_rehydrate_drops_duplicate_ids() {
        let storage = Arc::new(MemoryStorage::new());
        let entry = serde_json::to_value(algod_request().with_id("dup")).unwrap();
        storage
            .set_item(
                SIGNING_STORE_KEY,
                json!({ "state": { "pendingSignRequests": [entry.clone(), entry] }, "version": 0 }),
            )
            .unwrap();

        let store = SigningStore::new(storage);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reset_clears_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SigningStore::new(storage.clone());
        store.add_sign_request(algod_request());
        store.reset_state();

        assert!(store.is_empty());
        let persisted = storage.get_item(SIGNING_STORE_KEY).unwrap().unwrap();
        assert_eq!(persisted["state"]["pendingSignRequests"], json!([]));
    }

    #[test]
    fn test_custom_key_and_version_from_config() {
        let storage = Arc::new(MemoryStorage::new());
        let config = WalletCoreConfig {
            storage_key: "signing-store-v2".to_string(),
            persist_version: 2,
            ..WalletCoreConfig::default()
        };
        let store = SigningStore::with_config(storage.clone(), &config);
        store.add_sign_request(algod_request());

        assert_eq!(store.storage_key(), "signing-store-v2");
        assert!(storage.get_item(SIGNING_STORE_KEY).unwrap().is_none());
        let persisted = storage.get_item("signing-store-v2").unwrap().unwrap();
        assert_eq!(persisted["version"], 2);
    }

    #[test]
    fn test_storage_failure_keeps_mutation() {
        let store = SigningStore::new(Arc::new(ReadOnlyStorage));
        assert!(store.add_sign_request(algod_request()));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.persist(), Err(WalletError::Storage(_))));
    }

    /// Storage that stalls on single-entry snapshots and keeps the last write
    #[derive(Default)]
    struct SlowStorage {
        last: parking_lot::Mutex<Option<Value>>,
    }

    impl KeyValueStorage for SlowStorage {
        fn get_item(&self, _key: &str) -> WalletResult<Option<Value>> {
            Ok(self.last.lock().clone())
        }

        fn set_item(&self, _key: &str, value: Value) -> WalletResult<()> {
            let entries = value["state"]["pendingSignRequests"]
                .as_array()
                .map_or(0, Vec::len);
            if entries == 1 {
                std::thread::sleep(std::time::Duration::from_millis(300));
            }
            *self.last.lock() = Some(value);
            Ok(())
        }

        fn remove_item(&self, _key: &str) -> WalletResult<()> {
            *self.last.lock() = None;
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_writes_persist_latest_queue() {
        let storage = Arc::new(SlowStorage::default());
        let store = Arc::new(SigningStore::new(storage.clone()));

        let first = {
            let store = store.clone();
            std::thread::spawn(move || store.add_sign_request(algod_request().with_id("a")))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(store.add_sign_request(algod_request().with_id("b")));
        assert!(first.join().unwrap());

        let persisted = storage.get_item(SIGNING_STORE_KEY).unwrap().unwrap();
        let entries = persisted["state"]["pendingSignRequests"].as_array().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let store = Arc::new(SigningStore::new(Arc::new(MemoryStorage::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.add_sign_request(algod_request().with_id(format!("req-{i}")))
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(store.len(), 8);
    }
}
