// wallet-core/src/storage/mod.rs
//
// Key-Value Storage - the narrow persistence interface the stores depend on
//
// Native secure storage, browser storage and plain files all fit behind
// `KeyValueStorage`; stores never see the concrete backend.

use crate::error::{WalletError, WalletResult};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON key-value storage
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> WalletResult<Option<Value>>;

    fn set_item(&self, key: &str, value: Value) -> WalletResult<()>;

    fn remove_item(&self, key: &str) -> WalletResult<()>;
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local storage, used in tests and before secure storage is ready
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> WalletResult<Option<Value>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> WalletResult<()> {
        self.items.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> WalletResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// One pretty-printed JSON file per key under `dir`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> WalletResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> WalletResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(WalletError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> WalletResult<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn set_item(&self, key: &str, value: Value) -> WalletResult<()> {
        let path = self.path_for(key)?;
        let encoded = serde_json::to_string_pretty(&value)?;

        // Write-then-rename so a crash never leaves a torn file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> WalletResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
