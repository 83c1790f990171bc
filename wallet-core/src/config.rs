// wallet-core/src/config.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::{BIP32DerivationType, WordCount};
use crate::error::{WalletError, WalletResult};
use crate::signing::store::{SIGNING_STORE_KEY, SIGNING_STORE_VERSION};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCoreConfig {
    /// Storage key the signing store snapshot lives under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Snapshot version; persisted state with another version is dropped
    #[serde(default = "default_persist_version")]
    pub persist_version: u32,
    #[serde(default)]
    pub mnemonic_words: WordCount,
    #[serde(default)]
    pub default_derivation_type: BIP32DerivationType,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_storage_key() -> String {
    SIGNING_STORE_KEY.to_string()
}

fn default_persist_version() -> u32 {
    SIGNING_STORE_VERSION
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl WalletCoreConfig {
    pub fn load(path: &Path) -> WalletResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|err| WalletError::Config(format!("unable to read config: {err}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> WalletResult<Self> {
        toml::from_str(content)
            .map_err(|err| WalletError::Config(format!("unable to parse config: {err}")))
    }

    pub fn save(&self, path: &Path) -> WalletResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|err| WalletError::Config(format!("unable to create config dir: {err}")))?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| WalletError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)
            .map_err(|err| WalletError::Config(format!("unable to write config: {err}")))?;
        Ok(())
    }
}

impl Default for WalletCoreConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            persist_version: default_persist_version(),
            mnemonic_words: WordCount::default(),
            default_derivation_type: BIP32DerivationType::default(),
            log_filter: default_log_filter(),
        }
    }
}
