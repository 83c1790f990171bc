// wallet-core/src/crypto/mnemonic.rs
//
// Mnemonic Module - BIP-39 phrase generation, validation and seed derivation
// Standard: BIP-39 (Mnemonic), PBKDF2-HMAC-SHA512 (Seed Derivation)

use crate::error::{MnemonicError, WalletError, WalletResult};
use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Supported word counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum WordCount {
    /// 12 words (128-bit entropy)
    Twelve = 12,
    /// 15 words (160-bit entropy)
    Fifteen = 15,
    /// 18 words (192-bit entropy)
    Eighteen = 18,
    /// 21 words (224-bit entropy)
    TwentyOne = 21,
    /// 24 words (256-bit entropy)
    #[default]
    TwentyFour = 24,
}

impl WordCount {
    /// Bytes of entropy needed for this word count
    #[inline]
    pub const fn entropy_bytes(self) -> usize {
        match self {
            WordCount::Twelve => 16,
            WordCount::Fifteen => 20,
            WordCount::Eighteen => 24,
            WordCount::TwentyOne => 28,
            WordCount::TwentyFour => 32,
        }
    }
}

impl TryFrom<usize> for WordCount {
    type Error = MnemonicError;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        match count {
            12 => Ok(WordCount::Twelve),
            15 => Ok(WordCount::Fifteen),
            18 => Ok(WordCount::Eighteen),
            21 => Ok(WordCount::TwentyOne),
            24 => Ok(WordCount::TwentyFour),
            other => Err(MnemonicError::InvalidWordCount(other)),
        }
    }
}

impl From<WordCount> for usize {
    fn from(count: WordCount) -> usize {
        count as usize
    }
}

/// Wallet Mnemonic - BIP-39 phrase held only for the duration of one operation
///
/// # Security Architecture
/// - **ZeroizeOnDrop**: the phrase is overwritten when the value is dropped
/// - **CSPRNG**: new phrases use `OsRng`
/// - **No Debug Leak**: custom Debug never prints the phrase
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletMnemonic {
    phrase: String,
    word_count: usize,
}

impl std::fmt::Debug for WalletMnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletMnemonic")
            .field("word_count", &self.word_count)
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

impl WalletMnemonic {
    // =========================================================================
    // CONSTRUCTORS
    // =========================================================================

    /// Generate a fresh mnemonic from OS entropy
    pub fn with_word_count(word_count: WordCount) -> WalletResult<Self> {
        let entropy_size = word_count.entropy_bytes();

        // Stack-allocated entropy buffer (max 32 bytes)
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy[..entropy_size]);

        let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_size]);
        entropy.zeroize();
        let mnemonic = mnemonic.map_err(MnemonicError::from)?;

        Ok(Self {
            phrase: mnemonic.to_string(),
            word_count: word_count as usize,
        })
    }

    /// Restore a mnemonic from an existing phrase
    ///
    /// # Validation
    /// - word count (12, 15, 18, 21, 24)
    /// - every word is in the BIP-39 English wordlist
    /// - checksum
    pub fn from_phrase(phrase: &str) -> WalletResult<Self> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>();
        let count = normalized.len();

        WordCount::try_from(count)?;

        let normalized_phrase = normalized.join(" ");
        Mnemonic::parse_normalized(&normalized_phrase).map_err(MnemonicError::from)?;

        Ok(Self {
            phrase: normalized_phrase,
            word_count: count,
        })
    }

    // =========================================================================
    // GETTERS
    // =========================================================================

    /// The mnemonic phrase
    ///
    /// # Warning
    /// Never log or persist this value.
    #[inline]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    #[inline]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    // =========================================================================
    // SEED DERIVATION
    // =========================================================================

    /// Derive the 64-byte seed (PBKDF2-HMAC-SHA512, 2048 rounds) on the calling thread
    ///
    /// # Arguments
    /// * `passphrase` - Optional BIP-39 passphrase
    pub fn to_seed(&self, passphrase: Option<&str>) -> WalletResult<Zeroizing<[u8; 64]>> {
        let mnemonic = Mnemonic::parse_normalized(&self.phrase).map_err(MnemonicError::from)?;
        Ok(Zeroizing::new(mnemonic.to_seed_normalized(passphrase.unwrap_or(""))))
    }

    /// Same seed as [`WalletMnemonic::to_seed`], computed on the blocking pool
    ///
    /// PBKDF2 takes long enough on mobile CPUs that it should not run on the
    /// async executor.
    pub async fn to_seed_async(
        &self,
        passphrase: Option<&str>,
    ) -> WalletResult<Zeroizing<[u8; 64]>> {
        let mnemonic = self.clone();
        let passphrase = Zeroizing::new(passphrase.unwrap_or("").to_string());

        tokio::task::spawn_blocking(move || mnemonic.to_seed(Some(passphrase.as_str())))
            .await
            .map_err(|e| WalletError::key_derivation(format!("seed task failed: {}", e)))?
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
