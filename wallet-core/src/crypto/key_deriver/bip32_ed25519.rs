// wallet-core/src/crypto/key_deriver/bip32_ed25519.rs
//
// BIP32-Ed25519 Key Derivation (Khovratovich/Law, with Peikert's amendment)
//
// Unlike SLIP-0010, this scheme supports soft (non-hardened) derivation:
// child keys are scalar tweaks of the parent, so `A' = A + 8·trunc(ZL)·B`.
// Reference: https://github.com/algorandfoundation/ARCs (ARC-52)
//
// Extended key layout (96 bytes, little-endian scalars):
//   kL (32) - scalar, used for signing and for A = kL·B
//   kR (32) - nonce material
//   c  (32) - chain code

use super::data_validation::{validate_data, SignMetadata};
use super::{
    KeyTree, RootKey, CHAIN_CODE_SIZE, ED25519_SCALAR_SIZE, EXTENDED_KEY_SIZE, SIGNATURE_SIZE,
};
use crate::crypto::paths::{is_hardened, BIP32DerivationType, DerivationPaths, KeyContext};
use crate::crypto::primitives::{DalekCrypto, Ed25519Crypto};
use crate::error::{WalletError, WalletResult};
use async_trait::async_trait;
use zeroize::{Zeroize, Zeroizing};

type ExtendedKey = Zeroizing<[u8; EXTENDED_KEY_SIZE]>;

/// BIP32-Ed25519 key tree over an injected primitive set
///
/// # Security
/// - every intermediate scalar and HMAC output is zeroized
/// - no state is kept between calls
#[derive(Debug, Clone, Default)]
pub struct Bip32Ed25519<C = DalekCrypto> {
    crypto: C,
}

impl Bip32Ed25519<DalekCrypto> {
    pub fn new() -> Self {
        Self::with_crypto(DalekCrypto)
    }
}

impl<C: Ed25519Crypto> Bip32Ed25519<C> {
    pub fn with_crypto(crypto: C) -> Self {
        Self { crypto }
    }

    /// Root key from seed
    ///
    /// k = SHA512(seed); while bit 5 of kL[31] is set, k = HMAC-SHA512(kR, kL);
    /// clamp kL; c = SHA256(0x01 || seed)
    pub fn root_from_seed(&self, seed: &[u8]) -> WalletResult<RootKey> {
        if seed.is_empty() {
            return Err(WalletError::key_derivation("empty seed"));
        }

        let mut k = Zeroizing::new(self.crypto.sha512(&[seed]));
        while k[31] & 0b0010_0000 != 0 {
            let (kl, kr) = k.split_at(ED25519_SCALAR_SIZE);
            let next = self.crypto.hmac_sha512(kr, &[kl])?;
            *k = next;
        }

        let mut bytes = [0u8; EXTENDED_KEY_SIZE];
        bytes[..64].copy_from_slice(&k[..]);

        // Clamp kL
        bytes[0] &= 0b1111_1000;
        bytes[31] &= 0b0111_1111;
        bytes[31] |= 0b0100_0000;

        let chain_code = self.crypto.sha256(&[&[0x01], seed]);
        bytes[64..].copy_from_slice(&chain_code);

        let root = RootKey::from_bytes(bytes);
        bytes.zeroize();
        Ok(root)
    }

    /// One level of private child derivation
    ///
    /// Hardened: Z = HMAC(c, 0x00||kL||kR||i), c' = HMAC(c, 0x01||kL||kR||i)[32..]
    /// Soft:     Z = HMAC(c, 0x02||A||i),      c' = HMAC(c, 0x03||A||i)[32..]
    /// kL' = kL + 8·trunc(ZL), kR' = kR + ZR mod 2^256
    pub fn derive_child_node_private(
        &self,
        extended_key: &[u8; EXTENDED_KEY_SIZE],
        index: u32,
        g: u32,
    ) -> WalletResult<ExtendedKey> {
        let kl = array32(&extended_key[..32])?;
        let kr = array32(&extended_key[32..64])?;
        let chain_code = &extended_key[64..];
        let index_le = index.to_le_bytes();

        let (z, child_chain) = if is_hardened(index) {
            let z = Zeroizing::new(
                self.crypto
                    .hmac_sha512(chain_code, &[&[0x00], kl, kr, &index_le])?,
            );
            let cc = Zeroizing::new(
                self.crypto
                    .hmac_sha512(chain_code, &[&[0x01], kl, kr, &index_le])?,
            );
            (z, cc)
        } else {
            let public_key = self.crypto.scalarmult_base_noclamp(kl)?;
            let z = Zeroizing::new(
                self.crypto
                    .hmac_sha512(chain_code, &[&[0x02], &public_key, &index_le])?,
            );
            let cc = Zeroizing::new(
                self.crypto
                    .hmac_sha512(chain_code, &[&[0x03], &public_key, &index_le])?,
            );
            (z, cc)
        };

        let zl = Zeroizing::new(trunc_256_minus_g_bits(array32(&z[..32])?, g));
        let left = Zeroizing::new(add_times_eight(kl, &zl).ok_or_else(|| {
            WalletError::key_derivation(format!("child scalar overflow at index {}", index))
        })?);
        let right = Zeroizing::new(add_mod_2_256(kr, array32(&z[32..])?));

        let mut child = Zeroizing::new([0u8; EXTENDED_KEY_SIZE]);
        child[..32].copy_from_slice(&left[..]);
        child[32..64].copy_from_slice(&right[..]);
        child[64..].copy_from_slice(&child_chain[32..32 + CHAIN_CODE_SIZE]);
        Ok(child)
    }

    /// Fold `derive_child_node_private` over a path
    pub fn derive_path(
        &self,
        root: &RootKey,
        path: &[u32],
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<ExtendedKey> {
        let g = derivation_type.g();
        let mut current = Zeroizing::new(*root.as_bytes());
        for &index in path {
            current = self.derive_child_node_private(&current, index, g)?;
        }
        Ok(current)
    }

    /// Ed25519 signature with an extended key
    ///
    /// r = SHA512(kR || M) mod L, R = r·B, h = SHA512(R || A || M) mod L,
    /// S = r + h·kL mod L. Verifiable by any standard ed25519 verifier.
    fn raw_sign(
        &self,
        extended_key: &[u8; EXTENDED_KEY_SIZE],
        message: &[u8],
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        let scalar = array32(&extended_key[..32]).map_err(|e| WalletError::signing(e.to_string()))?;
        let nonce_key = &extended_key[32..64];

        let public_key = self
            .crypto
            .scalarmult_base_noclamp(scalar)
            .map_err(|e| WalletError::signing(e.to_string()))?;

        let nonce_hash = Zeroizing::new(self.crypto.sha512(&[nonce_key, message]));
        let r = Zeroizing::new(self.crypto.scalar_reduce(&nonce_hash));

        let big_r = self
            .crypto
            .scalarmult_base_noclamp(&r)
            .map_err(|e| WalletError::signing(e.to_string()))?;

        let h = self
            .crypto
            .scalar_reduce(&self.crypto.sha512(&[&big_r, &public_key, message]));
        let s = self
            .crypto
            .scalar_add(&r, &self.crypto.scalar_mul(&h, scalar));

        let mut signature = [0u8; SIGNATURE_SIZE];
        signature[..32].copy_from_slice(&big_r);
        signature[32..].copy_from_slice(&s);
        Ok(signature)
    }
}

#[async_trait]
impl<C: Ed25519Crypto> KeyTree for Bip32Ed25519<C> {
    fn from_seed(&self, seed: &[u8]) -> WalletResult<RootKey> {
        self.root_from_seed(seed)
    }

    async fn derive_key(
        &self,
        root: &RootKey,
        path: &[u32],
        is_private: bool,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<Zeroizing<Vec<u8>>> {
        let derived = self.derive_path(root, path, derivation_type)?;
        if is_private {
            return Ok(Zeroizing::new(derived.to_vec()));
        }

        let public_key = self.crypto.scalarmult_base_noclamp(array32(&derived[..32])?)?;
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&public_key);
        out.extend_from_slice(&derived[64..]);
        Ok(Zeroizing::new(out))
    }

    async fn key_gen(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; 32]> {
        let path = DerivationPaths::bip44(context, account, key_index);
        let extended_public = self.derive_key(root, &path, false, derivation_type).await?;
        Ok(*array32(&extended_public[..32])?)
    }

    async fn sign_algo_transaction(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        prefix_encoded_tx: &[u8],
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        let path = DerivationPaths::bip44(context, account, key_index);
        let extended = self.derive_path(root, &path, derivation_type)?;
        self.raw_sign(&extended, prefix_encoded_tx)
    }

    async fn sign_data(
        &self,
        root: &RootKey,
        context: KeyContext,
        account: u32,
        key_index: u32,
        data: &[u8],
        metadata: &SignMetadata,
        derivation_type: BIP32DerivationType,
    ) -> WalletResult<[u8; SIGNATURE_SIZE]> {
        validate_data(data, metadata)?;

        let path = DerivationPaths::bip44(context, account, key_index);
        let extended = self.derive_path(root, &path, derivation_type)?;
        self.raw_sign(&extended, data)
    }

    fn verify_with_public_key(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
        let (Ok(signature), Ok(public_key)) = (
            <&[u8; SIGNATURE_SIZE]>::try_from(signature),
            <&[u8; 32]>::try_from(public_key),
        ) else {
            return false;
        };
        self.crypto.verify_detached(signature, message, public_key)
    }
}

// =============================================================================
// SCALAR HELPERS
// =============================================================================

/// Zero the top `g` bits of a 256-bit little-endian integer
pub fn trunc_256_minus_g_bits(bytes: &[u8; 32], g: u32) -> [u8; 32] {
    let mut truncated = *bytes;
    let mut remaining = g.min(256);
    for byte in truncated.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        if remaining >= 8 {
            *byte = 0;
            remaining -= 8;
        } else {
            *byte &= 0xff >> remaining;
            break;
        }
    }
    truncated
}

/// `a + 8·b` over 256-bit little-endian integers, `None` on overflow
fn add_times_eight(a: &[u8; 32], b: &[u8; 32]) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    let mut carry: u32 = 0;
    for i in 0..32 {
        let sum = a[i] as u32 + ((b[i] as u32) << 3) + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    (carry == 0).then_some(out)
}

/// `a + b mod 2^256` over little-endian integers
fn add_mod_2_256(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for i in 0..32 {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    out
}

#[inline]
fn array32(bytes: &[u8]) -> WalletResult<&[u8; 32]> {
    bytes.try_into().map_err(|_| {
        WalletError::invalid_key_format(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

// =============================================================================
// TESTS
// =============================================================================
