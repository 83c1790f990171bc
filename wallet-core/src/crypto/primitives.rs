// wallet-core/src/crypto/primitives.rs
//
// Ed25519 primitive operations used by the BIP32-Ed25519 key tree.
//
// Semantics follow libsodium's `crypto_scalarmult_ed25519_base_noclamp`,
// `crypto_core_ed25519_scalar_*` and `crypto_sign_verify_detached`, so any
// binding exposing those calls can stand in for `DalekCrypto`.

use crate::error::{WalletError, WalletResult};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::{Signature, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

type HmacSha512 = Hmac<Sha512>;

/// Primitive capability set the key tree is built on
///
/// Hash inputs are passed as slices of parts so callers never have to
/// concatenate secret material into temporary heap buffers.
pub trait Ed25519Crypto: Send + Sync {
    fn sha512(&self, parts: &[&[u8]]) -> [u8; 64];

    fn sha256(&self, parts: &[&[u8]]) -> [u8; 32];

    fn hmac_sha512(&self, key: &[u8], parts: &[&[u8]]) -> WalletResult<[u8; 64]>;

    /// `scalar · B` without clamping; fails for the zero scalar
    fn scalarmult_base_noclamp(&self, scalar: &[u8; 32]) -> WalletResult<[u8; 32]>;

    /// Reduce a 512-bit little-endian integer mod L
    fn scalar_reduce(&self, wide: &[u8; 64]) -> [u8; 32];

    /// `(a + b) mod L`
    fn scalar_add(&self, a: &[u8; 32], b: &[u8; 32]) -> [u8; 32];

    /// `(a · b) mod L`
    fn scalar_mul(&self, a: &[u8; 32], b: &[u8; 32]) -> [u8; 32];

    fn verify_detached(&self, signature: &[u8; 64], message: &[u8], public_key: &[u8; 32]) -> bool;
}

/// Pure-Rust primitives (curve25519-dalek / ed25519-dalek / RustCrypto)
#[derive(Debug, Clone, Copy, Default)]
pub struct DalekCrypto;

impl Ed25519Crypto for DalekCrypto {
    fn sha512(&self, parts: &[&[u8]]) -> [u8; 64] {
        let mut hasher = Sha512::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    fn sha256(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    fn hmac_sha512(&self, key: &[u8], parts: &[&[u8]]) -> WalletResult<[u8; 64]> {
        let mut mac = HmacSha512::new_from_slice(key)
            .map_err(|e| WalletError::key_derivation(format!("HMAC init failed: {}", e)))?;
        for part in parts {
            mac.update(part);
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }

    fn scalarmult_base_noclamp(&self, scalar: &[u8; 32]) -> WalletResult<[u8; 32]> {
        // libsodium only clears the top bit in the noclamp variant
        let mut t = *scalar;
        t[31] &= 0x7f;
        let s = Scalar::from_bytes_mod_order(t);
        t.zeroize();

        if s == Scalar::ZERO {
            return Err(WalletError::key_derivation(
                "scalar multiplication by zero",
            ));
        }
        Ok(EdwardsPoint::mul_base(&s).compress().to_bytes())
    }

    fn scalar_reduce(&self, wide: &[u8; 64]) -> [u8; 32] {
        Scalar::from_bytes_mod_order_wide(wide).to_bytes()
    }

    fn scalar_add(&self, a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
        (Scalar::from_bytes_mod_order(*a) + Scalar::from_bytes_mod_order(*b)).to_bytes()
    }

    fn scalar_mul(&self, a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
        (Scalar::from_bytes_mod_order(*a) * Scalar::from_bytes_mod_order(*b)).to_bytes()
    }

    fn verify_detached(&self, signature: &[u8; 64], message: &[u8], public_key: &[u8; 32]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let signature = Signature::from_bytes(signature);
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}
