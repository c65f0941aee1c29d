//! Crypto Verifier (C2): key material validation, Ed25519 signature
//! verification, and one-time code hashing.
//!
//! The server never performs Signal-style ratchet/session cryptography —
//! that happens exclusively on clients. What the server *does* verify:
//!
//! - **Key material shape**: uploaded key blobs decode to the expected byte
//!   length for X25519 / Ed25519 material.
//! - **Signed pre-key signatures**: a real Ed25519 verification of the
//!   signed pre-key's signature under the device's identity key, via
//!   `ed25519-dalek`. A pre-key whose signature does not verify is rejected
//!   before it ever reaches the store.
//! - **One-time registration codes**: codes are never stored in the clear
//!   or as a bare hash. They're hashed with HMAC-SHA256 under a process
//!   pepper, and compared in constant time.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use ed25519_dalek::{Signature, VerifyingKey};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Byte length of an Ed25519 public key.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
/// Byte length of an X25519 public key.
pub const X25519_PUBLIC_KEY_LEN: usize = 32;
/// Byte length of an Ed25519 signature.
pub const ED25519_SIGNATURE_LEN: usize = 64;

// ============================================================
// Key material validation
// ============================================================

/// Error returned when uploaded key material fails validation.
#[derive(Debug, thiserror::Error)]
pub enum KeyValidationError {
    #[error("key is not valid base64: {0}")]
    NotBase64(String),
    #[error("key has wrong length for {label}: expected {expected} bytes, got {actual}")]
    WrongLength {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("signature failed verification")]
    SignatureInvalid,
    #[error("identity key is not a valid Ed25519 public key")]
    MalformedIdentityKey,
}

/// Validate that a string is valid base64 and decodes to exactly
/// `expected_len` bytes.
pub fn validate_key_bytes(
    encoded: &str,
    expected_len: usize,
    label: &str,
) -> Result<Vec<u8>, KeyValidationError> {
    let bytes = B64
        .decode(encoded)
        .map_err(|_| KeyValidationError::NotBase64(label.to_owned()))?;
    if bytes.len() != expected_len {
        return Err(KeyValidationError::WrongLength {
            label: label.to_owned(),
            expected: expected_len,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Validate an Ed25519 public identity key (32 bytes, base64-encoded).
pub fn validate_identity_key(encoded: &str) -> Result<Vec<u8>, KeyValidationError> {
    validate_key_bytes(encoded, ED25519_PUBLIC_KEY_LEN, "identity_key")
}

/// Validate an X25519 public key (signed pre-key or one-time pre-key, 32 bytes).
pub fn validate_x25519_key(encoded: &str, label: &str) -> Result<Vec<u8>, KeyValidationError> {
    validate_key_bytes(encoded, X25519_PUBLIC_KEY_LEN, label)
}

/// Validate an Ed25519 signature (64 bytes, base64-encoded).
pub fn validate_signature(encoded: &str) -> Result<Vec<u8>, KeyValidationError> {
    validate_key_bytes(encoded, ED25519_SIGNATURE_LEN, "signed_pre_key_sig")
}

// ============================================================
// Signed pre-key verification
// ============================================================

/// Verify that `signature` over `prekey_pub` was produced by the holder of
/// `identity_pub`. All three arguments are base64-encoded.
///
/// This performs a real Ed25519 verification via `verify_strict` (which
/// rejects non-canonical / malleable signature encodings), not merely a
/// length check.
pub fn verify_signed_prekey(
    identity_pub: &str,
    prekey_pub: &str,
    signature: &str,
) -> Result<bool, KeyValidationError> {
    let identity_bytes = validate_identity_key(identity_pub)?;
    let prekey_bytes = validate_x25519_key(prekey_pub, "signed_pre_key")?;
    let sig_bytes = validate_signature(signature)?;

    let identity_array: [u8; ED25519_PUBLIC_KEY_LEN] = identity_bytes
        .try_into()
        .map_err(|_| KeyValidationError::MalformedIdentityKey)?;
    let verifying_key = VerifyingKey::from_bytes(&identity_array)
        .map_err(|_| KeyValidationError::MalformedIdentityKey)?;

    let sig_array: [u8; ED25519_SIGNATURE_LEN] = sig_bytes
        .try_into()
        .map_err(|_| KeyValidationError::SignatureInvalid)?;
    let signature = Signature::from_bytes(&sig_array);

    Ok(verifying_key
        .verify_strict(&prekey_bytes, &signature)
        .is_ok())
}

// ============================================================
// One-time registration codes
// ============================================================

/// A freshly generated registration code, plus its HMAC under the process
/// pepper for storage. The plaintext is only ever returned to the caller
/// that must deliver it out-of-band (SMS/email); it is never persisted.
pub struct GeneratedCode {
    pub plaintext: String,
    pub code_hash: Vec<u8>,
}

/// Generate a cryptographically random `digits`-digit decimal code and its
/// HMAC-SHA256 hash under `pepper`.
pub fn generate_code(digits: u8, pepper: &[u8]) -> GeneratedCode {
    let mut rng = rand::rngs::OsRng;
    let plaintext: String = (0..digits)
        .map(|_| char::from_digit(rng.random_range(0..10), 10).unwrap())
        .collect();
    let code_hash = hash_code(&plaintext, pepper);
    GeneratedCode {
        plaintext,
        code_hash,
    }
}

/// Compute the HMAC-SHA256 of `code` under `pepper`. Used both to generate
/// the stored hash and to recompute it for comparison during verification.
pub fn hash_code(code: &str, pepper: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(pepper).expect("HMAC accepts any key length");
    mac.update(code.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Verify a submitted code against a stored hash, in constant time.
///
/// Returns `false` on any mismatch, including a malformed submission —
/// never distinguishes "wrong code" from "malformed code" in timing or
/// return value, so an attacker learns nothing from this call beyond
/// pass/fail.
pub fn verify_code(submitted: &str, pepper: &[u8], stored_hash: &[u8]) -> bool {
    let candidate = hash_code(submitted, pepper);
    candidate.ct_eq(stored_hash).into()
}

// ============================================================
// Helpers
// ============================================================

/// Encode arbitrary bytes to base64 (standard alphabet, padded).
pub fn to_base64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

/// Decode base64 to bytes, returning `None` on failure.
pub fn from_base64(encoded: &str) -> Option<Vec<u8>> {
    B64.decode(encoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    // `ed25519-dalek` 2.1 bounds key generation on `rand_core` 0.6's
    // `CryptoRngCore`. `rand` 0.9's `OsRng` implements `rand_core` 0.9
    // traits, not 0.6, so the generator here draws from `rand_core`
    // directly rather than through the `rand` facade.
    fn gen_keypair() -> SigningKey {
        SigningKey::generate(&mut rand_core::OsRng)
    }

    #[test]
    fn verify_signed_prekey_accepts_valid_signature() {
        let identity = gen_keypair();
        let prekey_bytes = [7u8; X25519_PUBLIC_KEY_LEN];
        let signature = identity.sign(&prekey_bytes);

        let identity_b64 = to_base64(identity.verifying_key().as_bytes());
        let prekey_b64 = to_base64(&prekey_bytes);
        let sig_b64 = to_base64(&signature.to_bytes());

        let ok = verify_signed_prekey(&identity_b64, &prekey_b64, &sig_b64).unwrap();
        assert!(ok);
    }

    #[test]
    fn verify_signed_prekey_rejects_tampered_prekey() {
        let identity = gen_keypair();
        let prekey_bytes = [7u8; X25519_PUBLIC_KEY_LEN];
        let signature = identity.sign(&prekey_bytes);

        let identity_b64 = to_base64(identity.verifying_key().as_bytes());
        let tampered_prekey_b64 = to_base64(&[8u8; X25519_PUBLIC_KEY_LEN]);
        let sig_b64 = to_base64(&signature.to_bytes());

        let ok = verify_signed_prekey(&identity_b64, &tampered_prekey_b64, &sig_b64).unwrap();
        assert!(!ok);
    }

    #[test]
    fn verify_signed_prekey_rejects_signature_from_wrong_identity() {
        let identity = gen_keypair();
        let impostor = gen_keypair();
        let prekey_bytes = [7u8; X25519_PUBLIC_KEY_LEN];
        let signature = impostor.sign(&prekey_bytes);

        let identity_b64 = to_base64(identity.verifying_key().as_bytes());
        let prekey_b64 = to_base64(&prekey_bytes);
        let sig_b64 = to_base64(&signature.to_bytes());

        let ok = verify_signed_prekey(&identity_b64, &prekey_b64, &sig_b64).unwrap();
        assert!(!ok);
    }

    #[test]
    fn validate_identity_key_bad_length() {
        let short = to_base64(&[0u8; 16]);
        assert!(validate_identity_key(&short).is_err());
    }

    #[test]
    fn code_roundtrips_through_hash_and_verify() {
        let pepper = b"test-pepper";
        let generated = generate_code(6, pepper);
        assert_eq!(generated.plaintext.len(), 6);
        assert!(verify_code(&generated.plaintext, pepper, &generated.code_hash));
    }

    #[test]
    fn wrong_code_fails_verification() {
        let pepper = b"test-pepper";
        let generated = generate_code(6, pepper);
        assert!(!verify_code("000000", pepper, &generated.code_hash));
    }

    #[test]
    fn different_pepper_fails_verification() {
        let generated = generate_code(6, b"pepper-a");
        assert!(!verify_code(&generated.plaintext, b"pepper-b", &generated.code_hash));
    }
}
