//! `GET /auth/server-pubkey` key material.
//!
//! Veil's current ciphertext-bundle path accepts uploads in plaintext over
//! TLS; this RSA keypair only exists so the legacy encrypted-bundle-upload
//! endpoint named in the interface table is not a 501. Only the public key
//! is ever served, and the private half is never used to decrypt anything
//! in this build.

use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use veil_common::config::AppConfig;

/// Load the configured PEM private key, or generate a fresh RSA-2048
/// keypair that lives for the process lifetime.
pub fn server_public_key_pem(config: &AppConfig) -> anyhow::Result<String> {
    let private_key = match &config.server_rsa_priv_path {
        Some(path) => {
            let pem = std::fs::read_to_string(path)?;
            RsaPrivateKey::from_pkcs8_pem(&pem)?
        }
        None => {
            tracing::warn!("no server_rsa_priv_path configured, generating an ephemeral RSA-2048 keypair");
            RsaPrivateKey::new(&mut rand_core::OsRng, 2048)?
        }
    };

    let public_key = RsaPublicKey::from(&private_key);
    Ok(public_key.to_public_key_pem(LineEnding::LF)?)
}
