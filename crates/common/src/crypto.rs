//! Cryptographic utilities for Testwire
//!
//! Ed25519 signing for temporary signed URLs, plus the verification-key hash
//! embedded in email verification links.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use url::Url;

/// Ed25519 key pair for signing URLs
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Load key pair from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path).await?;
        let bytes: [u8; 32] = data
            .try_into()
            .map_err(|_| Error::Crypto("Invalid key length".to_string()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    /// Save key pair to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.signing_key.to_bytes()).await?;
        Ok(())
    }

    /// Get the public key as hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the verifying key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign the given data
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }

    /// Verify a signature
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| Error::Crypto("Invalid signature length".to_string()))?;
        let sig = Signature::from_bytes(&sig_bytes);
        self.verifying_key().verify(data, &sig)?;
        Ok(())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Hex sha256 of a user's verification key (their email), embedded as the
/// `hash` route parameter of verification URLs.
pub fn verification_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build a signed URL for `path` that stays valid until `expires_at`.
///
/// The signature covers the path and expiry, so neither can be altered
/// without invalidating the link.
pub fn temporary_signed_url(
    key: &KeyPair,
    base: &str,
    path: &str,
    expires_at: DateTime<Utc>,
) -> String {
    let path = crate::routes::normalize_path(path);
    let expires = expires_at.timestamp();
    let payload = signing_payload(&path, expires);
    let signature = hex::encode(key.sign(payload.as_bytes()));
    format!(
        "{}{}?expires={}&signature={}",
        base.trim_end_matches('/'),
        path,
        expires,
        signature
    )
}

/// Check a signed URL's integrity and expiry against `now`.
pub fn verify_signed_url(key: &KeyPair, url: &str, now: DateTime<Utc>) -> Result<()> {
    let parsed = Url::parse(url)?;

    let mut expires: Option<i64> = None;
    let mut signature: Option<String> = None;
    for (name, value) in parsed.query_pairs() {
        match name.as_ref() {
            "expires" => expires = value.parse().ok(),
            "signature" => signature = Some(value.into_owned()),
            _ => {}
        }
    }
    let expires = expires.ok_or_else(|| Error::Crypto("Missing expires parameter".to_string()))?;
    let signature =
        signature.ok_or_else(|| Error::Crypto("Missing signature parameter".to_string()))?;
    let signature = hex::decode(signature).map_err(|_| Error::InvalidSignature)?;

    let payload = signing_payload(parsed.path(), expires);
    key.verify(payload.as_bytes(), &signature)
        .map_err(|_| Error::InvalidSignature)?;

    if now.timestamp() > expires {
        return Err(Error::LinkExpired);
    }
    Ok(())
}

fn signing_payload(path: &str, expires: i64) -> String {
    format!("{}?expires={}", path, expires)
}
