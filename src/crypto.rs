//! Per-session key derivation, AEAD encryption/decryption, and
//! crypto-shredding.
//!
//! Encrypted sessions route 100% of on-disk payloads through this envelope.
//! Non-encrypted sessions must never construct one (zero-overhead path).

use crate::config::CryptoConfig;
use crate::error::{MemoryError, MemoryResult};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
const DEK_LEN: usize = 32;

/// Generate a fresh random salt for a new encrypted session.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn derive_dek(
    passphrase: &str,
    salt: &[u8],
    config: &CryptoConfig,
) -> MemoryResult<Zeroizing<[u8; DEK_LEN]>> {
    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        Some(DEK_LEN),
    )
    .map_err(|e| MemoryError::StorageError(format!("invalid argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut dek = Zeroizing::new([0u8; DEK_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, dek.as_mut())
        .map_err(|_| MemoryError::DecryptionFailed)?;
    Ok(dek)
}

/// Holds a session's data-encryption key in memory and performs AEAD
/// encryption/decryption. Never written to disk; destroyed by `shred`.
pub struct CryptoEnvelope {
    dek: Option<Zeroizing<[u8; DEK_LEN]>>,
}

impl CryptoEnvelope {
    /// Derive a fresh envelope from a passphrase and salt.
    pub fn derive(passphrase: &str, salt: &[u8], config: &CryptoConfig) -> MemoryResult<Self> {
        let dek = derive_dek(passphrase, salt, config)?;
        Ok(Self { dek: Some(dek) })
    }

    fn cipher(&self) -> MemoryResult<Aes256Gcm> {
        let dek = self
            .dek
            .as_ref()
            .ok_or(MemoryError::SessionQuarantined("key shredded".to_string()))?;
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(dek.as_ref())))
    }

    /// Encrypt `plaintext`, binding `associated_data` (e.g. a summary id) to
    /// the record. Output layout: `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> MemoryResult<Vec<u8>> {
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| MemoryError::StorageError("encryption failure".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext || tag` record. Failure for an
    /// individual record is not fatal to the session — callers skip the
    /// record and report it via a query-result footer, per spec §7.
    pub fn decrypt(&self, record: &[u8], associated_data: &[u8]) -> MemoryResult<Vec<u8>> {
        if record.len() < NONCE_LEN + TAG_LEN {
            return Err(MemoryError::DecryptionFailed);
        }
        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = record.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: associated_data,
                },
            )
            .map_err(|_| MemoryError::DecryptionFailed)
    }

    /// Crypto-shred: destroy the in-memory key so every encrypted record on
    /// disk becomes irrecoverable, independent of whether the directory is
    /// also unlinked.
    pub fn shred(&mut self) {
        self.dek = None;
    }

    pub fn is_shredded(&self) -> bool {
        self.dek.is_none()
    }
}

impl std::fmt::Debug for CryptoEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEnvelope")
            .field("shredded", &self.is_shredded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CryptoConfig {
        // Shrink Argon2 cost for fast unit tests; production defaults live
        // in CryptoConfig::default().
        CryptoConfig {
            argon2_time_cost: 1,
            argon2_memory_cost_kib: 8 * 1024,
            argon2_parallelism: 1,
        }
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let salt = generate_salt();
        let config = test_config();
        let envelope = CryptoEnvelope::derive("correct horse", &salt, &config).unwrap();

        let record = envelope.encrypt(b"hello world", b"msg-1").unwrap();
        let plaintext = envelope.decrypt(&record, b"msg-1").unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn wrong_passphrase_fails_decryption() {
        let salt = generate_salt();
        let config = test_config();
        let envelope_a = CryptoEnvelope::derive("p1", &salt, &config).unwrap();
        let envelope_b = CryptoEnvelope::derive("p2", &salt, &config).unwrap();

        let record = envelope_a.encrypt(b"secret", b"aad").unwrap();
        let result = envelope_b.decrypt(&record, b"aad");
        assert!(matches!(result, Err(MemoryError::DecryptionFailed)));
    }

    #[test]
    fn wrong_associated_data_fails_decryption() {
        let salt = generate_salt();
        let config = test_config();
        let envelope = CryptoEnvelope::derive("p1", &salt, &config).unwrap();

        let record = envelope.encrypt(b"secret", b"summary-1").unwrap();
        let result = envelope.decrypt(&record, b"summary-2");
        assert!(matches!(result, Err(MemoryError::DecryptionFailed)));
    }

    #[test]
    fn shred_makes_further_operations_fail() {
        let salt = generate_salt();
        let config = test_config();
        let mut envelope = CryptoEnvelope::derive("p1", &salt, &config).unwrap();
        let record = envelope.encrypt(b"secret", b"aad").unwrap();

        envelope.shred();
        assert!(envelope.is_shredded());
        assert!(envelope.encrypt(b"more", b"aad").is_err());
        assert!(envelope.decrypt(&record, b"aad").is_err());
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let salt = generate_salt();
        let config = test_config();
        let envelope = CryptoEnvelope::derive("p1", &salt, &config).unwrap();

        let a = envelope.encrypt(b"same plaintext", b"aad").unwrap();
        let b = envelope.encrypt(b"same plaintext", b"aad").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }
}
