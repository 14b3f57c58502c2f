//! Secret material and bundle-level sealing
//!
//! Secrets leave the source either sealed with a passphrase-derived key or
//! redacted. Sealing uses ChaCha20-Poly1305 with an Argon2id key; the salt
//! travels with the bundle, the passphrase never does.

use argon2::{Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of sealing keys in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the derivation salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of nonce in bytes
pub const NONCE_SIZE: usize = 12;

const TAG_SIZE: usize = 16;

// Argon2id cost parameters; fixed so that only the salt needs to travel.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

/// Secret errors
#[derive(Debug, Error)]
pub enum SecretError {
    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong passphrase or tampered data)
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Bundle carries sealed secrets but no passphrase was supplied
    #[error("bundle contains encrypted secrets but no passphrase was given")]
    MissingPassphrase,

    /// Bundle carries sealed secrets but no salt
    #[error("bundle contains encrypted secrets but no salt")]
    MissingSalt,
}

/// Result type for secret operations
pub type SecretResult<T> = Result<T, SecretError>;

/// Secret-bearing payload material
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Secret {
    /// Plain value, as held by a store
    Clear(String),
    /// Base64 `nonce || ciphertext`, as carried by a bundle
    Encrypted(String),
    /// Value was withheld at export
    Redacted,
}

impl Secret {
    /// Whether the secret is sealed
    #[inline]
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear(_) => f.write_str("Clear([REDACTED])"),
            Self::Encrypted(v) => f.debug_tuple("Encrypted").field(v).finish(),
            Self::Redacted => f.write_str("Redacted"),
        }
    }
}

/// Key derivation salt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt {
    bytes: [u8; SALT_SIZE],
}

impl Salt {
    /// Random salt
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Base64 form stored in bundles
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Parse the base64 form
    pub fn from_base64(encoded: &str) -> SecretResult<Self> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| SecretError::KeyDerivation(format!("invalid salt: {e}")))?;
        let bytes: [u8; SALT_SIZE] = raw.try_into().map_err(|v: Vec<u8>| {
            SecretError::KeyDerivation(format!("salt must be {SALT_SIZE} bytes, got {}", v.len()))
        })?;
        Ok(Self { bytes })
    }
}

/// Passphrase-derived sealing key, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey {
    bytes: [u8; KEY_SIZE],
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealingKey").field("bytes", &"[REDACTED]").finish()
    }
}

impl SealingKey {
    /// Derive with Argon2id
    pub fn derive(passphrase: &str, salt: &Salt) -> SecretResult<Self> {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_SIZE))
            .map_err(|e| SecretError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut bytes = [0u8; KEY_SIZE];
        argon2
            .hash_password_into(passphrase.as_bytes(), &salt.bytes, &mut bytes)
            .map_err(|e| SecretError::KeyDerivation(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Encrypt `plaintext`, returning base64 `nonce || ciphertext`
    pub fn encrypt(&self, plaintext: &str) -> SecretResult<String> {
        let cipher = ChaCha20Poly1305::new((&self.bytes).into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Reverse of [`SealingKey::encrypt`]
    pub fn decrypt(&self, encoded: &str) -> SecretResult<String> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| SecretError::Decryption(format!("invalid base64: {e}")))?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretError::Decryption("data too short".to_string()));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);

        let cipher = ChaCha20Poly1305::new((&self.bytes).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Decryption("wrong passphrase or tampered data".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| SecretError::Decryption(e.to_string()))
    }

    /// Seal a clear secret; other forms pass through
    pub fn seal(&self, secret: &Secret) -> SecretResult<Secret> {
        match secret {
            Secret::Clear(value) => Ok(Secret::Encrypted(self.encrypt(value)?)),
            other => Ok(other.clone()),
        }
    }

    /// Open a sealed secret; other forms pass through
    pub fn open(&self, secret: &Secret) -> SecretResult<Secret> {
        match secret {
            Secret::Encrypted(value) => Ok(Secret::Clear(self.decrypt(value)?)),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_open() {
        let salt = Salt::random();
        let key = SealingKey::derive("correct horse", &salt).unwrap();
        let sealed = key.seal(&Secret::Clear("s3cret".into())).unwrap();
        assert!(sealed.is_encrypted());
        assert_eq!(key.open(&sealed).unwrap(), Secret::Clear("s3cret".into()));
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let salt = Salt::random();
        let key = SealingKey::derive("right", &salt).unwrap();
        let wrong = SealingKey::derive("wrong", &salt).unwrap();
        let sealed = key.encrypt("value").unwrap();
        assert!(matches!(wrong.decrypt(&sealed), Err(SecretError::Decryption(_))));
    }

    #[test]
    fn test_salt_base64_round_trip() {
        let salt = Salt::random();
        assert_eq!(Salt::from_base64(&salt.to_base64()).unwrap(), salt);
        assert!(Salt::from_base64("c2hvcnQ=").is_err());
    }

    #[test]
    fn test_redacted_passes_through() {
        let key = SealingKey::derive("p", &Salt::random()).unwrap();
        assert_eq!(key.seal(&Secret::Redacted).unwrap(), Secret::Redacted);
        assert_eq!(key.open(&Secret::Redacted).unwrap(), Secret::Redacted);
    }

    #[test]
    fn test_clear_secret_debug_is_masked() {
        let rendered = format!("{:?}", Secret::Clear("hunter2".into()));
        assert!(!rendered.contains("hunter2"));
    }
}
