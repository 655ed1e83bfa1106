//! Cipher configuration
//!
//! Key material is chosen once at startup and never changes for the lifetime
//! of the process.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CipherError;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// AES block / CBC IV length in bytes
pub const IV_LEN: usize = 16;

/// Immutable key and IV shared by every frame encryption
#[derive(Clone, PartialEq, Eq)]
pub struct CipherConfig {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl CipherConfig {
    /// Create a config from explicit key material
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Generate a random key and IV from the OS RNG
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Build a config from slices, checking lengths
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CipherError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CipherError::InvalidIvLength {
            expected: IV_LEN,
            actual: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    /// Build a config from base64-encoded key and IV
    pub fn from_base64(key: &str, iv: &str) -> Result<Self, CipherError> {
        let key = STANDARD
            .decode(key.trim())
            .map_err(|e| CipherError::InvalidEncoding(format!("key: {}", e)))?;
        let iv = STANDARD
            .decode(iv.trim())
            .map_err(|e| CipherError::InvalidEncoding(format!("iv: {}", e)))?;
        Self::from_slices(&key, &iv)
    }

    /// Raw key bytes
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Raw IV bytes
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Key as standard base64, as embedded in the bootstrap page
    pub fn key_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// IV as standard base64, as embedded in the bootstrap page
    pub fn iv_base64(&self) -> String {
        STANDARD.encode(self.iv)
    }
}

// Keep key material out of logs
impl std::fmt::Debug for CipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherConfig")
            .field("key_len", &KEY_LEN)
            .field("iv_len", &IV_LEN)
            .finish_non_exhaustive()
    }
}
