//! Per-frame AES-256-CBC encryption
//!
//! Every frame is encrypted with a freshly initialized CBC encryptor built
//! from the same key and the same IV. Identical frame prefixes therefore
//! produce identical ciphertext prefixes. Browser clients decrypt with the
//! fixed IV handed out by the bootstrap page, so changing this would break
//! the wire format.

use std::time::Instant;

use aes::Aes256;
use bytes::Bytes;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::config::CipherConfig;
use crate::error::CipherError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Output of a single frame encryption
#[derive(Debug, Clone)]
pub struct EncryptedFrame {
    /// PKCS#7-padded ciphertext
    pub ciphertext: Bytes,
    /// Wall-clock time spent encrypting, in milliseconds
    pub latency_ms: f64,
}

/// Frame cipher bound to a fixed [`CipherConfig`]
#[derive(Debug, Clone)]
pub struct FrameCipher {
    config: CipherConfig,
}

impl FrameCipher {
    /// Create a cipher for the given configuration
    pub fn new(config: CipherConfig) -> Self {
        Self { config }
    }

    /// Get the cipher configuration
    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    fn encryptor(&self) -> Aes256CbcEnc {
        Aes256CbcEnc::new(self.config.key().into(), self.config.iv().into())
    }

    fn decryptor(&self) -> Aes256CbcDec {
        Aes256CbcDec::new(self.config.key().into(), self.config.iv().into())
    }

    /// Encrypt one frame
    ///
    /// Pads with PKCS#7 and encrypts under the configured key and IV. Only
    /// the encryption itself is timed; the key schedule is not.
    pub fn encrypt(&self, frame: &[u8]) -> Result<EncryptedFrame, CipherError> {
        let encryptor = self.encryptor();

        let start = Instant::now();
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(frame);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(EncryptedFrame {
            ciphertext: Bytes::from(ciphertext),
            latency_ms,
        })
    }

    /// Decrypt one frame and strip its PKCS#7 padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::UnalignedCiphertext(ciphertext.len()));
        }

        self.decryptor()
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::InvalidPadding)
    }
}

/// Per-frame encryption as seen by the producer
pub trait FrameEncryptor: Send {
    /// Encrypt one frame, reporting how long it took
    fn encrypt_frame(&self, frame: &[u8]) -> Result<EncryptedFrame, CipherError>;
}

impl FrameEncryptor for FrameCipher {
    fn encrypt_frame(&self, frame: &[u8]) -> Result<EncryptedFrame, CipherError> {
        self.encrypt(frame)
    }
}

/// Length of `len` bytes after PKCS#7 padding
///
/// Always adds at least one byte; a block-aligned input gains a full block.
pub fn padded_len(len: usize) -> usize {
    (len / BLOCK_SIZE + 1) * BLOCK_SIZE
}
