//! Frame encryption
//!
//! AES-256 in CBC mode with PKCS#7 padding. The key and IV live in an
//! immutable [`CipherConfig`] created once at startup and handed to the
//! [`FrameCipher`] explicitly.

pub mod cipher;
pub mod config;

pub use cipher::{padded_len, EncryptedFrame, FrameCipher, FrameEncryptor, BLOCK_SIZE};
pub use config::{CipherConfig, IV_LEN, KEY_LEN};
