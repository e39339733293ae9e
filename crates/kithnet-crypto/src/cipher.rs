//! XChaCha20-Poly1305 frame encryption.
//!
//! Every message on the wire is encrypted with XChaCha20-Poly1305 AEAD
//! under a pre-shared 256-bit key. Each encryption uses a fresh 192-bit
//! (24-byte) nonce from OS entropy; the nonce is prepended to the
//! ciphertext so the blob is self-contained:
//!
//! ```text
//! [nonce 24B] [ciphertext + tag, variable]
//! ```
//!
//! Nonces **must never be reused** with the same key; the 192-bit space
//! makes accidental collision negligible.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use kithnet_types::{KithnetError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed byte length of an XChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 24;

/// Byte length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Minimum valid blob: nonce + tag (empty plaintext).
const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// FrameCipher
// ---------------------------------------------------------------------------

/// Symmetric cipher for wire frames.
///
/// Both sides of a connection hold the same 32-byte key, provisioned
/// out of band (the daemon reads or generates a key file). The cipher
/// treats payloads as opaque bytes; framing and JSON encoding happen
/// elsewhere.
///
/// The key is zeroized when the cipher is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FrameCipher {
    key: [u8; 32],
}

impl FrameCipher {
    /// Fixed byte length of the symmetric key.
    pub const KEY_LEN: usize = 32;

    /// Creates a cipher from a 256-bit key.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext+tag`.
    ///
    /// A fresh random nonce is generated for every call, so encrypting
    /// the same plaintext twice yields different blobs.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::CryptoError`] if the underlying AEAD
    /// encryption fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| KithnetError::CryptoError {
                reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
            })?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypts a `nonce || ciphertext+tag` blob.
    ///
    /// # Errors
    ///
    /// Returns [`KithnetError::CryptoError`] if the blob is too short
    /// to contain a nonce and tag, or if tag verification fails
    /// (wrong key, tampered ciphertext, corrupted nonce).
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < MIN_BLOB_LEN {
            return Err(KithnetError::CryptoError {
                reason: format!(
                    "ciphertext too short: {} bytes, need at least {MIN_BLOB_LEN}",
                    blob.len()
                ),
            });
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| KithnetError::CryptoError {
                reason: format!("XChaCha20-Poly1305 decryption failed: {e}"),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
