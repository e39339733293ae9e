//! Shared-secret key file handling.
//!
//! Clients and server authenticate frames with one pre-shared 256-bit
//! key, stored hex-encoded in a key file. On first run the daemon
//! generates a key and persists it; thereafter the same file is
//! loaded. Distributing the file to clients is an operational concern
//! outside the daemon.

use std::path::Path;

use kithnet_crypto::cipher::FrameCipher;
use rand::rngs::OsRng;
use rand::RngCore;

/// Loads the key from `path`, or generates and persists a fresh one
/// if the file does not exist.
pub fn load_or_generate(path: &Path) -> Result<[u8; 32], String> {
    if path.exists() {
        let key = load(path)?;
        tracing::info!(path = %path.display(), "frame key loaded");
        return Ok(key);
    }

    let mut key = [0u8; FrameCipher::KEY_LEN];
    OsRng.fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create key directory: {e}"))?;
    }
    std::fs::write(path, hex::encode(key))
        .map_err(|e| format!("failed to write key file: {e}"))?;

    tracing::info!(path = %path.display(), "frame key generated and saved");
    Ok(key)
}

/// Loads and decodes an existing hex key file.
fn load(path: &Path) -> Result<[u8; 32], String> {
    let text =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read key file: {e}"))?;
    let bytes = hex::decode(text.trim())
        .map_err(|e| format!("key file is not valid hex: {e}"))?;

    if bytes.len() != FrameCipher::KEY_LEN {
        return Err(format!(
            "key file must hold {} bytes, got {}",
            FrameCipher::KEY_LEN,
            bytes.len()
        ));
    }

    let mut key = [0u8; FrameCipher::KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
