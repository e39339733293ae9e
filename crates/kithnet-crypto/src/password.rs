//! Argon2id password hashing and verification.
//!
//! Account passwords are hashed with Argon2id (memory-hard,
//! GPU-resistant) and stored as PHC strings, which embed the salt and
//! the tuning parameters. Verification therefore works across
//! parameter changes: old hashes verify with their recorded
//! parameters, new hashes pick up the current defaults.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use kithnet_types::{KithnetError, Result};

/// Hashes a password with Argon2id and a fresh random salt.
///
/// Returns the PHC string (e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`)
/// to be stored in the account record.
///
/// # Errors
///
/// Returns [`KithnetError::CryptoError`] if the underlying Argon2
/// computation fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| KithnetError::CryptoError {
            reason: format!("Argon2id hashing failed: {e}"),
        })?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash string.
///
/// A malformed stored hash verifies as `false` rather than erroring:
/// from the caller's perspective an unverifiable credential is a
/// failed credential, never a crash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("correct horse battery staple")?;
        assert!(verify_password("correct horse battery staple", &hash));
        Ok(())
    }

    #[test]
    fn wrong_password_fails() -> Result<()> {
        let hash = hash_password("password_a")?;
        assert!(!verify_password("password_b", &hash));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let a = hash_password("same password")?;
        let b = hash_password("same password")?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn hash_is_phc_format() -> Result<()> {
        let hash = hash_password("pw")?;
        assert!(hash.starts_with("$argon2id$"));
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        assert!(!verify_password("pw", "not a phc string"));
        assert!(!verify_password("pw", ""));
    }

    #[test]
    fn empty_password_roundtrip() -> Result<()> {
        let hash = hash_password("")?;
        assert!(verify_password("", &hash));
        assert!(!verify_password("x", &hash));
        Ok(())
    }
}
