//! Password hashing and verification using Argon2id.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AuthError;

/// Argon2id hasher with an optional server-side pepper.
///
/// The pepper is prepended to the password before hashing and verification.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    pepper: Option<String>,
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("peppered", &self.pepper.is_some())
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    fn input(&self, password: &str) -> Vec<u8> {
        match &self.pepper {
            Some(p) => format!("{p}{password}").into_bytes(),
            None => password.as_bytes().to_vec(),
        }
    }

    /// Hash a password, returning the PHC-formatted string (salt and params included).
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(&self.input(password), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Crypto(format!("failed to hash password: {e}")))
    }

    /// `Ok(false)` on mismatch; `Err` only if the stored hash is malformed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(&self.input(password), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
        }
    }

    /// Burn one verification's worth of work against a throwaway hash.
    ///
    /// Used on the unknown-email login path so it costs the same as a wrong
    /// password.
    pub fn verify_dummy(&self, password: &str) {
        static DUMMY: OnceLock<Option<String>> = OnceLock::new();
        let dummy = DUMMY.get_or_init(|| PasswordHasher::default().hash("vocalyx-dummy-password").ok());
        if let Some(hash) = dummy {
            let _ = self.verify(password, hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = PasswordHasher::default();
        let hash = hasher.hash("correct-horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct-horse", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn same_password_different_salts() {
        let hasher = PasswordHasher::default();
        assert_ne!(hasher.hash("temp123").unwrap(), hasher.hash("temp123").unwrap());
    }

    #[test]
    fn pepper_must_match() {
        let peppered = PasswordHasher::new(Some("pepper!".into()));
        let hash = peppered.hash("hunter2").unwrap();

        assert!(peppered.verify("hunter2", &hash).unwrap());
        assert!(!PasswordHasher::default().verify("hunter2", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(PasswordHasher::default().verify("x", "not-a-hash").is_err());
    }
}
