use argon2::{
    Argon2,
    password_hash::{self, PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

/// A plaintext password as received from a client. Never stored.
#[derive(Clone, Eq, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

/// Argon2 PHC string for a [`Password`].
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl Password {
    #[must_use]
    pub fn new(password: String) -> Self {
        Self(password)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hash(&self) -> Result<PasswordHash, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let phc = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(PasswordHash(phc.to_string()))
    }
}

impl PasswordHash {
    /// Wraps a PHC string read back from the store.
    #[must_use]
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }

    /// A stored hash that cannot be parsed never verifies.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        let Ok(parsed) = PhcString::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.0.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}
