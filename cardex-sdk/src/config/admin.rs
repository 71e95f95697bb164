//! Arbiter (admin) credentials.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Admin configuration holding the argon2 hash of the arbiter secret.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Returns `true` if the string already looks like an argon2 PHC hash.
    pub fn is_hashed(secret: &str) -> bool {
        secret.starts_with("$argon2")
    }

    /// Hash a plaintext secret with a fresh random salt.
    pub fn hash_secret(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    }

    /// Verify a plaintext secret against the stored hash.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
