//! Identity gateway configuration.

/// Shared secret between the identity gateway and the settlement server.
///
/// The gateway authenticates the user and signs `{user_id}.{timestamp}`
/// with this key; the server only verifies the signature.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    secret: Box<[u8]>,
}

impl IdentityConfig {
    pub fn new(secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Get the secret key bytes for HMAC verification.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}
