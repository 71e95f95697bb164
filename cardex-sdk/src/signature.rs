//! HMAC-SHA256 signatures used at the edges of the settlement server.
//!
//! The wire format for the signature header is:
//!
//! ```text
//! Cardex-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! Two signing schemes exist:
//!
//! * **Identity signing** (identity gateway → server):
//!   `HMAC-SHA256("{user_id}.{timestamp}", identity_secret)`, carried next to
//!   the `Cardex-User-Id` header.
//!
//! * **Body signing** (server → notification webhook):
//!   `HMAC-SHA256("{timestamp}.{json_body}", notification_secret)`

use uuid::Uuid;

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Cardex-Signature";

/// Header name carrying the authenticated user id (User API).
pub const USER_ID_HEADER: &str = "Cardex-User-Id";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Cardex-Admin-Authorization";

/// Header name carrying the acting admin's id, recorded for audit.
pub const ADMIN_ID_HEADER: &str = "Cardex-Admin-Id";

/// Maximum allowed age (and future skew) of a signature, in seconds.
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`].
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn hmac_sign(key: &[u8], data: &str) -> Box<[u8]> {
    let tag = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    tag.as_ref().to_owned().into_boxed_slice()
}

fn hmac_verify(key: &[u8], data: &str, signature: &[u8]) -> Result<(), SignatureError> {
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        signature,
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SignedObject - body signing
// ---------------------------------------------------------------------------

/// A signed body carrying its typed payload, timestamp, raw JSON, and
/// HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Serialize `body` and sign `"{timestamp}.{json}"` with `key`.
    pub fn new(body: T, key: &[u8]) -> Result<Self, serde_json::Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let json = serde_json::to_string(&body)?;
        let signature = hmac_sign(key, &format!("{now}.{json}"));
        Ok(Self {
            body,
            timestamp: now,
            json,
            signature,
        })
    }

    /// Reconstruct a [`SignedObject`] from a raw `Cardex-Signature` header
    /// value and the JSON body.
    ///
    /// This does **not** verify the HMAC; call [`verify`](Self::verify).
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Verify signature and freshness, returning the authenticated payload.
    pub fn verify(self, key: &[u8]) -> Result<T, SignatureError> {
        hmac_verify(
            key,
            &format!("{}.{}", self.timestamp, self.json),
            &self.signature,
        )?;
        check_timestamp(self.timestamp)?;
        Ok(self.body)
    }

    /// Format the full `Cardex-Signature` header value.
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

// ---------------------------------------------------------------------------
// Header parsing / formatting
// ---------------------------------------------------------------------------

/// Parse a `{timestamp}.{base64}` header value into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let (timestamp, encoded) = value.split_once('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded)
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Check that a signature timestamp is within [`MAX_SIGNATURE_AGE`] of now,
/// in either direction.
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Identity signing (User API)
// ---------------------------------------------------------------------------

/// Sign a user identity assertion: `HMAC-SHA256("{user_id}.{timestamp}", key)`.
///
/// Returns the formatted `Cardex-Signature` header value. Used by the
/// identity gateway and by tests.
pub fn sign_identity(user_id: Uuid, key: &[u8]) -> String {
    let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
    sign_identity_at(user_id, timestamp, key)
}

/// Same as [`sign_identity`] with an explicit timestamp.
pub fn sign_identity_at(user_id: Uuid, timestamp: i64, key: &[u8]) -> String {
    let signature = hmac_sign(key, &format!("{user_id}.{timestamp}"));
    format_signature_header(timestamp, &signature)
}

/// Verify an identity assertion produced by [`sign_identity`].
pub fn verify_identity(user_id: Uuid, header_value: &str, key: &[u8]) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_signature_header(header_value)?;
    hmac_verify(key, &format!("{user_id}.{timestamp}"), &signature)?;
    check_timestamp(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        value: u32,
    }

    impl Signature for Ping {}

    const KEY: &[u8] = b"gateway-secret";

    #[test]
    fn identity_round_trip() {
        let user = Uuid::now_v7();
        let header = sign_identity(user, KEY);
        verify_identity(user, &header, KEY).unwrap();
    }

    #[test]
    fn identity_bound_to_user() {
        let header = sign_identity(Uuid::now_v7(), KEY);
        let err = verify_identity(Uuid::now_v7(), &header, KEY).unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch));
    }

    #[test]
    fn identity_rejects_stale_and_future_timestamps() {
        let user = Uuid::now_v7();
        let now = time::OffsetDateTime::now_utc().unix_timestamp();

        let stale = sign_identity_at(user, now - MAX_SIGNATURE_AGE - 10, KEY);
        assert!(matches!(
            verify_identity(user, &stale, KEY),
            Err(SignatureError::Expired)
        ));

        let future = sign_identity_at(user, now + MAX_SIGNATURE_AGE + 10, KEY);
        assert!(matches!(
            verify_identity(user, &future, KEY),
            Err(SignatureError::Expired)
        ));
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            parse_signature_header("no-dot-here"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(matches!(
            parse_signature_header("abc.AAAA"),
            Err(SignatureError::InvalidFormat)
        ));
        assert!(matches!(
            parse_signature_header("1700000000.!!!"),
            Err(SignatureError::InvalidBase64)
        ));
    }

    #[test]
    fn signed_body_verifies_and_detects_tampering() {
        let signed = SignedObject::new(Ping { value: 7 }, KEY).unwrap();
        let header = signed.to_header();

        let parsed = SignedObject::<Ping>::from_header_and_body(&header, signed.json.clone()).unwrap();
        assert_eq!(parsed.verify(KEY).unwrap(), Ping { value: 7 });

        let tampered =
            SignedObject::<Ping>::from_header_and_body(&header, r#"{"value":8}"#.to_string())
                .unwrap();
        assert!(matches!(
            tampered.verify(KEY),
            Err(SignatureError::SignatureMismatch)
        ));
    }
}
