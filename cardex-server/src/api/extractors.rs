//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `UserAuth`: verifies the identity gateway's `Cardex-Signature` over the
//!   `Cardex-User-Id` header (User API).
//! - `AdminAuth`: verifies the plaintext `Cardex-Admin-Authorization` secret
//!   against the argon2 hash and reads the acting `Cardex-Admin-Id` (Admin API).
//!
//! Both resolve to an [`AuthorizationContext`] once per request. All
//! cryptographic operations are delegated to [`cardex_sdk::signature`].

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use cardex_core::engine::AuthorizationContext;
use cardex_sdk::objects::{ErrorKind, ErrorResponse};
use cardex_sdk::signature::{
    self, ADMIN_AUTH_HEADER, ADMIN_ID_HEADER, SIGNATURE_HEADER, SignatureError, USER_ID_HEADER,
};
use uuid::Uuid;

use crate::state::AppState;

/// Errors returned by the authentication extractors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),
    #[error("signature verification failed")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
    #[error("invalid admin secret")]
    InvalidSecret,
}

impl From<SignatureError> for AuthError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat | SignatureError::InvalidBase64 | SignatureError::Json(_) => {
                Self::InvalidHeader(SIGNATURE_HEADER)
            }
            SignatureError::SignatureMismatch => Self::SignatureMismatch,
            SignatureError::Expired => Self::Expired,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AuthError::InvalidHeader(_) => (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput),
            AuthError::MissingHeader(_)
            | AuthError::SignatureMismatch
            | AuthError::Expired
            | AuthError::InvalidSecret => (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
        };
        let body = ErrorResponse {
            error,
            message: self.to_string(),
            current_status: None,
        };
        (status, Json(body)).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, AuthError> {
    parts
        .headers
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(name))
}

fn uuid_header(parts: &Parts, name: &'static str) -> Result<Uuid, AuthError> {
    header(parts, name)?
        .parse()
        .map_err(|_| AuthError::InvalidHeader(name))
}

// ---------------------------------------------------------------------------
// UserAuth - User API authentication via identity gateway signature
// ---------------------------------------------------------------------------

/// An authenticated end user.
///
/// # Header format
///
/// ```text
/// Cardex-User-Id:   3f1c...-uuid
/// Cardex-Signature: {unix_timestamp}.{base64_signature}
/// ```
///
/// The signature is `HMAC-SHA256("{user_id}.{timestamp}", identity_secret)`.
pub struct UserAuth(pub AuthorizationContext);

impl FromRequestParts<AppState> for UserAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = uuid_header(parts, USER_ID_HEADER)?;
        let sig_value = header(parts, SIGNATURE_HEADER)?;

        let identity = state.config.identity.read().await;
        signature::verify_identity(user_id, sig_value, identity.secret_bytes())?;
        drop(identity);

        Ok(UserAuth(AuthorizationContext::user(user_id)))
    }
}

// ---------------------------------------------------------------------------
// AdminAuth - Admin API authentication via arbiter secret
// ---------------------------------------------------------------------------

/// An authenticated arbiter.
pub struct AdminAuth(pub AuthorizationContext);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = header(parts, ADMIN_AUTH_HEADER)?;
        let admin_id = uuid_header(parts, ADMIN_ID_HEADER)?;

        let admin = state.config.admin.read().await;
        let verified = admin.verify_secret(secret);
        drop(admin);

        if !verified {
            tracing::warn!(admin_id = %admin_id, "Rejected admin request with invalid secret");
            return Err(AuthError::InvalidSecret);
        }

        Ok(AdminAuth(AuthorizationContext::admin(admin_id)))
    }
}
