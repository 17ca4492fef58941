// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Verification failures are collected per validation path for logging. The
/// HTTP layer only ever answers with [`AuthError::Unauthorized`] so callers
/// cannot tell which check failed.
#[derive(Debug)]
pub enum AuthError {
    /// Authorization header is not valid UTF-8
    InvalidAuthHeader,
    /// Token is not a well-formed compact JWS
    MalformedToken,
    /// Token declares a non-RSA signing algorithm
    UnsupportedAlgorithm(String),
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Wrong audience or issuer, or a required claim is missing
    ClaimsInvalid(String),
    /// Key id absent from the identity provider's key set after retries
    KeyNotFound(String),
    /// In-house token hash not found in the token store
    RevokedOrUnknown,
    /// In-house signing key was not loaded
    SigningKeyUnavailable,
    /// Token signing failed
    SigningError(String),
    /// Both validation paths rejected the token (or no token was given)
    Unauthorized,
    /// Insufficient permissions
    InsufficientPermissions,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::ClaimsInvalid(_) => "claims_invalid",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::RevokedOrUnknown => "revoked_or_unknown",
            AuthError::SigningKeyUnavailable => "signing_key_unavailable",
            AuthError::SigningError(_) => "signing_error",
            AuthError::Unauthorized => "unauthorized",
            AuthError::InsufficientPermissions => "insufficient_permissions",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::ClaimsInvalid(_)
            | AuthError::KeyNotFound(_)
            | AuthError::RevokedOrUnknown
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::SigningKeyUnavailable | AuthError::SigningError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidAuthHeader => write!(f, "Authorization header is not valid text"),
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::UnsupportedAlgorithm(alg) => {
                write!(f, "Unexpected signing method: {alg}")
            }
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::ClaimsInvalid(msg) => write!(f, "Invalid claims: {msg}"),
            AuthError::KeyNotFound(kid) => write!(f, "Public key with kid = {kid} not found"),
            AuthError::RevokedOrUnknown => write!(f, "Token is revoked or unknown"),
            AuthError::SigningKeyUnavailable => write!(f, "JWT private key is not configured"),
            AuthError::SigningError(msg) => write!(f, "Error generating token: {msg}"),
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer => AuthError::ClaimsInvalid("issuer mismatch".into()),
            ErrorKind::InvalidAudience => AuthError::ClaimsInvalid("audience mismatch".into()),
            ErrorKind::InvalidSubject => AuthError::ClaimsInvalid("subject mismatch".into()),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::ClaimsInvalid(format!("missing required claim '{claim}'"))
            }
            ErrorKind::Json(err) => AuthError::ClaimsInvalid(err.to_string()),
            ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm("mismatch".into()),
            _ => AuthError::MalformedToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn unauthorized_returns_401_without_detail() {
        let response = AuthError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "unauthorized");
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn insufficient_permissions_returns_403() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn verification_failures_are_401() {
        for err in [
            AuthError::InvalidSignature,
            AuthError::TokenExpired,
            AuthError::RevokedOrUnknown,
            AuthError::KeyNotFound("k1".into()),
            AuthError::ClaimsInvalid("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            AuthError::SigningKeyUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn jwt_errors_map_to_taxonomy() {
        use jsonwebtoken::errors::ErrorKind;

        let expired: jsonwebtoken::errors::Error = ErrorKind::ExpiredSignature.into();
        assert!(matches!(AuthError::from(expired), AuthError::TokenExpired));

        let bad_sig: jsonwebtoken::errors::Error = ErrorKind::InvalidSignature.into();
        assert!(matches!(AuthError::from(bad_sig), AuthError::InvalidSignature));

        let missing: jsonwebtoken::errors::Error =
            ErrorKind::MissingRequiredClaim("sub".into()).into();
        assert!(matches!(AuthError::from(missing), AuthError::ClaimsInvalid(_)));
    }
}
