// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Resolves the principal for every request under the protected router and
//! stores it in the request extensions, where the extractors in
//! `extractor.rs` pick it up.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::{AuthError, AuthService};

/// The bearer token from the `Authorization` header.
///
/// A missing header yields an empty token (guest policy applies). Only the
/// `Bearer ` prefix is removed; the rest is taken verbatim, whitespace
/// included, so it compares byte for byte against the internal secret.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok("");
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    Ok(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => {
            debug!(error = %e, "Rejecting request with unreadable Authorization header");
            return AuthError::Unauthorized.into_response();
        }
    };

    match auth.authenticate(&bearer).await {
        Ok(user) => {
            debug!(user = %user.user_name, kind = %user.kind, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(rejection) => {
            info!(method = %request.method(), path = %request.uri().path(), reason = %rejection, "Request rejected");
            rejection.into_response()
        }
    }
}
