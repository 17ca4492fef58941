// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated principal.
//!
//! The principal is resolved once by `auth_middleware`; these extractors only
//! read it from the request extensions and apply per-handler policy.
//!
//! ```rust,ignore
//! async fn my_handler(UserOnly(user): UserOnly) -> impl IntoResponse {
//!     // user is an AuthenticatedUser, never a guest
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};

/// Any principal the middleware admitted, guests included.
pub struct Auth(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthorized)
    }
}

/// A principal that proved its identity. Guests are rejected with 401.
pub struct UserOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for UserOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.kind.is_authenticated() {
            return Err(AuthError::Unauthorized);
        }
        Ok(UserOnly(user))
    }
}

/// Only the internal service principal.
pub struct InternalOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for InternalOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.is_internal() {
            return Err(AuthError::InsufficientPermissions);
        }
        Ok(InternalOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(user: Option<AuthenticatedUser>) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        if let Some(user) = user {
            parts.extensions.insert(user);
        }
        parts
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser::in_house(crate::auth::claims::InHouseClaims {
            sub: "alice".to_string(),
            token_name: "ci".to_string(),
            iat: 0,
            exp: 0,
        })
    }

    #[tokio::test]
    async fn auth_requires_principal() {
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn auth_reads_extensions() {
        let mut parts = parts_with(Some(alice()));
        let Auth(user) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_name, "alice");
    }

    #[tokio::test]
    async fn user_only_rejects_guests() {
        let mut parts = parts_with(Some(AuthenticatedUser::guest()));
        assert!(Auth::from_request_parts(&mut parts, &()).await.is_ok());
        let result = UserOnly::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn internal_only_rejects_users() {
        let mut parts = parts_with(Some(alice()));
        let result = InternalOnly::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let mut parts = parts_with(Some(AuthenticatedUser::internal()));
        assert!(InternalOnly::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
