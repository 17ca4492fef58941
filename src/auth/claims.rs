// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::{PrincipalKind, GUEST_USER, INTERNAL_USER};

/// Claims of a token signed by this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InHouseClaims {
    /// Token owner
    pub sub: String,
    #[serde(rename = "tokenName")]
    pub token_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// `aud` is either a single string or an array of strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Claims of an identity-provider token after signature verification.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcClaims {
    pub sub: String,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Claims read before the signature is trusted, to pick a validation path.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UnverifiedClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
}

/// The principal resolved for a request.
///
/// Inserted into the request extensions by the auth middleware; handlers read
/// it back through the extractors in `extractor.rs`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Identity: the token's `sub`, or a reserved name for internal/guest callers
    pub user_name: String,

    pub kind: PrincipalKind,

    /// Token expiration (Unix timestamp), when the principal came from a token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl AuthenticatedUser {
    /// Holder of a valid in-house token.
    pub fn in_house(claims: InHouseClaims) -> Self {
        Self {
            user_name: claims.sub,
            kind: PrincipalKind::User,
            expires_at: Some(claims.exp),
        }
    }

    /// Holder of a valid identity-provider token.
    pub fn federated(claims: OidcClaims) -> Self {
        Self {
            user_name: claims.sub,
            kind: PrincipalKind::Federated,
            expires_at: Some(claims.exp),
        }
    }

    /// Trusted infrastructure that presented the shared internal secret.
    pub fn internal() -> Self {
        Self {
            user_name: INTERNAL_USER.to_string(),
            kind: PrincipalKind::Internal,
            expires_at: None,
        }
    }

    /// Unauthenticated caller, when the deployment admits guests.
    pub fn guest() -> Self {
        Self {
            user_name: GUEST_USER.to_string(),
            kind: PrincipalKind::Guest,
            expires_at: None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind == PrincipalKind::Internal
    }

    pub fn is_guest(&self) -> bool {
        self.kind == PrincipalKind::Guest
    }

    /// The user a token operation acts on.
    ///
    /// Only the internal principal may act on behalf of another user; for
    /// everyone else `requested` is ignored.
    pub fn acting_as<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(name) if self.kind.may_impersonate() && !name.is_empty() => name,
            _ => &self.user_name,
        }
    }
}
