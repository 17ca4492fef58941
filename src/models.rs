// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token Data Models
//!
//! ## Persistence vs. presentation
//!
//! - [`StoredToken`] is what the token store keeps. It never contains the
//!   signed token string, only its SHA-256 [`TokenHash`].
//! - [`IssuedToken`] is what the issuer returns: the record plus the signed
//!   string, which is shown to the caller exactly once.
//! - [`TokenResponse`] and the request types are the REST API shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

// =============================================================================
// Token Hash
// =============================================================================

/// SHA-256 digest of a signed token string, used for revocation lookups.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHash(pub [u8; 32]);

impl TokenHash {
    /// Hash the raw signed token string exactly as presented.
    pub fn of(token: &str) -> Self {
        TokenHash(Sha256::digest(token.as_bytes()).into())
    }
}

impl std::fmt::Display for TokenHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenHash({self})")
    }
}

// =============================================================================
// Token Records
// =============================================================================

/// Persisted token record, unique per `(user_name, token_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token_name: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_hash: TokenHash,
}

/// Freshly signed token. `token_string` is never persisted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub record: StoredToken,
    pub token_string: String,
}

// =============================================================================
// API Types
// =============================================================================

/// Long-lived personal access token as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token_name: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Signed token. Only present in the creation response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<StoredToken> for TokenResponse {
    fn from(record: StoredToken) -> Self {
        Self {
            token_name: record.token_name,
            user_name: record.user_name,
            created_at: record.created_at,
            expires_at: record.expires_at,
            token: None,
        }
    }
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: Some(issued.token_string),
            ..TokenResponse::from(issued.record)
        }
    }
}

/// Request body for creating a token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub token_name: String,
    pub expires_at: DateTime<Utc>,
    /// Only honoured when the caller is the internal service principal.
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Result of a manual OIDC key refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyRefreshResponse {
    /// Number of signing keys now trusted.
    pub keys: usize,
    /// Key ids now trusted, sorted.
    pub key_ids: Vec<String>,
}
