// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-house token issuance.
//!
//! Tokens are RS512-signed JWTs with claims `{sub, tokenName, iat, exp}`.
//! The SHA-256 of the signed string is stored so the verifier can check that
//! a presented token is still on record (revocation = deleting the record).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use tracing::error;

use super::claims::InHouseClaims;
use super::error::AuthError;
use super::keys::SigningKeyPair;
use crate::models::{IssuedToken, StoredToken, TokenHash};
use crate::platform::Clock;

/// Signing algorithm for in-house tokens.
pub const IN_HOUSE_ALGORITHM: Algorithm = Algorithm::RS512;

pub struct TokenIssuer {
    keys: Option<Arc<SigningKeyPair>>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// `keys` is `None` when no usable private key was configured; every
    /// issuance then fails.
    pub fn new(keys: Option<Arc<SigningKeyPair>>, clock: Arc<dyn Clock>) -> Self {
        Self { keys, clock }
    }

    pub fn can_sign(&self) -> bool {
        self.keys.is_some()
    }

    /// Sign a new token for `user_name`.
    pub fn issue(
        &self,
        token_name: &str,
        user_name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let keys = self.keys.as_ref().ok_or(AuthError::SigningKeyUnavailable)?;

        let created_at = self.clock.now();
        let claims = InHouseClaims {
            sub: user_name.to_string(),
            token_name: token_name.to_string(),
            iat: created_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token_string = encode(&Header::new(IN_HOUSE_ALGORITHM), &claims, &keys.encoding_key)
            .map_err(|e| {
                error!(error = %e, "Error generating token");
                AuthError::SigningError(e.to_string())
            })?;

        Ok(IssuedToken {
            record: StoredToken {
                token_name: token_name.to_string(),
                user_name: user_name.to_string(),
                created_at,
                expires_at,
                token_hash: TokenHash::of(&token_string),
            },
            token_string,
        })
    }
}
