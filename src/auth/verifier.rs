// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! ## Flow
//!
//! 1. Empty token: guest if the deployment allows guests, otherwise rejected.
//! 2. Token equal to the internal shared secret: internal principal, no
//!    cryptographic checks.
//! 3. Otherwise the header is parsed (signature not yet trusted) and each
//!    [`TokenValidator`] is tried in order, stopping at the first success.
//!    The default order is OIDC first, then in-house.
//!
//! A [`Rejection`] records why every path failed. It is for logs only: the
//! HTTP response is always a bare 401.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{decode, decode_header, Algorithm, Header, Validation};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::claims::{AuthenticatedUser, InHouseClaims, OidcClaims, UnverifiedClaims};
use super::error::AuthError;
use super::jwks::OidcKeyResolver;
use super::keys::SigningKeyPair;
use crate::models::TokenHash;
use crate::store::TokenStore;

pub const OIDC_PATH: &str = "oidc";
pub const IN_HOUSE_PATH: &str = "in-house";

/// No clock skew tolerance on `exp` or `nbf`.
const CLOCK_SKEW_LEEWAY: u64 = 0;

/// One way of establishing trust in a token.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Short name used in logs and in [`Rejection`].
    fn name(&self) -> &'static str;

    async fn validate(&self, token: &str, header: &Header) -> Result<AuthenticatedUser, AuthError>;
}

fn ensure_rsa(alg: Algorithm) -> Result<(), AuthError> {
    match alg {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => Ok(()),
        other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
    }
}

/// Tokens issued by the configured OIDC identity provider.
pub struct OidcValidator {
    resolver: Arc<OidcKeyResolver>,
    client_id: String,
}

impl OidcValidator {
    pub fn new(resolver: Arc<OidcKeyResolver>, client_id: impl Into<String>) -> Self {
        Self {
            resolver,
            client_id: client_id.into(),
        }
    }

    /// Reject on claims before any key lookup, so tokens that are clearly not
    /// ours to check never trigger a key-set fetch.
    fn check_unverified_claims(&self, token: &str) -> Result<(), AuthError> {
        let claims = jsonwebtoken::dangerous::insecure_decode::<UnverifiedClaims>(token)
            .map_err(|_| AuthError::MalformedToken)?
            .claims;

        if !claims.aud.is_some_and(|aud| aud.contains(&self.client_id)) {
            return Err(AuthError::ClaimsInvalid("audience mismatch".into()));
        }
        if claims.iss.as_deref() != Some(self.resolver.issuer_url()) {
            return Err(AuthError::ClaimsInvalid("issuer mismatch".into()));
        }
        if claims.sub.as_deref().is_none_or(str::is_empty) {
            return Err(AuthError::ClaimsInvalid("missing subject".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenValidator for OidcValidator {
    fn name(&self) -> &'static str {
        OIDC_PATH
    }

    async fn validate(&self, token: &str, header: &Header) -> Result<AuthenticatedUser, AuthError> {
        ensure_rsa(header.alg)?;
        self.check_unverified_claims(token)?;

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::ClaimsInvalid("missing key id".into()))?;
        let key = self.resolver.resolve_key(kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&[self.resolver.issuer_url()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        let data = decode::<OidcClaims>(token, &key.decoding_key, &validation)?;
        Ok(AuthenticatedUser::federated(data.claims))
    }
}

/// Tokens signed by this service, accepted only while still on record.
pub struct InHouseValidator {
    keys: Option<Arc<SigningKeyPair>>,
    store: Arc<dyn TokenStore>,
}

impl InHouseValidator {
    pub fn new(keys: Option<Arc<SigningKeyPair>>, store: Arc<dyn TokenStore>) -> Self {
        Self { keys, store }
    }
}

#[async_trait]
impl TokenValidator for InHouseValidator {
    fn name(&self) -> &'static str {
        IN_HOUSE_PATH
    }

    async fn validate(&self, token: &str, header: &Header) -> Result<AuthenticatedUser, AuthError> {
        let keys = self.keys.as_ref().ok_or(AuthError::SigningKeyUnavailable)?;
        ensure_rsa(header.alg)?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<InHouseClaims>(token, &keys.verification.decoding_key, &validation)?;

        if !self
            .store
            .exists(&data.claims.sub, &TokenHash::of(token))
            .await
        {
            return Err(AuthError::RevokedOrUnknown);
        }
        Ok(AuthenticatedUser::in_house(data.claims))
    }
}

/// Why a token was refused, per validation path.
#[derive(Debug, Default)]
pub struct Rejection {
    failures: Vec<(&'static str, AuthError)>,
}

impl Rejection {
    fn single(path: &'static str, error: AuthError) -> Self {
        Self {
            failures: vec![(path, error)],
        }
    }

    pub fn failures(&self) -> &[(&'static str, AuthError)] {
        &self.failures
    }

    /// The failure recorded for `path`, if that path was tried.
    pub fn reason(&self, path: &str) -> Option<&AuthError> {
        self.failures
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, error)| error)
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no credentials");
        }
        for (i, (path, error)) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{path}: {error}")?;
        }
        Ok(())
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        AuthError::Unauthorized.into_response()
    }
}

/// Per-request authentication entry point.
pub struct TokenVerifier {
    validators: Vec<Box<dyn TokenValidator>>,
    internal_secret: Option<String>,
    allow_guest: bool,
}

impl TokenVerifier {
    /// Validators are tried in the given order.
    pub fn new(validators: Vec<Box<dyn TokenValidator>>) -> Self {
        Self {
            validators,
            internal_secret: None,
            allow_guest: false,
        }
    }

    /// Accept `secret` as the internal service credential. Empty disables it.
    pub fn with_internal_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.internal_secret = (!secret.is_empty()).then_some(secret);
        self
    }

    /// Admit requests without a token as the guest principal.
    pub fn allow_guests(mut self, allow: bool) -> Self {
        self.allow_guest = allow;
        self
    }

    /// Validation path names, in the order they are tried.
    pub fn paths(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Resolve the principal for a bearer token (empty if none was sent).
    pub async fn authenticate(&self, bearer: &str) -> Result<AuthenticatedUser, Rejection> {
        if bearer.is_empty() {
            return if self.allow_guest {
                Ok(AuthenticatedUser::guest())
            } else {
                Err(Rejection::default())
            };
        }
        if self.is_internal_secret(bearer) {
            return Ok(AuthenticatedUser::internal());
        }
        self.verify(bearer).await
    }

    /// Cryptographic verification only, no guest or internal handling.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, Rejection> {
        let header = decode_header(token)
            .map_err(|_| Rejection::single("header", AuthError::MalformedToken))?;

        let mut rejection = Rejection::default();
        for validator in &self.validators {
            match validator.validate(token, &header).await {
                Ok(user) => return Ok(user),
                Err(error) => {
                    debug!(path = validator.name(), error = %error, "Token rejected by validation path");
                    rejection.failures.push((validator.name(), error));
                }
            }
        }
        Err(rejection)
    }

    fn is_internal_secret(&self, token: &str) -> bool {
        self.internal_secret
            .as_deref()
            .is_some_and(|secret| digests_match(secret, token))
    }
}

/// Compare fixed-size SHA-256 digests so timing depends on neither the
/// contents nor the length of the inputs.
fn digests_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected
        .iter()
        .zip(presented.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
