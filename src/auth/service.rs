// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide authentication service: issuer, verifier and key resolver
//! assembled from configuration.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, warn};

use super::claims::AuthenticatedUser;
use super::issuer::TokenIssuer;
use super::jwks::OidcKeyResolver;
use super::keys::SigningKeyPair;
use super::verifier::{InHouseValidator, OidcValidator, Rejection, TokenValidator, TokenVerifier};
use crate::config::{AuthSettings, ConfigError};
use crate::platform::{Clock, HttpFetch};
use crate::store::TokenStore;

pub struct AuthService {
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    resolver: Option<Arc<OidcKeyResolver>>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    /// Assemble the service.
    ///
    /// A private key that fails to parse is logged and left out: issuance then
    /// fails and the in-house path rejects every token, but the process keeps
    /// serving OIDC and internal callers.
    pub fn from_settings(
        settings: &AuthSettings,
        store: Arc<dyn TokenStore>,
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let keys = load_signing_keys(settings.private_key_pem.as_deref());

        let resolver = settings.oidc.as_ref().map(|oidc| {
            let mut resolver = OidcKeyResolver::new(&oidc.issuer_url, http, clock.clone());
            if let Some(ttl) = oidc.discovery_ttl.and_then(|d| TimeDelta::from_std(d).ok()) {
                resolver = resolver.with_discovery_ttl(ttl);
            }
            Arc::new(resolver)
        });

        let mut validators: Vec<Box<dyn TokenValidator>> = Vec::with_capacity(2);
        if let (Some(resolver), Some(oidc)) = (&resolver, &settings.oidc) {
            validators.push(Box::new(OidcValidator::new(
                resolver.clone(),
                oidc.client_id.clone(),
            )));
        }
        validators.push(Box::new(InHouseValidator::new(keys.clone(), store)));

        let mut verifier = TokenVerifier::new(validators).allow_guests(settings.allow_guest);
        if let Some(secret) = &settings.internal_secret {
            verifier = verifier.with_internal_secret(secret.clone());
        }

        info!(
            paths = ?verifier.paths(),
            signing_key = keys.is_some(),
            internal_secret = settings.internal_secret.is_some(),
            allow_guest = settings.allow_guest,
            "Auth service configured"
        );

        Self {
            issuer: TokenIssuer::new(keys, clock.clone()),
            verifier,
            resolver,
            clock,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// `None` when no identity provider is configured.
    pub fn resolver(&self) -> Option<&Arc<OidcKeyResolver>> {
        self.resolver.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn authenticate(&self, bearer: &str) -> Result<AuthenticatedUser, Rejection> {
        self.verifier.authenticate(bearer).await
    }

    /// Load the identity provider's keys if none are held yet.
    pub async fn warm_up(&self) {
        let Some(resolver) = &self.resolver else {
            return;
        };
        if resolver.is_loaded().await {
            return;
        }
        resolver.refresh().await;
        if !resolver.is_loaded().await {
            warn!(issuer = %resolver.issuer_url(), "OIDC keys unavailable at startup; will retry on demand");
        }
    }
}

fn load_signing_keys(pem: Option<&str>) -> Option<Arc<SigningKeyPair>> {
    let pem = pem?;
    match SigningKeyPair::from_pem(pem) {
        Ok(keys) => Some(Arc::new(keys)),
        Err(e) => {
            error!(error = %ConfigError::PrivateKey(e.to_string()), "In-house tokens disabled");
            None
        }
    }
}
