// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OIDC key resolution: discovery, JWKS fetching and the key-id cache.
//!
//! ## Refresh semantics
//!
//! - The discovery document is cached until an explicit [`OidcKeyResolver::refresh`]
//!   (or until the optional TTL lapses).
//! - Each key-set fetch builds a brand-new `kid → key` map off to the side and
//!   swaps it in whole. Keys missing from the new set stop being trusted at
//!   once. Readers hold an `Arc` to either the old or the new map.
//! - A failed fetch leaves the previous map in place.
//!
//! ## Lookup retries
//!
//! [`OidcKeyResolver::resolve_key`] makes [`MAX_KEY_LOOKUPS`] lookups and
//! reloads the key set between them, with no backoff. Concurrent misses are
//! not de-duplicated; each missing lookup re-fetches the whole set.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::discovery::{discovery_url, DiscoveryDocument};
use super::error::AuthError;
use super::keys::VerificationKey;
use crate::cache::{ExpiringCache, Fresh};
use crate::platform::{Clock, FetchError, HttpFetch};

/// Total lookups made by `resolve_key` for one key id.
pub const MAX_KEY_LOOKUPS: usize = 3;

/// Trusted identity-provider keys by key id.
pub type KeyMap = HashMap<String, VerificationKey>;

/// One entry of a published JSON Web Key Set.
#[derive(Debug, Deserialize)]
struct JsonWebKey {
    #[serde(default)]
    kty: String,
    #[serde(default)]
    kid: String,
    #[serde(default, rename = "use")]
    key_use: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Debug, Deserialize)]
struct JsonWebKeySet {
    #[serde(default)]
    keys: Vec<JsonWebKey>,
}

/// Why a key-set reload did not happen.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error("invalid {what}: {message}")]
    Parse { what: &'static str, message: String },
    #[error("identity provider published no keys")]
    EmptyKeySet,
}

/// Resolves identity-provider signing keys by key id.
pub struct OidcKeyResolver {
    issuer_url: String,
    http: Arc<dyn HttpFetch>,
    clock: Arc<dyn Clock>,
    discovery: ExpiringCache<DiscoveryDocument>,
    discovery_ttl: Option<TimeDelta>,
    keys: RwLock<Arc<KeyMap>>,
}

impl OidcKeyResolver {
    pub fn new(
        issuer_url: impl Into<String>,
        http: Arc<dyn HttpFetch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            http,
            discovery: ExpiringCache::new(clock.clone()),
            clock,
            discovery_ttl: None,
            keys: RwLock::new(Arc::new(KeyMap::new())),
        }
    }

    /// Re-read the discovery document after `ttl` instead of only on explicit refresh.
    pub fn with_discovery_ttl(mut self, ttl: TimeDelta) -> Self {
        self.discovery_ttl = Some(ttl);
        self
    }

    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Re-read the discovery document and the key set.
    ///
    /// Failures are logged and swallowed; the previous keys stay in use.
    pub async fn refresh(&self) {
        if let Err(e) = self.try_refresh().await {
            warn!(issuer = %self.issuer_url, error = %e, "OIDC refresh failed, keeping previous keys");
        }
    }

    /// Like [`refresh`](Self::refresh) but reports the outcome.
    pub async fn try_refresh(&self) -> Result<usize, RefreshError> {
        self.discovery.invalidate().await;
        self.reload_keys().await
    }

    /// Look up `kid`, reloading the key set between attempts.
    pub async fn resolve_key(&self, kid: &str) -> Result<VerificationKey, AuthError> {
        for attempt in 1..=MAX_KEY_LOOKUPS {
            if let Some(key) = self.keys.read().await.get(kid) {
                return Ok(key.clone());
            }
            if attempt < MAX_KEY_LOOKUPS {
                debug!(kid, attempt, "Key id not cached, reloading OIDC key set");
                if let Err(e) = self.reload_keys().await {
                    warn!(issuer = %self.issuer_url, error = %e, "OIDC key reload failed");
                }
            }
        }
        Err(AuthError::KeyNotFound(kid.to_string()))
    }

    /// The current key map. Never a partially updated one.
    pub async fn snapshot(&self) -> Arc<KeyMap> {
        self.keys.read().await.clone()
    }

    /// Sorted key ids currently trusted.
    pub async fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshot().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn is_loaded(&self) -> bool {
        !self.keys.read().await.is_empty()
    }

    async fn reload_keys(&self) -> Result<usize, RefreshError> {
        let discovery = self.discovery_document().await?;

        let body = self.http.get(&discovery.jwks_uri).await?;
        let key_set: JsonWebKeySet =
            serde_json::from_slice(&body).map_err(|e| RefreshError::Parse {
                what: "JWKS",
                message: e.to_string(),
            })?;

        if key_set.keys.is_empty() {
            return Err(RefreshError::EmptyKeySet);
        }

        let mut fresh = KeyMap::new();
        for jwk in key_set
            .keys
            .iter()
            .filter(|k| k.key_use == "sig" && k.kty == "RSA")
        {
            match VerificationKey::from_jwk_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    fresh.insert(jwk.kid.clone(), key);
                }
                Err(e) => warn!(kid = %jwk.kid, error = %e, "Skipping unusable JWK"),
            }
        }

        let count = fresh.len();
        *self.keys.write().await = Arc::new(fresh);
        info!(issuer = %self.issuer_url, keys = count, "Refreshed OIDC keys");
        Ok(count)
    }

    async fn discovery_document(&self) -> Result<DiscoveryDocument, RefreshError> {
        self.discovery
            .get(|| self.fetch_discovery())
            .await
            .map_err(|stale| stale.error)
    }

    async fn fetch_discovery(&self) -> Result<Fresh<DiscoveryDocument>, RefreshError> {
        let body = self.http.get(&discovery_url(&self.issuer_url)).await?;
        let doc: DiscoveryDocument =
            serde_json::from_slice(&body).map_err(|e| RefreshError::Parse {
                what: "discovery document",
                message: e.to_string(),
            })?;
        Ok(match self.discovery_ttl {
            Some(ttl) => Fresh::until(doc, self.expiry_after(ttl)),
            None => Fresh::indefinitely(doc),
        })
    }

    fn expiry_after(&self, ttl: TimeDelta) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::auth::keys::tests::{modulus_b64, IN_HOUSE_PEM, PROVIDER_PEM};
    use crate::cache::tests::ManualClock;
    use crate::platform::SystemClock;

    pub(crate) const ISSUER: &str = "https://idp.example.com";

    /// Scripted identity provider. Key-set responses rotate through `key_sets`.
    pub(crate) struct FakeProvider {
        key_sets: Mutex<Vec<Result<String, u16>>>,
        pub(crate) discovery_calls: AtomicUsize,
        pub(crate) jwks_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub(crate) fn serving(body: String) -> Self {
            Self {
                key_sets: Mutex::new(vec![Ok(body)]),
                discovery_calls: AtomicUsize::new(0),
                jwks_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn serve(&self, body: String) {
            *self.key_sets.lock().unwrap() = vec![Ok(body)];
        }

        pub(crate) fn fail_with(&self, status: u16) {
            *self.key_sets.lock().unwrap() = vec![Err(status)];
        }

        pub(crate) fn rotate(&self, bodies: Vec<String>) {
            *self.key_sets.lock().unwrap() = bodies.into_iter().map(Ok).collect();
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.discovery_calls.load(Ordering::SeqCst) + self.jwks_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpFetch for FakeProvider {
        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            if url == discovery_url(ISSUER) {
                self.discovery_calls.fetch_add(1, Ordering::SeqCst);
                let doc = json!({ "issuer": ISSUER, "jwks_uri": format!("{ISSUER}/keys") });
                return Ok(doc.to_string().into_bytes());
            }
            if url == format!("{ISSUER}/keys") {
                let call = self.jwks_calls.fetch_add(1, Ordering::SeqCst);
                let sets = self.key_sets.lock().unwrap();
                return match &sets[call % sets.len()] {
                    Ok(body) => Ok(body.clone().into_bytes()),
                    Err(status) => Err(FetchError::Status {
                        url: url.to_string(),
                        status: *status,
                    }),
                };
            }
            Err(FetchError::Network {
                url: url.to_string(),
                message: "no route".to_string(),
            })
        }
    }

    pub(crate) fn rsa_jwk(kid: &str, pem_text: &str) -> Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": modulus_b64(pem_text),
            "e": "AQAB"
        })
    }

    pub(crate) fn key_set(keys: Vec<Value>) -> String {
        json!({ "keys": keys }).to_string()
    }

    fn resolver(provider: &Arc<FakeProvider>) -> OidcKeyResolver {
        OidcKeyResolver::new(ISSUER, provider.clone(), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn refresh_keeps_only_rsa_signing_keys() {
        let mut enc = rsa_jwk("enc-1", PROVIDER_PEM);
        enc["use"] = json!("enc");
        let ec = json!({ "kty": "EC", "kid": "ec-1", "use": "sig", "crv": "P-256", "x": "a", "y": "b" });
        let provider = Arc::new(FakeProvider::serving(key_set(vec![
            rsa_jwk("sig-1", PROVIDER_PEM),
            enc,
            ec,
        ])));
        let resolver = resolver(&provider);

        assert_eq!(resolver.try_refresh().await.unwrap(), 1);
        assert_eq!(resolver.key_ids().await, vec!["sig-1".to_string()]);
    }

    #[tokio::test]
    async fn refresh_replaces_the_whole_map() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![
            rsa_jwk("old", PROVIDER_PEM),
            rsa_jwk("kept", PROVIDER_PEM),
        ])));
        let resolver = resolver(&provider);
        resolver.refresh().await;

        provider.serve(key_set(vec![
            rsa_jwk("kept", PROVIDER_PEM),
            rsa_jwk("new", IN_HOUSE_PEM),
        ]));
        resolver.refresh().await;

        assert_eq!(
            resolver.key_ids().await,
            vec!["kept".to_string(), "new".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_keys() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let resolver = resolver(&provider);
        resolver.refresh().await;

        provider.fail_with(503);
        assert!(matches!(
            resolver.try_refresh().await,
            Err(RefreshError::Network(_))
        ));

        provider.serve("{not json".to_string());
        assert!(matches!(
            resolver.try_refresh().await,
            Err(RefreshError::Parse { .. })
        ));

        provider.serve(key_set(vec![]));
        assert!(matches!(
            resolver.try_refresh().await,
            Err(RefreshError::EmptyKeySet)
        ));

        assert_eq!(resolver.key_ids().await, vec!["k1".to_string()]);
    }

    #[tokio::test]
    async fn resolve_key_loads_lazily() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let resolver = resolver(&provider);
        assert!(!resolver.is_loaded().await);

        assert!(resolver.resolve_key("k1").await.is_ok());
        assert_eq!(provider.discovery_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.jwks_calls.load(Ordering::SeqCst), 1);

        // Cached now: no further traffic.
        assert!(resolver.resolve_key("k1").await.is_ok());
        assert_eq!(provider.total_calls(), 2);
    }

    #[tokio::test]
    async fn resolve_key_picks_up_rotated_key() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let resolver = resolver(&provider);
        resolver.refresh().await;

        provider.serve(key_set(vec![rsa_jwk("k2", PROVIDER_PEM)]));
        assert!(resolver.resolve_key("k2").await.is_ok());
        assert!(!resolver.snapshot().await.contains_key("k1"));
    }

    #[tokio::test]
    async fn missing_key_is_looked_up_three_times_with_two_fetches() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let resolver = resolver(&provider);
        resolver.refresh().await;
        let before = provider.total_calls();

        let err = resolver.resolve_key("never-published").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound(ref kid) if kid == "never-published"));

        // Discovery stays cached; only the key set is re-fetched, once per reload.
        assert_eq!(provider.total_calls() - before, 2);
        assert_eq!(provider.discovery_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_refresh_rereads_discovery() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let resolver = resolver(&provider);
        resolver.refresh().await;
        resolver.refresh().await;
        assert_eq!(provider.discovery_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn discovery_ttl_expires() {
        let provider = Arc::new(FakeProvider::serving(key_set(vec![rsa_jwk(
            "k1",
            PROVIDER_PEM,
        )])));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let resolver = OidcKeyResolver::new(ISSUER, provider.clone(), clock.clone())
            .with_discovery_ttl(TimeDelta::minutes(10));

        let _ = resolver.resolve_key("missing").await;
        assert_eq!(provider.discovery_calls.load(Ordering::SeqCst), 1);

        clock.advance(TimeDelta::minutes(11));
        let _ = resolver.resolve_key("missing").await;
        assert_eq!(provider.discovery_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_key_set() {
        let set_a = vec!["a1", "a2"];
        let set_b = vec!["b1", "b2", "b3"];
        let body = |kids: &[&str]| key_set(kids.iter().map(|k| rsa_jwk(k, PROVIDER_PEM)).collect());

        let provider = Arc::new(FakeProvider::serving(body(&set_a[..])));
        let resolver = Arc::new(resolver(&provider));
        resolver.refresh().await;
        provider.rotate(vec![body(&set_b[..]), body(&set_a[..])]);

        let expected_a: BTreeSet<String> = set_a.iter().map(|s| s.to_string()).collect();
        let expected_b: BTreeSet<String> = set_b.iter().map(|s| s.to_string()).collect();

        let writer = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    resolver.refresh().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let resolver = resolver.clone();
            let (a, b) = (expected_a.clone(), expected_b.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let seen: BTreeSet<String> = resolver.snapshot().await.keys().cloned().collect();
                    assert!(seen == a || seen == b, "partial key set observed: {seen:?}");
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
