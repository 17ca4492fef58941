// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound I/O seams: HTTP fetching and wall-clock time.
//!
//! The OIDC key resolver and the token issuer never talk to `reqwest` or
//! `Utc::now()` directly. They receive these traits so tests can swap in a
//! scripted identity provider and a frozen clock.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};

/// Errors from outbound HTTP fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Minimal GET-only HTTP capability used for identity-provider calls.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url` and return the raw response body on a 2xx status.
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// `reqwest`-backed fetcher.
///
/// No request deadline is applied unless one is passed explicitly: a hanging
/// identity provider stalls the calling request for every attempt.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "relational-auth-server")
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}
