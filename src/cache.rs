// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-value cache with an expiry timestamp and lazy refresh.
//!
//! The cache holds at most one value. Reading it while it is invalid runs the
//! caller-supplied update routine first. The update runs outside any lock (it
//! usually performs network I/O); only the swap of the new value takes the
//! write lock, so readers never wait on a slow refresh and never observe a
//! half-written entry.
//!
//! An entry is valid iff its expiry is set and strictly in the future. An
//! entry without expiry is always invalid and forces a refresh on access.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::platform::Clock;

/// Value produced by an update routine, together with its expiry.
#[derive(Debug, Clone)]
pub struct Fresh<T> {
    pub value: T,
    pub expires_at: Option<DateTime<Utc>>,
}

impl<T> Fresh<T> {
    /// Valid until `expires_at`.
    pub fn until(value: T, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// Valid until explicitly invalidated.
    pub fn indefinitely(value: T) -> Self {
        Self::until(value, DateTime::<Utc>::MAX_UTC)
    }
}

/// A failed refresh: the previous value (if any) plus the update error.
///
/// The caller decides whether stale data is acceptable.
#[derive(Debug)]
pub struct StaleRead<T, E> {
    pub stale: Option<T>,
    pub error: E,
}

struct CacheEntry<T> {
    value: T,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at > now)
    }
}

/// Expiring single-value cache.
pub struct ExpiringCache<T> {
    slot: RwLock<Option<CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> ExpiringCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            clock,
        }
    }

    /// Whether a value is present and not yet expired.
    pub async fn is_valid(&self) -> bool {
        let now = self.clock.now();
        self.slot
            .read()
            .await
            .as_ref()
            .is_some_and(|entry| entry.is_valid(now))
    }

    /// Return the cached value, running `update` first if the cache is invalid.
    ///
    /// On update failure the previous value is returned alongside the error and
    /// the stored entry is left untouched.
    pub async fn get<F, Fut, E>(&self, update: F) -> Result<T, StaleRead<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Fresh<T>, E>>,
    {
        {
            let now = self.clock.now();
            let slot = self.slot.read().await;
            if let Some(entry) = slot.as_ref().filter(|entry| entry.is_valid(now)) {
                return Ok(entry.value.clone());
            }
        }

        match update().await {
            Ok(fresh) => {
                let value = fresh.value.clone();
                *self.slot.write().await = Some(CacheEntry {
                    value: fresh.value,
                    expires_at: fresh.expires_at,
                });
                Ok(value)
            }
            Err(error) => {
                let stale = self.slot.read().await.as_ref().map(|e| e.value.clone());
                Err(StaleRead { stale, error })
            }
        }
    }

    /// Clear the expiry so the next `get` refreshes. The value is kept as the
    /// stale fallback.
    pub async fn invalidate(&self) {
        if let Some(entry) = self.slot.write().await.as_mut() {
            entry.expires_at = None;
        }
    }
}
