// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token persistence.
//!
//! [`TokenStore`] is the seam to the document store: the verifier only ever
//! calls [`TokenStore::exists`] (the revocation check), while the token API
//! uses the remaining operations. [`InMemoryTokenStore`] keeps records in a
//! map keyed by `(user_name, token_name)`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{StoredToken, TokenHash};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("token '{token_name}' already exists for user '{user_name}'")]
    AlreadyExists {
        user_name: String,
        token_name: String,
    },
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new record. Fails if `(user_name, token_name)` is taken.
    async fn insert(&self, token: StoredToken) -> Result<(), StoreError>;

    /// Revocation check: is there a live record with this owner and hash?
    async fn exists(&self, user_name: &str, token_hash: &TokenHash) -> bool;

    /// All records owned by `user_name`, ordered by creation time.
    async fn list(&self, user_name: &str) -> Vec<StoredToken>;

    /// Remove a record. Returns `false` if nothing matched.
    async fn delete(&self, user_name: &str, token_name: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<(String, String), StoredToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: StoredToken) -> Result<(), StoreError> {
        let key = (token.user_name.clone(), token.token_name.clone());
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                user_name: key.0,
                token_name: key.1,
            });
        }
        tokens.insert(key, token);
        Ok(())
    }

    async fn exists(&self, user_name: &str, token_hash: &TokenHash) -> bool {
        self.tokens
            .read()
            .await
            .values()
            .any(|t| t.user_name == user_name && &t.token_hash == token_hash)
    }

    async fn list(&self, user_name: &str) -> Vec<StoredToken> {
        let mut owned: Vec<StoredToken> = self
            .tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_name == user_name)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        owned
    }

    async fn delete(&self, user_name: &str, token_name: &str) -> bool {
        self.tokens
            .write()
            .await
            .remove(&(user_name.to_string(), token_name.to_string()))
            .is_some()
    }
}
