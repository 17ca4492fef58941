// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthService;
use crate::store::TokenStore;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub store: Arc<dyn TokenStore>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, store: Arc<dyn TokenStore>) -> Self {
        Self { auth, store }
    }
}
