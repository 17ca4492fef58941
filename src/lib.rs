// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Auth Server - token issuance and verification
//!
//! Issues long-lived RS512 personal access tokens and authenticates bearer
//! tokens either against this service's own key (plus a revocation lookup)
//! or against the keys published by an OIDC identity provider.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuance, verification and the OIDC key resolver
//! - `cache` - Generic expiring cache
//! - `platform` - HTTP fetch and clock seams
//! - `store` - Token records and the revocation check

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod platform;
pub mod state;
pub mod store;
