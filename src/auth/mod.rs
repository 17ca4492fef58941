// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Issues long-lived in-house tokens and verifies inbound bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. `auth_middleware` resolves the principal:
//!    - no token: guest, if the deployment allows it
//!    - the internal shared secret: internal principal
//!    - an OIDC token: signature checked against the identity provider's
//!      key set (fetched via discovery, refreshed when a `kid` is unknown)
//!    - otherwise an in-house token: signature checked against our own key,
//!      then its SHA-256 must still be on record in the token store
//! 3. Handlers read the principal through the extractors
//!
//! ## Security
//!
//! - Only RSA-family algorithms are accepted on either path
//! - No clock skew tolerance on `exp`
//! - Rejections never say which check failed; reasons are logged only
//! - The internal secret and token strings are never logged

pub mod claims;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod issuer;
pub mod jwks;
pub mod keys;
pub mod middleware;
pub mod principal;
pub mod service;
pub mod verifier;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, InternalOnly, UserOnly};
pub use jwks::OidcKeyResolver;
pub use middleware::auth_middleware;
pub use principal::PrincipalKind;
pub use service::AuthService;
