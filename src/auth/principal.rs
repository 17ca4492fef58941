// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal kinds.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reserved user name of the internal service principal.
pub const INTERNAL_USER: &str = "__INTERNAL__";

/// Reserved user name of an unauthenticated guest.
pub const GUEST_USER: &str = "__GUEST__";

/// How the caller was authenticated.
///
/// - `User` - in-house token, checked against the token store
/// - `Federated` - OIDC token from the configured identity provider
/// - `Internal` - shared secret presented by trusted infrastructure
/// - `Guest` - no token, admitted only when guests are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Federated,
    Internal,
    Guest,
}

impl PrincipalKind {
    /// Whether this principal may issue or revoke tokens for other users.
    pub fn may_impersonate(&self) -> bool {
        matches!(self, PrincipalKind::Internal)
    }

    /// Whether this principal proved its identity.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, PrincipalKind::Guest)
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Federated => write!(f, "federated"),
            PrincipalKind::Internal => write!(f, "internal"),
            PrincipalKind::Guest => write!(f, "guest"),
        }
    }
}
