// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identity and key management endpoints.

use axum::{extract::State, Json};
use tracing::{info, warn};

use crate::{
    auth::{Auth, AuthenticatedUser, InternalOnly},
    error::ApiError,
    models::KeyRefreshResponse,
    state::AppState,
};

/// The principal resolved for this request.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Session",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current principal", body = AuthenticatedUser),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(Auth(user): Auth) -> Json<AuthenticatedUser> {
    Json(user)
}

/// Re-read the identity provider's discovery document and key set.
///
/// Internal principal only. On failure the previously trusted keys stay in
/// place.
#[utoipa::path(
    post,
    path = "/v1/auth/keys/refresh",
    tag = "Session",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Keys refreshed", body = KeyRefreshResponse),
        (status = 400, description = "No identity provider configured"),
        (status = 403, description = "Caller is not the internal principal"),
        (status = 502, description = "Identity provider unreachable or returned garbage")
    )
)]
pub async fn refresh_keys(
    State(state): State<AppState>,
    InternalOnly(_caller): InternalOnly,
) -> Result<Json<KeyRefreshResponse>, ApiError> {
    let resolver = state
        .auth
        .resolver()
        .ok_or_else(|| ApiError::bad_request("OIDC is not configured"))?;

    let keys = resolver.try_refresh().await.map_err(|e| {
        warn!(issuer = %resolver.issuer_url(), error = %e, "Manual OIDC key refresh failed");
        ApiError::bad_gateway(e.to_string())
    })?;
    info!(keys, "Manual OIDC key refresh completed");

    Ok(Json(KeyRefreshResponse {
        keys,
        key_ids: resolver.key_ids().await,
    }))
}
