// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Personal access token endpoints.
//!
//! Every operation acts on the caller's own tokens. The internal service
//! principal may name another user through `userName`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    auth::UserOnly,
    error::ApiError,
    models::{CreateTokenRequest, TokenResponse},
    state::AppState,
};

/// Longest accepted `tokenName` or `userName`, in characters.
pub const MAX_INPUT_LENGTH: usize = 10_000;

fn check_length(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() > MAX_INPUT_LENGTH {
        return Err(ApiError::bad_request(format!(
            "{field} must be at most {MAX_INPUT_LENGTH} characters"
        )));
    }
    Ok(())
}

fn check_user_name(user_name: Option<&str>) -> Result<(), ApiError> {
    user_name.map_or(Ok(()), |name| check_length("userName", name))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ActingAsQuery {
    /// Owner to act on. Ignored unless the caller is the internal principal.
    pub user_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/v1/tokens",
    request_body = CreateTokenRequest,
    tag = "Tokens",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Token created; `token` is only returned here", body = TokenResponse),
        (status = 400, description = "Empty or oversized name, or expiry in the past"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A token with the same name already exists")
    )
)]
pub async fn create_token(
    State(state): State<AppState>,
    UserOnly(user): UserOnly,
    Json(request): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let token_name = request.token_name.trim();
    if token_name.is_empty() {
        return Err(ApiError::bad_request("tokenName must not be empty"));
    }
    check_length("tokenName", token_name)?;
    check_user_name(request.user_name.as_deref())?;
    if request.expires_at <= state.auth.now() {
        return Err(ApiError::bad_request("expiresAt must be in the future"));
    }

    let owner = user.acting_as(request.user_name.as_deref());
    let issued = state
        .auth
        .issuer()
        .issue(token_name, owner, request.expires_at)?;
    state.store.insert(issued.record.clone()).await?;

    info!(user = %owner, token_name, caller = %user.user_name, "Token issued");
    Ok((StatusCode::CREATED, Json(issued.into())))
}

#[utoipa::path(
    get,
    path = "/v1/tokens",
    params(ActingAsQuery),
    tag = "Tokens",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [TokenResponse]),
        (status = 400, description = "Oversized userName"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_tokens(
    State(state): State<AppState>,
    UserOnly(user): UserOnly,
    Query(query): Query<ActingAsQuery>,
) -> Result<Json<Vec<TokenResponse>>, ApiError> {
    check_user_name(query.user_name.as_deref())?;
    let owner = user.acting_as(query.user_name.as_deref());
    let tokens = state.store.list(owner).await;
    Ok(Json(tokens.into_iter().map(TokenResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/v1/tokens/{tokenName}",
    params(
        ("tokenName" = String, Path, description = "Name of the token to revoke"),
        ActingAsQuery
    ),
    tag = "Tokens",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 400, description = "Oversized tokenName or userName"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such token")
    )
)]
pub async fn delete_token(
    State(state): State<AppState>,
    UserOnly(user): UserOnly,
    Path(token_name): Path<String>,
    Query(query): Query<ActingAsQuery>,
) -> Result<StatusCode, ApiError> {
    check_length("tokenName", &token_name)?;
    check_user_name(query.user_name.as_deref())?;
    let owner = user.acting_as(query.user_name.as_deref());
    if !state.store.delete(owner, &token_name).await {
        return Err(ApiError::not_found("token not found"));
    }
    info!(user = %owner, token_name, caller = %user.user_name, "Token revoked");
    Ok(StatusCode::NO_CONTENT)
}
