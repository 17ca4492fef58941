// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Identity provider keys ("ok" or "unavailable").
    /// Only present when OIDC is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_keys: Option<String>,
    /// In-house signing key ("ok" or "missing").
    pub signing_key: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Check if identity provider keys are held, loading them if not.
async fn check_oidc_keys(state: &AppState) -> Option<String> {
    let resolver = state.auth.resolver()?;
    if resolver.is_loaded().await {
        return Some("ok".to_string());
    }
    match resolver.try_refresh().await {
        Ok(_) => Some("ok".to_string()),
        Err(_) => Some("unavailable".to_string()),
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails. With OIDC
/// configured a missing signing key is reported but does not fail readiness,
/// since federated callers can still authenticate.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is degraded", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let oidc_keys = check_oidc_keys(&state).await;
    let signing_ok = state.auth.issuer().can_sign();

    let oidc_ok = oidc_keys.as_deref().is_none_or(|s| s == "ok");
    let signing_required = oidc_keys.is_none();
    let all_ok = oidc_ok && (signing_ok || !signing_required);

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            oidc_keys,
            signing_key: if signing_ok { "ok" } else { "missing" }.to_string(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::auth::service::tests::full_settings;
    use crate::config::AuthSettings;
    use crate::state::tests::test_state_with;

    #[tokio::test]
    async fn healthy_when_keys_load() {
        let (state, _) = test_state_with(&full_settings());
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.checks.oidc_keys.as_deref(), Some("ok"));
        assert_eq!(body.checks.signing_key, "ok");
    }

    #[tokio::test]
    async fn degraded_when_provider_down() {
        let (state, provider) = test_state_with(&full_settings());
        provider.fail_with(503);
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.oidc_keys.as_deref(), Some("unavailable"));
    }

    #[tokio::test]
    async fn oidc_check_omitted_when_not_configured() {
        let (state, _) = test_state_with(&AuthSettings {
            oidc: None,
            ..full_settings()
        });
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.checks.oidc_keys.is_none());
    }

    #[tokio::test]
    async fn degraded_without_any_way_to_authenticate_users() {
        let (state, _) = test_state_with(&AuthSettings {
            private_key_pem: None,
            oidc: None,
            ..full_settings()
        });
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.checks.signing_key, "missing");
    }

    #[tokio::test]
    async fn missing_signing_key_is_reported_but_ready_with_oidc() {
        let (state, _) = test_state_with(&AuthSettings {
            private_key_pem: None,
            ..full_settings()
        });
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.oidc_keys.as_deref(), Some("ok"));
        assert_eq!(body.checks.signing_key, "missing");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }
}
