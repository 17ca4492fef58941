// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::STRICT_TRANSPORT_SECURITY, HeaderValue},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{auth_middleware, AuthenticatedUser, PrincipalKind},
    models::{CreateTokenRequest, KeyRefreshResponse, TokenResponse},
    state::AppState,
};

pub mod health;
pub mod session;
pub mod tokens;

const HSTS_POLICY: &str = "max-age=31536000; includeSubDomains";

/// Transport-level response policy.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Empty allows any origin.
    pub cors_allow_origins: Vec<HeaderValue>,
    /// Send `Strict-Transport-Security`. Set when serving over TLS.
    pub hsts: bool,
}

/// Build the application router.
///
/// `/health*` and the API docs are public; everything under `/v1` passes
/// through the auth middleware.
pub fn router(state: AppState, options: HttpOptions) -> Router {
    let v1_routes = Router::new()
        .route(
            "/tokens",
            get(tokens::list_tokens).post(tokens::create_token),
        )
        .route("/tokens/{tokenName}", delete(tokens::delete_token))
        .route("/me", get(session::me))
        .route("/auth/keys/refresh", post(session::refresh_keys))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    let cors = if options.cors_allow_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(options.cors_allow_origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    if options.hsts {
        app.layer(SetResponseHeaderLayer::if_not_present(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_POLICY),
        ))
    } else {
        app
    }
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tokens::create_token,
        tokens::list_tokens,
        tokens::delete_token,
        session::me,
        session::refresh_keys,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            TokenResponse,
            CreateTokenRequest,
            KeyRefreshResponse,
            AuthenticatedUser,
            PrincipalKind,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Tokens", description = "Personal access token management"),
        (name = "Session", description = "Caller identity and key management"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct ApiDoc;
