// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relational_auth_server::{
    api::{router, HttpOptions},
    auth::AuthService,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    platform::{ReqwestFetcher, SystemClock},
    state::AppState,
    store::{InMemoryTokenStore, TokenStore},
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);
    info!(auth = ?config.auth, "Configuration loaded");

    let fetch_timeout = config.auth.oidc.as_ref().and_then(|oidc| oidc.fetch_timeout);
    let http = Arc::new(ReqwestFetcher::new(fetch_timeout).expect("Failed to build HTTP client"));
    let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());

    let auth = Arc::new(AuthService::from_settings(
        &config.auth,
        store.clone(),
        http,
        Arc::new(SystemClock),
    ));
    auth.warm_up().await;

    let options = HttpOptions {
        cors_allow_origins: config.cors_allow_origins.clone(),
        hsts: config.tls.is_some(),
    };
    let app = router(AppState::new(auth, store), options);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .expect("Failed to parse bind address");

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .expect("Failed to load TLS certificate and key");
            info!(%addr, "Relational Auth server listening on https (docs at /docs)");

            tokio::select! {
                result = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()) => {
                    result.expect("HTTPS server failed");
                }
                _ = shutdown_signal() => {}
            }
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .expect("Failed to bind listener");
            info!(%addr, "Relational Auth server listening on http (docs at /docs)");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .expect("HTTP server failed");
        }
    }
}
