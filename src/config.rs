// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_PRIVATE_KEY` | PEM RSA private key for in-house tokens | None (in-house path disabled) |
//! | `SECRET_TOKEN` | Internal shared secret | None (bypass disabled) |
//! | `OIDC_URL` | OIDC issuer base URL | None (OIDC path disabled) |
//! | `CLIENT_ID` | Expected `aud` of OIDC tokens | empty |
//! | `AUTH_ALLOW_GUEST` | Admit requests without a token | `false` |
//! | `OIDC_FETCH_TIMEOUT_SECS` | Timeout on identity-provider calls | None |
//! | `OIDC_DISCOVERY_TTL_SECS` | Discovery document lifetime | None (until refresh) |
//! | `CORS_ALLOW_ORIGINS` | Comma-separated allowed CORS origins | None (permissive) |
//! | `HTTPS_CERT_FILE_PATH` | PEM certificate chain | None (plain HTTP) |
//! | `HTTPS_KEY_FILE_PATH` | PEM private key for TLS | None (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::auth::discovery::validate_issuer_url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_PRIVATE_KEY_ENV: &str = "JWT_PRIVATE_KEY";
pub const SECRET_TOKEN_ENV: &str = "SECRET_TOKEN";
pub const OIDC_URL_ENV: &str = "OIDC_URL";
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const AUTH_ALLOW_GUEST_ENV: &str = "AUTH_ALLOW_GUEST";
pub const OIDC_FETCH_TIMEOUT_ENV: &str = "OIDC_FETCH_TIMEOUT_SECS";
pub const OIDC_DISCOVERY_TTL_ENV: &str = "OIDC_DISCOVERY_TTL_SECS";
pub const CORS_ALLOW_ORIGINS_ENV: &str = "CORS_ALLOW_ORIGINS";
pub const HTTPS_CERT_FILE_PATH_ENV: &str = "HTTPS_CERT_FILE_PATH";
pub const HTTPS_KEY_FILE_PATH_ENV: &str = "HTTPS_KEY_FILE_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),

    #[error("invalid JWT private key: {0}")]
    PrivateKey(String),
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Identity provider settings. Present only when `OIDC_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcSettings {
    pub issuer_url: String,
    pub client_id: String,
    pub fetch_timeout: Option<Duration>,
    pub discovery_ttl: Option<Duration>,
}

/// Everything the auth service needs.
#[derive(Clone, Default)]
pub struct AuthSettings {
    /// PEM text, with literal `\n` sequences already turned into newlines.
    pub private_key_pem: Option<String>,
    pub internal_secret: Option<String>,
    pub oidc: Option<OidcSettings>,
    pub allow_guest: bool,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("private_key_pem", &self.private_key_pem.as_ref().map(|_| "<redacted>"))
            .field("internal_secret", &self.internal_secret.as_ref().map(|_| "<redacted>"))
            .field("oidc", &self.oidc)
            .field("allow_guest", &self.allow_guest)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthSettings,
    /// Empty means permissive CORS.
    pub cors_allow_origins: Vec<HeaderValue>,
    pub tls: Option<TlsSettings>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(PORT_ENV, format!("{e}")))?,
            None => DEFAULT_PORT,
        };

        let oidc = match get(OIDC_URL_ENV) {
            Some(issuer_url) => {
                validate_issuer_url(&issuer_url)
                    .map_err(|message| ConfigError::invalid(OIDC_URL_ENV, message))?;
                Some(OidcSettings {
                    issuer_url,
                    client_id: get(CLIENT_ID_ENV).unwrap_or_default(),
                    fetch_timeout: parse_secs(OIDC_FETCH_TIMEOUT_ENV, get(OIDC_FETCH_TIMEOUT_ENV))?,
                    discovery_ttl: parse_secs(OIDC_DISCOVERY_TTL_ENV, get(OIDC_DISCOVERY_TTL_ENV))?,
                })
            }
            None => None,
        };

        let auth = AuthSettings {
            private_key_pem: get(JWT_PRIVATE_KEY_ENV).map(|pem| pem.replace("\\n", "\n")),
            internal_secret: get(SECRET_TOKEN_ENV),
            oidc,
            allow_guest: parse_bool(AUTH_ALLOW_GUEST_ENV, get(AUTH_ALLOW_GUEST_ENV))?,
        };

        let cors_allow_origins = match get(CORS_ALLOW_ORIGINS_ENV) {
            Some(list) => parse_origins(&list)?,
            None => Vec::new(),
        };

        let tls = match (get(HTTPS_CERT_FILE_PATH_ENV), get(HTTPS_KEY_FILE_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsSettings {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Incomplete(
                    HTTPS_CERT_FILE_PATH_ENV,
                    HTTPS_KEY_FILE_PATH_ENV,
                ))
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            auth,
            cors_allow_origins,
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(list: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| ConfigError::invalid(CORS_ALLOW_ORIGINS_ENV, e.to_string()))
        })
        .collect()
}

fn parse_secs(name: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|v| match v.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::invalid(name, "must be greater than zero")),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(ConfigError::invalid(name, e.to_string())),
        })
        .transpose()
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::invalid(name, format!("expected true or false, got {v}"))),
    }
}
