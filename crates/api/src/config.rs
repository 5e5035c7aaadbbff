//! Configuration loading and validation for the API service.
//!
//! All values are read from environment variables once at startup (after an
//! optional `.env` file has been merged into the process environment). The
//! resulting [`Config`] is immutable and shared by `Arc` with every component
//! that needs it. Loading fails with a [`ConfigError`] that names **every**
//! missing required key, never just the first.

use std::{path::PathBuf, time::Duration};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required keys are absent or empty.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A key is present but its value cannot be used.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// The environment could not be read into the configuration layer.
    #[error("failed to read configuration from environment: {0}")]
    Source(#[from] config::ConfigError),
}

/// Deployment mode selected by `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Key material used to verify identity tokens locally.
#[derive(Clone)]
pub enum JwtKey {
    /// PEM-encoded RSA public key (`CLERK_JWT_KEY`), verified as RS256.
    RsaPem(String),
    /// Shared secret (`AUTH_JWT_SECRET`), verified as HS256.
    Secret(String),
}

impl std::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtKey::RsaPem(_) => f.write_str("RsaPem([REDACTED])"),
            JwtKey::Secret(_) => f.write_str("Secret([REDACTED])"),
        }
    }
}

/// Identity verification settings.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Verification key. `None` means every request is anonymous.
    pub jwt_key: Option<JwtKey>,
    /// Expected `iss` claim, when set.
    pub issuer: Option<String>,
}

/// Durable job bus (Inngest) settings.
#[derive(Clone)]
pub struct InngestConfig {
    /// Key appended to the event API URL. Required in production.
    pub event_key: String,
    /// Key used to verify webhook signatures and authenticate registration.
    pub signing_key: Option<String>,
    /// Base URL of the event ingestion API.
    pub base_url: String,
    /// Base URL of the management API used for function registration.
    pub api_base_url: String,
    /// Application identifier reported to the bus.
    pub app_id: String,
    /// Public origin this service is reachable at, used when registering.
    /// Required in production; the request `Host` is trusted only in development.
    pub serve_host: Option<String>,
}

impl std::fmt::Debug for InngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InngestConfig")
            .field("base_url", &self.base_url)
            .field("api_base_url", &self.api_base_url)
            .field("app_id", &self.app_id)
            .field("serve_host", &self.serve_host)
            .field("has_signing_key", &self.signing_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Validated service configuration.
#[derive(Clone)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// MongoDB connection string. **Required.**
    pub mongo_url: String,
    /// Deployment mode.
    pub environment: Environment,
    /// Allowed cross-origin client. **Required in production.**
    pub client_url: String,
    /// Tracing log level (e.g. `"info"`, `"debug"`).
    pub log_level: String,
    /// OTLP collector endpoint. Span export is disabled when unset.
    pub otel_exporter_otlp_endpoint: Option<String>,
    /// Directory holding the built frontend, served in production.
    pub static_dir: PathBuf,
    /// Upper bound on the startup store connectivity check.
    pub store_connect_timeout: Duration,
    /// Per-request timeout applied to all routes.
    pub request_timeout: Duration,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
    pub auth: AuthConfig,
    pub inngest: InngestConfig,
}

impl Config {
    /// Store URL with any `user:password@` credentials masked, safe for logs.
    pub fn redacted_store_url(&self) -> String {
        redact_credentials(&self.mongo_url)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("mongo_url", &self.redacted_store_url())
            .field("environment", &self.environment)
            .field("client_url", &self.client_url)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("static_dir", &self.static_dir)
            .field("store_connect_timeout", &self.store_connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("auth", &self.auth)
            .field("inngest", &self.inngest)
            .finish()
    }
}

/// Raw environment view. Every field is optional so that absent required
/// keys can be collected and reported together.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    port: Option<String>,
    mongo_url: Option<String>,
    node_env: Option<String>,
    client_url: Option<String>,
    log_level: Option<String>,
    otel_exporter_otlp_endpoint: Option<String>,
    static_dir: Option<String>,
    store_connect_timeout_secs: Option<String>,
    request_timeout_secs: Option<String>,
    body_limit_bytes: Option<String>,
    clerk_jwt_key: Option<String>,
    auth_jwt_secret: Option<String>,
    auth_issuer: Option<String>,
    inngest_event_key: Option<String>,
    inngest_signing_key: Option<String>,
    inngest_base_url: Option<String>,
    inngest_api_base_url: Option<String>,
    inngest_app_id: Option<String>,
    inngest_serve_host: Option<String>,
}

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DEV_CLIENT_URL: &str = "http://localhost:5173";
const DEFAULT_STATIC_DIR: &str = "../frontend/dist";
const DEFAULT_STORE_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
const DEFAULT_APP_ID: &str = "interview-platform";
const DEV_EVENT_KEY: &str = "local";
const INNGEST_CLOUD_EVENT_URL: &str = "https://inn.gs";
const INNGEST_CLOUD_API_URL: &str = "https://api.inngest.com";
const INNGEST_DEV_SERVER_URL: &str = "http://localhost:8288";

impl Config {
    /// Load and validate configuration from the process environment.
    ///
    /// Call once per process; the result is shared by reference afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] listing every absent required key, or
    /// [`ConfigError::Invalid`] for the first unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(config::Environment::default())
    }

    /// Load configuration from an explicit environment source.
    pub fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(source.ignore_empty(true))
            .build()?
            .try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let environment = match non_empty(raw.node_env) {
            None => Environment::Development,
            Some(v) => parse_environment(&v)?,
        };
        let production = environment.is_production();

        let mongo_url = non_empty(raw.mongo_url);
        let client_url = non_empty(raw.client_url);
        let event_key = non_empty(raw.inngest_event_key);
        let signing_key = non_empty(raw.inngest_signing_key);
        let serve_host = non_empty(raw.inngest_serve_host);

        let mut missing = Vec::new();
        if mongo_url.is_none() {
            missing.push("MONGO_URL");
        }
        if production {
            if client_url.is_none() {
                missing.push("CLIENT_URL");
            }
            if event_key.is_none() {
                missing.push("INNGEST_EVENT_KEY");
            }
            if signing_key.is_none() {
                missing.push("INNGEST_SIGNING_KEY");
            }
            if serve_host.is_none() {
                missing.push("INNGEST_SERVE_HOST");
            }
        }

        let (Some(mongo_url), true) = (mongo_url, missing.is_empty()) else {
            return Err(ConfigError::Missing(missing));
        };

        let port = parse_or("PORT", raw.port, DEFAULT_PORT)?;
        if port == 0 {
            return Err(invalid("PORT", "must be a non-zero port"));
        }
        let store_connect_timeout_secs = parse_or(
            "STORE_CONNECT_TIMEOUT_SECS",
            raw.store_connect_timeout_secs,
            DEFAULT_STORE_CONNECT_TIMEOUT_SECS,
        )?;
        let request_timeout_secs =
            parse_or("REQUEST_TIMEOUT_SECS", raw.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let body_limit_bytes =
            parse_or("BODY_LIMIT_BYTES", raw.body_limit_bytes, DEFAULT_BODY_LIMIT_BYTES)?;

        let client_url = client_url
            .unwrap_or_else(|| DEFAULT_DEV_CLIENT_URL.into())
            .trim_end_matches('/')
            .to_owned();

        let jwt_key = match (non_empty(raw.clerk_jwt_key), non_empty(raw.auth_jwt_secret)) {
            (Some(pem), _) => {
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| invalid("CLERK_JWT_KEY", e.to_string()))?;
                Some(JwtKey::RsaPem(pem))
            }
            (None, Some(secret)) => Some(JwtKey::Secret(secret)),
            (None, None) => None,
        };

        let (default_base, default_api) = if production {
            (INNGEST_CLOUD_EVENT_URL, INNGEST_CLOUD_API_URL)
        } else {
            (INNGEST_DEV_SERVER_URL, INNGEST_DEV_SERVER_URL)
        };

        let cfg = Config {
            port,
            mongo_url,
            environment,
            client_url,
            log_level: non_empty(raw.log_level).unwrap_or_else(|| "info".into()),
            otel_exporter_otlp_endpoint: non_empty(raw.otel_exporter_otlp_endpoint),
            static_dir: non_empty(raw.static_dir)
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.into())
                .into(),
            store_connect_timeout: Duration::from_secs(store_connect_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            body_limit_bytes,
            auth: AuthConfig {
                jwt_key,
                issuer: non_empty(raw.auth_issuer),
            },
            inngest: InngestConfig {
                event_key: event_key.unwrap_or_else(|| DEV_EVENT_KEY.into()),
                signing_key,
                base_url: trimmed_url(raw.inngest_base_url, default_base),
                api_base_url: trimmed_url(raw.inngest_api_base_url, default_api),
                app_id: non_empty(raw.inngest_app_id).unwrap_or_else(|| DEFAULT_APP_ID.into()),
                serve_host: serve_host.map(|h| h.trim_end_matches('/').to_owned()),
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate cross-field constraints that parsing alone cannot express.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.store_connect_timeout.is_zero() {
            return Err(invalid("STORE_CONNECT_TIMEOUT_SECS", "must be > 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "must be > 0"));
        }
        if self.body_limit_bytes == 0 {
            return Err(invalid("BODY_LIMIT_BYTES", "must be > 0"));
        }
        if !(self.client_url.starts_with("http://") || self.client_url.starts_with("https://")) {
            return Err(invalid("CLIENT_URL", "must be an http(s) origin"));
        }
        Ok(())
    }
}

fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "NODE_ENV",
            format!("expected `development` or `production`, got `{other}`"),
        )),
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| invalid(key, e.to_string())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn trimmed_url(value: Option<String>, default: &str) -> String {
    non_empty(value)
        .unwrap_or_else(|| default.into())
        .trim_end_matches('/')
        .to_owned()
}

fn redact_credentials(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    let authority_end = rest.find(|c| c == '/' || c == '?').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_owned(),
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}
