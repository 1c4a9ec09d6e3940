// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
///
/// Missing configuration is treated as a deployment error,
/// not a recoverable runtime condition.
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads a required environment variable and parses it.
///
/// Unlike [`optional_env_parse!`], an unparsable value is an error: a
/// required setting has no sensible fallback.
macro_rules! required_env_parse {
    // ---
    ($key:literal, $ty:ty) => {{
        let raw = required_env!($key);
        raw.trim().parse::<$ty>().map_err(|e| {
            anyhow::anyhow!(concat!("Invalid configuration for ", $key, ": {}"), e)
        })?
    }};
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.trim().parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

/// Reads an optional environment variable naming one of a fixed set of choices.
///
/// Missing means the default; an unknown value is an error because these
/// settings select security or storage behavior.
macro_rules! optional_env_choice {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        match std::env::var($key) {
            Ok(v) => v.trim().parse::<$ty>().map_err(|e| {
                anyhow::anyhow!(concat!("Invalid configuration for ", $key, ": {}"), e)
            })?,
            Err(_) => $default,
        }
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
///
/// This macro is intended for config unit tests only and enforces
/// consistent error messages across failure cases.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub session: session::SessionConfig,
    pub webauthn: webauthn::WebAuthnConfig,
    pub rate_limit: rate_limit::RateLimitConfig,
    pub site: site::SiteConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            server: server::ServerConfig::from_env()?,
            database: database::DatabaseConfig::from_env()?,
            session: session::SessionConfig::from_env()?,
            webauthn: webauthn::WebAuthnConfig::from_env()?,
            rate_limit: rate_limit::RateLimitConfig::from_env()?,
            site: site::SiteConfig::from_env()?,
        })
    }
}

// ============================================================
// Server configuration
// ============================================================

mod server {
    // ---
    use super::*;
    use std::str::FromStr;

    /// Which metrics backend to install.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MetricsBackend {
        Noop,
        Prometheus,
    }

    impl FromStr for MetricsBackend {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self> {
            match s {
                "noop" => Ok(MetricsBackend::Noop),
                "prom" => Ok(MetricsBackend::Prometheus),
                other => Err(anyhow::anyhow!("expected 'noop' or 'prom', got '{other}'")),
            }
        }
    }

    /// Process-level settings.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// Socket address to listen on. Defaults to 127.0.0.1:8080.
        pub bind_addr: String,

        pub metrics: MetricsBackend,
    }

    impl ServerConfig {
        pub fn from_env() -> Result<Self> {
            // ---
            let bind_addr =
                std::env::var("DOOR_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
            let metrics = optional_env_choice!("DOOR_METRICS_TYPE", MetricsBackend, MetricsBackend::Noop);

            Ok(Self { bind_addr, metrics })
        }
    }
}
pub use server::{MetricsBackend, ServerConfig};

// ============================================================
// Database configuration
// ============================================================

mod database {
    // ---
    use super::*;

    /// Database-related configuration derived from environment variables.
    ///
    /// This configuration is required for the service to function and
    /// is validated eagerly during startup.
    #[derive(Debug, Clone)]
    pub struct DatabaseConfig {
        /// PostgreSQL connection string.
        pub database_url: String,

        /// Number of retry attempts when initializing the database connection. Defaults to 50.
        pub retry_count: u32,

        /// Maximum time to wait when acquiring a connection from the pool. Defaults to 30 seconds.
        pub acquire_timeout: Duration,

        /// Minimum number of connections to keep in the pool, even when idle. Defaults to 2.
        pub min_connections: u32,

        /// Maximum number of connections to be open concurrently. Defaults to 15
        pub max_connections: u32,
    }

    impl DatabaseConfig {
        /// Builds a [`DatabaseConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// Startup will fail fast rather than continuing with incomplete
        /// or invalid configuration.
        pub fn from_env() -> Result<Self> {
            // ---
            let database_url = required_env!("DATABASE_URL");
            let retry_count = optional_env_parse!("DOOR_DB_RETRY_COUNT", u32, 50);
            let acquire_timeout_secs = optional_env_parse!("DOOR_DB_ACQUIRE_TIMEOUT_SEC", u64, 30);
            let min_connections = optional_env_parse!("DOOR_DB_MIN_CONNECTIONS", u32, 2);
            let max_connections = optional_env_parse!("DOOR_DB_MAX_CONNECTIONS", u32, 15);

            Ok(Self {
                database_url,
                retry_count,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
                min_connections,
                max_connections,
            })
        }
    }
}
pub use database::DatabaseConfig;

// ============================================================
// Session configuration
// ============================================================

mod session {
    // ---
    use super::*;
    use std::str::FromStr;

    /// Where server-side session state lives.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SessionBackend {
        /// Process memory. Sessions are lost on restart.
        Memory,
        /// Redis at the given URL.
        Redis(String),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BackendKind {
        Memory,
        Redis,
    }

    impl FromStr for BackendKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self> {
            match s {
                "memory" => Ok(BackendKind::Memory),
                "redis" => Ok(BackendKind::Redis),
                other => Err(anyhow::anyhow!("expected 'memory' or 'redis', got '{other}'")),
            }
        }
    }

    /// Session cookie and storage settings.
    #[derive(Debug, Clone)]
    pub struct SessionConfig {
        pub backend: SessionBackend,

        /// Lifetime of a session, also used as the cookie Max-Age. Defaults to one day.
        pub ttl: Duration,

        /// Whether the cookie carries the `Secure` attribute. Defaults to true.
        pub cookie_secure: bool,
    }

    impl SessionConfig {
        /// Builds a [`SessionConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if the backend is unknown, or is `redis`
        /// without `DOOR_REDIS_URL`.
        pub fn from_env() -> Result<Self> {
            // ---
            let kind = optional_env_choice!("DOOR_SESSION_BACKEND", BackendKind, BackendKind::Memory);
            let backend = match kind {
                BackendKind::Memory => SessionBackend::Memory,
                BackendKind::Redis => SessionBackend::Redis(required_env!("DOOR_REDIS_URL")),
            };
            let ttl_secs = optional_env_parse!("DOOR_SESSION_TTL_SEC", u64, 86_400);
            let cookie_secure = optional_env_parse!("DOOR_SESSION_COOKIE_SECURE", bool, true);

            Ok(Self {
                backend,
                ttl: Duration::from_secs(ttl_secs),
                cookie_secure,
            })
        }
    }
}
pub use session::{SessionBackend, SessionConfig};

// ============================================================
// WebAuthn configuration
// ============================================================

mod webauthn {
    // ---
    use super::*;
    use std::str::FromStr;

    /// What to do when a login reports a sign counter that did not advance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ClonePolicy {
        /// Log and count the anomaly, let the login through.
        Warn,
        /// Fail the login.
        Reject,
    }

    impl FromStr for ClonePolicy {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self> {
            match s {
                "warn" => Ok(ClonePolicy::Warn),
                "reject" => Ok(ClonePolicy::Reject),
                other => Err(anyhow::anyhow!("expected 'warn' or 'reject', got '{other}'")),
            }
        }
    }

    /// WebAuthn / Passkeys configuration.
    ///
    /// These values define the relying party identity and security
    /// origin used during WebAuthn registration and authentication.
    #[derive(Debug, Clone)]
    pub struct WebAuthnConfig {
        /// Relying Party ID (typically a domain name).
        pub rp_id: String,

        /// Human-readable Relying Party name.
        pub rp_name: String,

        /// Fully-qualified origin (e.g. https://example.com).
        pub origin: String,

        /// Further origins accepted in client data, e.g. a localhost dev server.
        pub extra_origins: Vec<String>,

        /// How long a begun ceremony may wait for its finish call.
        pub ceremony_ttl: Duration,

        pub clone_policy: ClonePolicy,
    }

    impl WebAuthnConfig {
        /// Builds a [`WebAuthnConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if required configuration is missing.
        /// WebAuthn configuration is considered security-critical
        /// and must be explicitly provided.
        pub fn from_env() -> Result<Self> {
            // ---
            let rp_id = required_env!("DOOR_WEBAUTHN_RP_ID");
            let origin = required_env!("DOOR_WEBAUTHN_ORIGIN");

            let rp_name = std::env::var("DOOR_WEBAUTHN_RP_NAME")
                .unwrap_or_else(|_| "Door Control".to_string());

            let extra_origins = std::env::var("DOOR_WEBAUTHN_EXTRA_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            let ttl_secs = optional_env_parse!("DOOR_CEREMONY_TTL_SEC", u64, 300);
            let clone_policy = optional_env_choice!("DOOR_CLONE_POLICY", ClonePolicy, ClonePolicy::Warn);

            Ok(Self {
                rp_id,
                rp_name,
                origin,
                extra_origins,
                ceremony_ttl: Duration::from_secs(ttl_secs),
                clone_policy,
            })
        }
    }
}
pub use webauthn::{ClonePolicy, WebAuthnConfig};

// ============================================================
// Rate limit configuration
// ============================================================

mod rate_limit {
    // ---
    use super::*;

    /// Token-bucket parameters for the ceremony endpoints.
    #[derive(Debug, Clone)]
    pub struct RateLimitConfig {
        /// Tokens added per second. Defaults to 1.
        pub per_second: f64,

        /// Bucket capacity. Defaults to 5.
        pub burst: u32,

        /// How often idle buckets are swept. Defaults to 5 minutes.
        pub sweep_interval: Duration,

        /// Key clients by `X-Forwarded-For` when present. Only safe behind a
        /// proxy that overwrites the header. Defaults to true.
        pub trust_forwarded_for: bool,
    }

    impl RateLimitConfig {
        pub fn from_env() -> Result<Self> {
            // ---
            let per_second = optional_env_parse!("DOOR_RATE_LIMIT_PER_SEC", f64, 1.0);
            let burst = optional_env_parse!("DOOR_RATE_LIMIT_BURST", u32, 5);
            let sweep_secs = optional_env_parse!("DOOR_RATE_LIMIT_SWEEP_SEC", u64, 300);
            let trust_forwarded_for = optional_env_parse!("DOOR_TRUST_FORWARDED_FOR", bool, true);

            if !(per_second.is_finite() && per_second > 0.0) || burst == 0 {
                anyhow::bail!("Invalid rate limit: rate and burst must be positive");
            }
            if sweep_secs == 0 {
                anyhow::bail!("Invalid DOOR_RATE_LIMIT_SWEEP_SEC: must be at least 1");
            }

            Ok(Self {
                per_second,
                burst,
                sweep_interval: Duration::from_secs(sweep_secs),
                trust_forwarded_for,
            })
        }
    }
}
pub use rate_limit::RateLimitConfig;

// ============================================================
// Site configuration
// ============================================================

mod site {
    // ---
    use super::*;

    /// Where the door is, and how close a client must be to open it.
    #[derive(Debug, Clone)]
    pub struct SiteConfig {
        pub latitude: f64,
        pub longitude: f64,

        /// Unlock radius in kilometres. Defaults to 0.05 (50 m).
        pub radius_km: f64,
    }

    impl SiteConfig {
        /// Builds a [`SiteConfig`] from environment variables.
        ///
        /// # Errors
        /// Fails if either site coordinate is missing or out of range, or if
        /// the radius is not a positive finite number.
        pub fn from_env() -> Result<Self> {
            // ---
            let latitude = required_env_parse!("DOOR_SITE_LATITUDE", f64);
            let longitude = required_env_parse!("DOOR_SITE_LONGITUDE", f64);
            let radius_km = optional_env_parse!("DOOR_GEOFENCE_RADIUS_KM", f64, 0.05);

            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                anyhow::bail!("Invalid site coordinates: {latitude},{longitude}");
            }
            if !(radius_km.is_finite() && radius_km > 0.0) {
                anyhow::bail!("Invalid DOOR_GEOFENCE_RADIUS_KM: {radius_km}");
            }

            Ok(Self {
                latitude,
                longitude,
                radius_km,
            })
        }
    }
}
pub use site::SiteConfig;

// ============================================================
// Tests
// ============================================================
