// Test helpers are intentionally partially used
#![allow(dead_code)]

use anyhow::{bail, ensure, Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use door_control::domain::{
    Credential, IssuedChallenge, MetricsPtr, PasskeyVerifier, RegisteredKey, User,
    VerifiedAssertion,
};
use door_control::{
    create_memory_repository, create_memory_session_store, create_noop_metrics, create_router,
    AppConfig, AppState, Backends, ClonePolicy, DatabaseConfig, MetricsBackend, RateLimitConfig,
    ServerConfig, SessionBackend, SessionConfig, SiteConfig, WebAuthnConfig, SESSION_COOKIE,
};
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub use door_control::MemoryRepository;

/// Where the test door is.
pub const SITE_LAT: f64 = 51.5074;
pub const SITE_LON: f64 = -0.1278;

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    // ---
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Configuration for an in-process app. Nothing here is read from the environment.
pub fn test_config() -> AppConfig {
    // ---
    AppConfig {
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            metrics: MetricsBackend::Noop,
        },
        database: DatabaseConfig {
            database_url: "postgres://unused".to_string(),
            retry_count: 1,
            acquire_timeout: Duration::from_secs(1),
            min_connections: 1,
            max_connections: 1,
        },
        session: SessionConfig {
            backend: SessionBackend::Memory,
            ttl: Duration::from_secs(3600),
            cookie_secure: false,
        },
        webauthn: WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test Door".to_string(),
            origin: "http://localhost:8080".to_string(),
            extra_origins: vec![],
            ceremony_ttl: Duration::from_secs(300),
            clone_policy: ClonePolicy::Warn,
        },
        rate_limit: RateLimitConfig {
            per_second: 100.0,
            burst: 1_000,
            sweep_interval: Duration::from_secs(300),
            trust_forwarded_for: true,
        },
        site: SiteConfig {
            latitude: SITE_LAT,
            longitude: SITE_LON,
            radius_km: 0.05,
        },
    }
}

// ============================================================================
// Deterministic verifier
// ============================================================================

/// Stands in for the public-key library.
///
/// A challenge is a random UUID. A response verifies when it echoes the
/// challenge; login responses must also carry `"signature": "valid"`.
/// Credential ids travel hex-encoded.
pub struct StubVerifier;

fn challenge_of(state: &Value) -> Result<&str> {
    state["challenge"].as_str().context("state without challenge")
}

fn credential_id_of(response: &Value) -> Result<Vec<u8>> {
    let id = response["credential_id"].as_str().context("missing credential_id")?;
    Ok(hex::decode(id)?)
}

impl PasskeyVerifier for StubVerifier {
    // ---
    fn begin_registration(&self, user: &User) -> Result<IssuedChallenge> {
        // ---
        let challenge = Uuid::new_v4().to_string();
        Ok(IssuedChallenge {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "user": { "name": user.username, "displayName": user.display_name },
                }
            }),
            state: json!({ "challenge": challenge }),
        })
    }

    fn finish_registration(&self, state: &Value, response: &Value) -> Result<RegisteredKey> {
        // ---
        ensure!(response["challenge"].as_str() == Some(challenge_of(state)?), "challenge mismatch");
        Ok(RegisteredKey {
            credential_id: credential_id_of(response)?,
            public_key: b"stub-public-key".to_vec(),
            backup_eligible: true,
            backup_state: false,
        })
    }

    fn begin_login(&self, credentials: &[Credential]) -> Result<IssuedChallenge> {
        // ---
        let challenge = Uuid::new_v4().to_string();
        let allowed: Vec<String> = credentials.iter().map(|c| hex::encode(&c.id)).collect();
        Ok(IssuedChallenge {
            options: json!({
                "publicKey": { "challenge": challenge, "allowCredentials": allowed }
            }),
            state: json!({ "challenge": challenge }),
        })
    }

    fn finish_login(&self, state: &Value, response: &Value) -> Result<VerifiedAssertion> {
        // ---
        ensure!(response["challenge"].as_str() == Some(challenge_of(state)?), "challenge mismatch");
        if response["signature"] != "valid" {
            bail!("bad signature");
        }
        let sign_count = response["sign_count"].as_u64().context("missing sign_count")?;
        Ok(VerifiedAssertion {
            credential_id: credential_id_of(response)?,
            sign_count: u32::try_from(sign_count)?,
            backup_state: response["backup_state"].as_bool().unwrap_or(false),
        })
    }
}

// ============================================================================
// In-process app and cookie-carrying client
// ============================================================================

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub repository: Arc<MemoryRepository>,
}

impl TestApp {
    // ---
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        // ---
        Self::with_metrics(config, create_noop_metrics().unwrap())
    }

    pub fn with_metrics(config: AppConfig, metrics: MetricsPtr) -> Self {
        // ---
        init_tracing();
        let repository = create_memory_repository();
        let backends = Backends {
            metrics,
            credentials: repository.clone(),
            bookings: repository.clone(),
            sessions: create_memory_session_store(),
            verifier: Arc::new(StubVerifier),
        };
        let state = AppState::new(&config, backends);
        let router = create_router(state.clone());

        Self {
            state,
            router,
            repository,
        }
    }

    /// A client with an empty cookie jar.
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
            forwarded_for: None,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    // ---
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct TestClient {
    router: Router,
    cookie: Option<String>,
    forwarded_for: Option<String>,
}

impl TestClient {
    // ---
    /// Present as `ip` through `X-Forwarded-For`.
    pub fn from_ip(mut self, ip: &str) -> Self {
        self.forwarded_for = Some(ip.to_string());
        self
    }

    /// Present `cookie` (a `name=value` pair) on every request.
    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.cookie = Some(cookie.to_string());
        self
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub async fn send(&mut self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        // ---
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(ip) = &self.forwarded_for {
            builder = builder.header("x-forwarded-for", ip);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
            assert!(pair.starts_with(&format!("{SESSION_COOKIE}=")));
            self.cookie = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    // ------------------------------------------------------------------------
    // Ceremony shortcuts
    // ------------------------------------------------------------------------

    /// Begin registration and return the issued challenge.
    pub async fn register_begin(&mut self, username: &str) -> TestResponse {
        self.post(
            "/register/begin",
            json!({ "username": username, "displayName": format!("{username} display") }),
        )
        .await
    }

    /// Register `username` with a fresh credential; returns its hex id.
    pub async fn register(&mut self, username: &str) -> String {
        // ---
        let begin = self.register_begin(username).await;
        assert_eq!(begin.status, StatusCode::OK, "{}", begin.text());
        let challenge = begin.json()["publicKey"]["challenge"].as_str().unwrap().to_string();

        let credential_id = hex::encode(Uuid::new_v4().as_bytes());
        let finish = self
            .post(
                "/register/finish",
                json!({ "challenge": challenge, "credential_id": credential_id }),
            )
            .await;
        assert_eq!(finish.status, StatusCode::OK, "{}", finish.text());
        credential_id
    }

    /// Begin login and return the challenge string.
    pub async fn login_begin(&mut self, username: &str) -> String {
        // ---
        let begin = self.post("/login/begin", json!({ "username": username })).await;
        assert_eq!(begin.status, StatusCode::OK, "{}", begin.text());
        begin.json()["publicKey"]["challenge"].as_str().unwrap().to_string()
    }

    /// Complete a login that reports `sign_count`.
    pub async fn login(&mut self, username: &str, credential_id: &str, sign_count: u32) -> TestResponse {
        // ---
        let challenge = self.login_begin(username).await;
        self.post(
            "/login/finish",
            json!({
                "challenge": challenge,
                "credential_id": credential_id,
                "sign_count": sign_count,
                "signature": "valid",
            }),
        )
        .await
    }
}

/// Latitude `km` north of the site.
pub fn lat_north_of_site(km: f64) -> f64 {
    SITE_LAT + (km / 6371.0_f64).to_degrees()
}
