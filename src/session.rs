//! Session management for ceremony and authenticated state.
//!
//! The client holds an opaque token in the `webauthn-session` cookie; the
//! typed [`SessionState`] behind it lives in a [`SessionStore`].

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::domain::{AccessError, AccessResult, SessionState, SessionStorePtr};
use std::time::Duration;

// ---

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "webauthn-session";

// ---

/// A loaded session: the client token plus its state.
#[derive(Debug, Clone)]
pub struct Session {
    // ---
    token: String,
    pub state: SessionState,
}

impl Session {
    // ---
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Loads, saves and expires session state for request handlers.
#[derive(Clone)]
pub struct SessionManager {
    // ---
    store: SessionStorePtr,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionManager {
    // ---
    pub fn new(store: SessionStorePtr, config: &SessionConfig) -> Self {
        // ---
        Self {
            store,
            ttl: config.ttl,
            cookie_secure: config.cookie_secure,
        }
    }

    /// Load the session named by `token`.
    ///
    /// A missing, malformed, unknown or expired token yields a fresh empty
    /// session under a new token. Only store failures are errors.
    pub async fn get(&self, token: Option<&str>) -> AccessResult<Session> {
        // ---
        if let Some(token) = token.filter(|t| Uuid::parse_str(t).is_ok()) {
            let loaded = self.store.load(token).await.map_err(|e| {
                //
                tracing::error!("Failed to load session: {:?}", e);
                AccessError::Internal(e)
            })?;

            if let Some(state) = loaded {
                return Ok(Session {
                    token: token.to_string(),
                    state,
                });
            }
        }

        Ok(Session {
            token: Uuid::new_v4().to_string(),
            state: SessionState::default(),
        })
    }

    /// Load the session named by the request's cookie.
    pub async fn from_headers(&self, headers: &HeaderMap) -> AccessResult<Session> {
        // ---
        let token = token_from_headers(headers);
        self.get(token.as_deref()).await
    }

    /// Persist `session` and refresh its lifetime.
    pub async fn save(&self, session: &Session) -> AccessResult<()> {
        // ---
        self.store
            .store(&session.token, &session.state, self.ttl)
            .await
            .map_err(|e| {
                //
                tracing::error!("Failed to store session: {:?}", e);
                AccessError::Internal(e)
            })
    }

    /// Move `session` to a fresh token and persist it there.
    ///
    /// The record under the old token is dropped, so a token planted
    /// before sign-in never becomes an authenticated one.
    pub async fn renew(&self, session: &mut Session) -> AccessResult<()> {
        // ---
        self.store.remove(&session.token).await.map_err(|e| {
            //
            tracing::error!("Failed to drop old session: {:?}", e);
            AccessError::Internal(e)
        })?;
        session.token = Uuid::new_v4().to_string();
        self.save(session).await
    }

    /// Clear identity from `session`. Never fails.
    ///
    /// The stored record is dropped unless a ceremony is still pending, in
    /// which case the remaining state is saved.
    pub async fn destroy(&self, session: &mut Session) {
        // ---
        session.state.sign_out();

        let result = match session.state.pending {
            Some(_) => self.save(session).await,
            None => self.store.remove(&session.token).await.map_err(AccessError::Internal),
        };
        if let Err(e) = result {
            tracing::warn!("Logout could not persist session: {}", e);
        }
    }

    /// `Set-Cookie` value binding the client to `session`.
    pub fn cookie(&self, session: &Session) -> String {
        // ---
        let secure = if self.cookie_secure { "; Secure" } else { "" };
        format!(
            "{SESSION_COOKIE}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure}",
            session.token,
            self.ttl.as_secs()
        )
    }
}

/// Extract the session token from the `Cookie` header(s), if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    // ---
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::SessionBackend;
    use crate::infrastructure::create_memory_session_store;
    use axum::http::HeaderValue;

    fn manager() -> SessionManager {
        // ---
        let config = SessionConfig {
            backend: SessionBackend::Memory,
            ttl: Duration::from_secs(600),
            cookie_secure: true,
        };
        SessionManager::new(create_memory_session_store(), &config)
    }

    #[test]
    fn finds_token_among_other_cookies() {
        // ---
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; webauthn-session=abc-123 ; lang=en"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn no_cookie_means_no_token() {
        // ---
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("webauthn-session="));
        assert!(token_from_headers(&headers).is_none());
    }

    #[tokio::test]
    async fn unknown_or_garbage_token_gives_fresh_session() {
        // ---
        let sessions = manager();

        let garbage = sessions.get(Some("not-a-uuid")).await.unwrap();
        assert_ne!(garbage.token(), "not-a-uuid");
        assert_eq!(garbage.state, SessionState::default());

        let unknown_token = Uuid::new_v4().to_string();
        let unknown = sessions.get(Some(&unknown_token)).await.unwrap();
        assert_ne!(unknown.token(), unknown_token);
    }

    #[tokio::test]
    async fn saved_state_is_returned_for_same_token() {
        // ---
        let sessions = manager();
        let mut session = sessions.get(None).await.unwrap();
        let user_id = Uuid::new_v4();
        session.state.sign_in(user_id, "sam".to_string());
        sessions.save(&session).await.unwrap();

        let reloaded = sessions.get(Some(session.token())).await.unwrap();
        assert_eq!(reloaded.token(), session.token());
        assert_eq!(reloaded.state.identity().unwrap().user_id, user_id);
    }

    #[tokio::test]
    async fn destroy_clears_identity() {
        // ---
        let sessions = manager();
        let mut session = sessions.get(None).await.unwrap();
        session.state.sign_in(Uuid::new_v4(), "pippin".to_string());
        sessions.save(&session).await.unwrap();

        sessions.destroy(&mut session).await;

        let reloaded = sessions.get(Some(session.token())).await.unwrap();
        assert!(reloaded.state.identity().is_none());
    }

    #[tokio::test]
    async fn renew_moves_state_to_a_new_token() {
        // ---
        let sessions = manager();
        let mut session = sessions.get(None).await.unwrap();
        session.state.sign_in(Uuid::new_v4(), "lobelia".to_string());
        sessions.save(&session).await.unwrap();
        let old_token = session.token().to_string();

        sessions.renew(&mut session).await.unwrap();

        assert_ne!(session.token(), old_token);
        let stale = sessions.get(Some(&old_token)).await.unwrap();
        assert!(stale.state.identity().is_none());
        let current = sessions.get(Some(session.token())).await.unwrap();
        assert_eq!(current.state.identity().unwrap().username, "lobelia");
    }

    #[tokio::test]
    async fn destroy_keeps_a_pending_ceremony() {
        // ---
        use crate::domain::{CeremonyKind, PendingCeremony};

        let sessions = manager();
        let mut session = sessions.get(None).await.unwrap();
        let user_id = Uuid::new_v4();
        session.state.sign_in(user_id, "merry".to_string());
        session.state.pending = Some(PendingCeremony {
            kind: CeremonyKind::Login,
            user_id,
            username: "merry".to_string(),
            challenge_state: serde_json::json!({}),
            allowed_credentials: vec![],
            expires_at: chrono::Utc::now(),
        });
        sessions.save(&session).await.unwrap();

        sessions.destroy(&mut session).await;

        let reloaded = sessions.get(Some(session.token())).await.unwrap();
        assert_eq!(reloaded.token(), session.token());
        assert!(reloaded.state.identity().is_none());
        assert!(reloaded.state.pending.is_some());
    }

    #[test]
    fn cookie_carries_security_attributes() {
        // ---
        let sessions = manager();
        let session = Session {
            token: "t".to_string(),
            state: SessionState::default(),
        };
        let cookie = sessions.cookie(&session);
        assert!(cookie.starts_with("webauthn-session=t;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=600"));
    }
}
