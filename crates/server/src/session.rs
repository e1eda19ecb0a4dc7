//! Session store and cookie layer
//!
//! Each bridge session carries an anti-forgery token and the currently
//! authenticated user identity. The layer resolves the session cookie into a
//! [`SessionContext`] request extension, so handlers receive their session
//! explicitly instead of reaching into ambient state.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use testwire_common::SESSION_COOKIE;

use crate::server::BridgeState;

/// Per-request view of the resolved session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone)]
struct SessionData {
    csrf_token: String,
    user_id: Option<Value>,
}

/// All live bridge sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    /// Resolve a cookie value into a session, creating one when the cookie
    /// is absent or stale. Returns the context and whether it was created.
    pub fn resolve(&self, cookie: Option<&str>) -> (SessionContext, bool) {
        if let Some(id) = cookie {
            if let Some(data) = self.sessions.read().get(id) {
                return (
                    SessionContext {
                        id: id.to_string(),
                        csrf_token: data.csrf_token.clone(),
                    },
                    false,
                );
            }
        }

        let id = Uuid::new_v4().to_string();
        let csrf_token = new_token();
        self.sessions.write().insert(
            id.clone(),
            SessionData {
                csrf_token: csrf_token.clone(),
                user_id: None,
            },
        );
        debug!(session = %id, "created session");
        (SessionContext { id, csrf_token }, true)
    }

    /// True when the relayed token is non-empty and matches the session's.
    pub fn verify_token(&self, session_id: &str, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        self.sessions
            .read()
            .get(session_id)
            .map(|data| data.csrf_token == token)
            .unwrap_or(false)
    }

    pub fn set_user(&self, session_id: &str, user_id: Option<Value>) {
        if let Some(data) = self.sessions.write().get_mut(session_id) {
            data.user_id = user_id;
        }
    }

    pub fn user(&self, session_id: &str) -> Option<Value> {
        self.sessions
            .read()
            .get(session_id)
            .and_then(|data| data.user_id.clone())
    }
}

/// Generate an opaque anti-forgery token.
pub fn new_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Layer resolving the session cookie, stamping the request with a
/// [`SessionContext`], and setting the cookie on newly created sessions.
pub async fn session_layer(
    State(state): State<Arc<BridgeState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie = req
        .headers()
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_cookie_value);

    let (context, created) = state.sessions.resolve(cookie.as_deref());
    let session_id = context.id.clone();
    req.extensions_mut().insert(context);

    let mut response = next.run(req).await;

    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, session_id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn session_cookie_value(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_creates_then_reuses_sessions() {
        let store = SessionStore::default();

        let (first, created) = store.resolve(None);
        assert!(created);
        assert!(!first.csrf_token.is_empty());

        let (second, created) = store.resolve(Some(&first.id));
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.csrf_token, first.csrf_token);
    }

    #[test]
    fn stale_cookie_gets_a_fresh_session() {
        let store = SessionStore::default();
        let (context, created) = store.resolve(Some("gone"));
        assert!(created);
        assert_ne!(context.id, "gone");
    }

    #[test]
    fn token_verification() {
        let store = SessionStore::default();
        let (context, _) = store.resolve(None);

        assert!(store.verify_token(&context.id, &context.csrf_token));
        assert!(!store.verify_token(&context.id, "wrong"));
        assert!(!store.verify_token(&context.id, ""));
        assert!(!store.verify_token("unknown", &context.csrf_token));
    }

    #[test]
    fn user_state_round_trip() {
        let store = SessionStore::default();
        let (context, _) = store.resolve(None);

        assert_eq!(store.user(&context.id), None);
        store.set_user(&context.id, Some(json!(7)));
        assert_eq!(store.user(&context.id), Some(json!(7)));
        store.set_user(&context.id, None);
        assert_eq!(store.user(&context.id), None);
    }

    #[test]
    fn cookie_header_parsing() {
        assert_eq!(
            session_cookie_value("a=1; testwire_session=abc; b=2"),
            Some("abc".to_string())
        );
        assert_eq!(session_cookie_value("a=1; b=2"), None);
    }
}
