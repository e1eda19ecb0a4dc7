//! Bridge endpoint handlers
//!
//! Each handler translates one inbound test command into one call against the
//! host application. No endpoint calls another; no retries, no recovery —
//! failures surface to the calling test as failed HTTP responses.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use testwire_common::crypto::{temporary_signed_url, verification_hash};
use testwire_common::{
    CommandRequest, EvalRequest, EvalResponse, FactoryOutcome, FactoryRequest, LoginRequest,
    Record, RouteTable, TokenRequest, VerificationUrlRequest,
};

use crate::server::BridgeState;
use crate::session::SessionContext;

/// Failures surfaced to the calling test.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("anti-forgery token mismatch")]
    TokenMismatch,

    #[error("expression evaluation is disabled")]
    EvalDisabled,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Common(#[from] testwire_common::Error),

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::TokenMismatch | BridgeError::EvalDisabled => StatusCode::FORBIDDEN,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Common(_) | BridgeError::Host(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub(crate) async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "testwire-server",
    }))
}

/// GET `/csrf_token` — the current session's anti-forgery token.
pub(crate) async fn csrf_token(Extension(session): Extension<SessionContext>) -> Json<String> {
    Json(session.csrf_token)
}

/// POST `/login` — find-or-create a user by attribute filter and
/// authenticate the session as that user.
pub(crate) async fn login(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Record>, BridgeError> {
    state.verify_token(&session, &req.token)?;

    let user = match state.host.find_user(&req.attributes).await? {
        Some(user) => user,
        None => state.host.create_user(&req.attributes).await?,
    };

    state.sessions.set_user(&session.id, user.id().cloned());
    info!(session = %session.id, user = ?user.id(), "login");
    Ok(Json(user))
}

/// POST `/logout` — clear the session's authenticated user.
pub(crate) async fn logout(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<TokenRequest>,
) -> Result<StatusCode, BridgeError> {
    state.verify_token(&session, &req.token)?;
    state.sessions.set_user(&session.id, None);
    info!(session = %session.id, "logout");
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/routes` — full route-table snapshot, keyed by name.
pub(crate) async fn routes(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<RouteTable>, BridgeError> {
    state.verify_token(&session, &req.token)?;
    Ok(Json(RouteTable::from_routes(state.host.routes())))
}

/// POST `/factory` — build records, persisting unless `makeOnly`.
pub(crate) async fn factory(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<FactoryRequest>,
) -> Result<Json<FactoryOutcome>, BridgeError> {
    state.verify_token(&session, &req.token)?;
    if req.times == 0 {
        return Err(BridgeError::BadRequest(
            "times must be at least 1".to_string(),
        ));
    }

    let records = state
        .host
        .factory(&req.model, req.times, &req.attributes, !req.make_only)
        .await?;
    Ok(Json(FactoryOutcome::from_records(req.times, records)))
}

/// POST `/command` — dispatch an administrative command.
pub(crate) async fn command(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<CommandRequest>,
) -> Result<StatusCode, BridgeError> {
    state.verify_token(&session, &req.token)?;
    state.host.run_command(&req.command, &req.parameters).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/eval` — evaluate an expression fragment in the host runtime.
///
/// Gated twice: the server config must allow it, and the host must implement
/// it (the trait default refuses).
pub(crate) async fn eval(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<EvalRequest>,
) -> Result<Json<EvalResponse>, BridgeError> {
    state.verify_token(&session, &req.token)?;
    if !state.cfg.allow_eval {
        return Err(BridgeError::EvalDisabled);
    }

    let fragment = normalize_fragment(&req.command);
    let result = state.host.eval(&fragment).await?;
    Ok(Json(EvalResponse { result }))
}

/// POST `/email_verification_url` — signed, expiring verification URL for
/// the user matching the attribute filter.
pub(crate) async fn email_verification_url(
    State(state): State<Arc<BridgeState>>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<VerificationUrlRequest>,
) -> Result<Json<String>, BridgeError> {
    state.verify_token(&session, &req.token)?;

    let user = state
        .host
        .find_user(&req.attributes)
        .await?
        .ok_or_else(|| BridgeError::NotFound("user".to_string()))?;
    let id = user
        .id()
        .cloned()
        .ok_or_else(|| BridgeError::BadRequest("user record has no id".to_string()))?;

    let mut parameters = serde_json::Map::new();
    parameters.insert("id".to_string(), id);
    parameters.insert(
        "hash".to_string(),
        verification_hash(&state.host.verification_key(&user)).into(),
    );

    let path = RouteTable::from_routes(state.host.routes())
        .resolve("verification.verify", &parameters)?;
    let expires_at = Utc::now() + Duration::minutes(state.cfg.verify_ttl_mins);
    let url = temporary_signed_url(&state.signer, &state.cfg.base_url, &path, expires_at);
    Ok(Json(url))
}

/// Fallback for everything outside the bridge prefix: serve a stub page for
/// any request matching a host route, so navigation commands have something
/// to land on.
pub(crate) async fn host_page(
    State(state): State<Arc<BridgeState>>,
    req: Request,
) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().as_str().to_uppercase();

    for route in state.host.routes() {
        if route.methods.iter().any(|m| m == &method) && uri_matches(&route.uri, &path) {
            return Json(json!({"route": route.name, "path": path})).into_response();
        }
    }

    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("no route matches {} {}", method, path)})),
    )
        .into_response()
}

/// Match a concrete request path against a `{param}`/`{param?}` URI template.
fn uri_matches(uri: &str, path: &str) -> bool {
    let template: Vec<&str> = uri.split('/').filter(|s| !s.is_empty()).collect();
    let mut parts = path.split('/').filter(|s| !s.is_empty());

    for segment in &template {
        let is_param = segment.starts_with('{') && segment.ends_with('}');
        let is_optional = is_param && segment.ends_with("?}");
        match parts.next() {
            Some(part) => {
                if !is_param && part != *segment {
                    return false;
                }
            }
            None => return is_optional,
        }
    }
    parts.next().is_none()
}

/// Mirror the original bridge's fragment normalization: guarantee a statement
/// terminator and a `return` so bare expressions evaluate to a value.
fn normalize_fragment(code: &str) -> String {
    let mut code = code.trim().to_string();
    if !code.ends_with(';') {
        code.push(';');
    }
    if !code.contains("return") {
        code = format!("return {}", code);
    }
    code
}
