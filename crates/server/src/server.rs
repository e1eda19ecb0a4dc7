//! Router assembly and server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use testwire_common::KeyPair;

use crate::config::ServerConfig;
use crate::endpoints;
use crate::host::HostApp;
use crate::session::{self, SessionStore};

/// Shared state behind every bridge handler.
pub struct BridgeState {
    pub cfg: ServerConfig,
    pub host: Arc<dyn HostApp>,
    pub sessions: SessionStore,
    pub signer: KeyPair,
}

impl BridgeState {
    pub fn new(cfg: ServerConfig, host: Arc<dyn HostApp>, signer: KeyPair) -> Self {
        Self {
            cfg,
            host,
            sessions: SessionStore::default(),
            signer,
        }
    }

    /// Reject mutating requests whose relayed token does not match the
    /// session's anti-forgery token.
    pub(crate) fn verify_token(
        &self,
        session: &crate::session::SessionContext,
        token: &str,
    ) -> Result<(), endpoints::BridgeError> {
        if self.sessions.verify_token(&session.id, token) {
            Ok(())
        } else {
            Err(endpoints::BridgeError::TokenMismatch)
        }
    }
}

/// Build the full router: public health check, stub host pages, and the
/// bridge endpoint set nested under the configured prefix.
pub fn router(state: Arc<BridgeState>) -> Router {
    let bridge = Router::new()
        .route("/csrf_token", get(endpoints::csrf_token))
        .route("/login", post(endpoints::login))
        .route("/logout", post(endpoints::logout))
        .route("/routes", post(endpoints::routes))
        .route("/factory", post(endpoints::factory))
        .route("/command", post(endpoints::command))
        .route("/eval", post(endpoints::eval))
        .route(
            "/email_verification_url",
            post(endpoints::email_verification_url),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ));

    Router::new()
        .route("/health", get(endpoints::health))
        .nest(&state.cfg.prefix, bridge)
        .fallback(endpoints::host_page)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve. Refuses to start unless the bridge is explicitly enabled:
/// these endpoints hand full control of application state to the network.
pub async fn serve(addr: SocketAddr, state: Arc<BridgeState>) -> anyhow::Result<()> {
    if !state.cfg.enabled {
        anyhow::bail!("refusing to serve: the test bridge is disabled (set TESTWIRE_ENABLED=1)");
    }

    info!(
        "Test bridge listening on http://{} (prefix {})",
        addr, state.cfg.prefix
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
