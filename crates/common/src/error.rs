//! Error types for Testwire

use thiserror::Error;

/// Result type alias using the Testwire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Testwire error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Route not found: {name}")]
    RouteNotFound { name: String },

    #[error("Missing parameter `{parameter}` for route {route}")]
    MissingRouteParameter { route: String, parameter: String },

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Signed URL expired")]
    LinkExpired,
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        Error::Crypto(e.to_string())
    }
}
