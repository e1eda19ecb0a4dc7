//! Error types for the bridge command set

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Common(#[from] testwire_common::Error),

    #[error("Server returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("No cached route table; run refresh_routes() first")]
    RoutesCacheMissing,

    #[error("Location assertion failed: {0}")]
    Assertion(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
