//! Testwire Common Library
//!
//! Shared wire contract between the bridge endpoint set (`testwire-server`)
//! and the bridge command set (`testwire-client`).

pub mod crypto;
pub mod error;
pub mod routes;
pub mod types;

// Re-export commonly used types
pub use crypto::KeyPair;
pub use error::{Error, Result};
pub use routes::RouteTable;
pub use types::*;

/// Testwire version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session cookie name used by the bridge endpoints.
pub const SESSION_COOKIE: &str = "testwire_session";

/// Default path prefix the bridge endpoints are mounted under.
pub const DEFAULT_PREFIX: &str = "/__testwire__";

/// Default location of the client-side route cache file.
pub fn default_routes_cache_path() -> std::path::PathBuf {
    std::path::PathBuf::from(".testwire").join("routes.json")
}
