//! Bridge server configuration

use testwire_common::DEFAULT_PREFIX;

/// Runtime configuration for the bridge endpoints.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether the bridge may serve at all. The endpoints grant full control
    /// over application state, so this defaults to off and must be switched
    /// on explicitly for test environments.
    pub enabled: bool,

    /// Path prefix the endpoint set is mounted under.
    pub prefix: String,

    /// Whether the `/eval` endpoint is reachable. The host must additionally
    /// implement evaluation; the trait default refuses.
    pub allow_eval: bool,

    /// Public base URL embedded in signed verification URLs.
    pub base_url: String,

    /// Lifetime of signed verification URLs, in minutes.
    pub verify_ttl_mins: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: DEFAULT_PREFIX.to_string(),
            allow_eval: false,
            base_url: "http://127.0.0.1:8977".to_string(),
            verify_ttl_mins: 60,
        }
    }
}

/// Coerce a prefix into the shape `Router::nest` expects: one leading slash,
/// no trailing slash, never the bare root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
