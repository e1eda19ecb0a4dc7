//! Shared helpers for the E2E suites
#![allow(dead_code)]

use std::sync::Once;

use tempfile::TempDir;
use testwire_client::Bridge;
use testwire_common::AttributeMap;
use testwire_e2e::{ServerConfig, ServerHandle};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .try_init();
    });
}

pub struct TestContext {
    pub server: ServerHandle,
    pub bridge: Bridge,
    pub cache_path: std::path::PathBuf,
    _cache_dir: TempDir,
}

/// Spawn a bridge server and a client against it. Returns None (skipping the
/// test) when the testwired binary has not been built in this tree.
pub async fn start(allow_eval: bool) -> Option<TestContext> {
    init_tracing();

    let config = ServerConfig {
        allow_eval,
        ..ServerConfig::default()
    };
    if !config.binary_exists() {
        eprintln!(
            "skipping: testwired not built at {} (run `cargo build -p testwire-server`)",
            config.binary_path.display()
        );
        return None;
    }

    let server = ServerHandle::spawn(config).await.expect("spawn testwired");
    let cache_dir = tempfile::tempdir().expect("create cache dir");
    let cache_path = cache_dir.path().join("routes.json");
    let bridge = Bridge::new(server.base_url())
        .expect("construct bridge")
        .with_routes_cache(&cache_path);

    Some(TestContext {
        server,
        bridge,
        cache_path,
        _cache_dir: cache_dir,
    })
}

pub fn attrs(value: serde_json::Value) -> AttributeMap {
    value.as_object().cloned().expect("object literal")
}
