//! testwired - Testwire bridge server
//!
//! Serves the bridge endpoint set over the in-memory reference host. Real
//! applications embed `testwire_server` as a library instead and plug their
//! own services in behind `HostApp`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::builder::FalseyValueParser;
use clap::Parser;
use tracing::info;

use testwire_common::{KeyPair, DEFAULT_PREFIX};
use testwire_server::config::{normalize_prefix, ServerConfig};
use testwire_server::host::{FixtureConfig, MemoryHost};
use testwire_server::server::{serve, BridgeState};

/// Testwire bridge server
#[derive(Parser)]
#[command(name = "testwired")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, env = "TESTWIRE_ADDR", default_value = "127.0.0.1:8977")]
    addr: SocketAddr,

    /// Enable the bridge. Off by default; the server refuses to start
    /// without it.
    #[arg(long, env = "TESTWIRE_ENABLED", value_parser = FalseyValueParser::new())]
    enabled: bool,

    /// Path prefix the bridge endpoints are mounted under
    #[arg(long, env = "TESTWIRE_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Allow the expression-evaluation endpoint
    #[arg(long, env = "TESTWIRE_ALLOW_EVAL", value_parser = FalseyValueParser::new())]
    allow_eval: bool,

    /// TOML fixture describing the reference host's routes and factories
    #[arg(long, env = "TESTWIRE_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Signing key file for verification URLs; generated when missing.
    /// An ephemeral key is used when unset.
    #[arg(long, env = "TESTWIRE_SIGNING_KEY")]
    signing_key: Option<PathBuf>,

    /// Public base URL embedded in signed URLs; defaults to the listen
    /// address
    #[arg(long, env = "TESTWIRE_BASE_URL")]
    base_url: Option<String>,

    /// Signed verification URL lifetime, in minutes
    #[arg(long, env = "TESTWIRE_VERIFY_TTL_MINS", default_value_t = 60)]
    verify_ttl_mins: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let fixture = match &args.fixture {
        Some(path) => {
            info!("Loading host fixture from {}", path.display());
            FixtureConfig::load(path)?
        }
        None => FixtureConfig::default(),
    };
    let host = MemoryHost::new(fixture).with_eval(args.allow_eval);

    let signer = match &args.signing_key {
        Some(path) if path.exists() => KeyPair::load(path).await?,
        Some(path) => {
            let keypair = KeyPair::generate();
            keypair.save(path).await?;
            keypair
        }
        None => KeyPair::generate(),
    };

    let cfg = ServerConfig {
        enabled: args.enabled,
        prefix: normalize_prefix(&args.prefix),
        allow_eval: args.allow_eval,
        base_url: args
            .base_url
            .unwrap_or_else(|| format!("http://{}", args.addr)),
        verify_ttl_mins: args.verify_ttl_mins,
    };

    let state = Arc::new(BridgeState::new(cfg, Arc::new(host), signer));
    serve(args.addr, state).await
}
