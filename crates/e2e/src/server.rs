//! Server management - spawning and health checking the bridge server

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running `testwired` process
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the testwired server
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let port = config.port.unwrap_or_else(find_free_port);
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning bridge server on port {}", port);

        let mut cmd = Command::new(&config.binary_path);

        cmd.env("TESTWIRE_ADDR", format!("127.0.0.1:{}", port))
            .env("TESTWIRE_ENABLED", "1")
            .env("TESTWIRE_ALLOW_EVAL", if config.allow_eval { "1" } else { "0" });

        if let Some(fixture) = &config.fixture_path {
            cmd.env("TESTWIRE_FIXTURE", fixture);
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!(
                "Failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        // Wait for server to be healthy
        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping server (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                // Give it a moment to shut down gracefully
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the testwired binary
    pub binary_path: PathBuf,

    /// Host fixture for the reference host (None = built-in fixture)
    pub fixture_path: Option<PathBuf>,

    /// Allow the expression-evaluation endpoint
    pub allow_eval: bool,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            fixture_path: None,
            allow_eval: false,
            port: None,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Whether the server binary has been built in this tree.
    pub fn binary_exists(&self) -> bool {
        self.binary_path.exists()
    }
}

/// The testwired binary as built by `cargo build -p testwire-server`,
/// overridable with TESTWIRED_BIN.
pub fn default_binary_path() -> PathBuf {
    if let Some(path) = std::env::var_os("TESTWIRED_BIN") {
        return PathBuf::from(path);
    }
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../target/debug/testwired"
    ))
}

/// Find a free port to use
fn find_free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to find free port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port();
        let port2 = find_free_port();

        // Ports should be in valid range
        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn default_config_points_at_debug_binary() {
        let config = ServerConfig::default();
        assert!(config
            .binary_path
            .to_string_lossy()
            .ends_with("target/debug/testwired"));
    }
}
